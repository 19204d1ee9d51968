//! Persistence traits
//!
//! Backends implement these three traits to store users, patient records and
//! the audit trail. Every method is a single atomic operation from the
//! caller's point of view: it either takes full effect or none.

use crate::audit::{AuditEntry, AuditQuery};
use crate::domain::{PatientRecord, RecordId, Result, User, UserId};
use async_trait::async_trait;

/// Storage for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::DuplicateUsername`](crate::domain::ConflictError)
    /// if the username is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Look up an account by username
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Look up an account by id
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Replace the mutable columns (credential hash, role, active flag)
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::UserNotFound`](crate::domain::VigilError) if the
    /// account does not exist.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// All accounts ordered by creation time
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Number of accounts
    async fn count_users(&self) -> Result<u64>;
}

/// Storage for patient records
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Insert a new record, raw and anonymized columns together
    async fn insert_record(&self, record: &PatientRecord) -> Result<()>;

    /// Replace an existing record in one write
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::NotFound`](crate::domain::VigilError) if the
    /// record does not exist.
    async fn replace_record(&self, record: &PatientRecord) -> Result<()>;

    async fn get_record(&self, id: RecordId) -> Result<Option<PatientRecord>>;

    /// All records ordered by creation time
    async fn list_records(&self) -> Result<Vec<PatientRecord>>;

    /// Remove one record; false if it did not exist
    async fn delete_record(&self, id: RecordId) -> Result<bool>;
}

/// Append-only storage for audit entries
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persist an entry whose `seq` has already been assigned
    async fn insert_entry(&self, entry: &AuditEntry) -> Result<()>;

    /// Highest stored `seq`, or 0 for an empty log
    async fn last_seq(&self) -> Result<u64>;

    /// Entries matching `query`, ordered by `seq` ascending
    async fn query_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>>;

    async fn count_entries(&self) -> Result<u64>;
}
