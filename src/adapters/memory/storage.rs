//! In-process storage backend
//!
//! Holds users, records and audit entries in tokio locks. Besides serving as
//! the default backend it can simulate outages and slow storage, which the
//! engine's failure handling is tested against.

use crate::adapters::database::traits::{AuditRepository, RecordRepository, UserRepository};
use crate::audit::{AuditEntry, AuditQuery};
use crate::domain::{
    ConflictError, PatientRecord, PersistenceError, RecordId, Result, User, UserId, VigilError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Memory-backed implementation of all three repositories
#[derive(Default)]
pub struct MemoryStorage {
    users: RwLock<HashMap<UserId, User>>,
    records: RwLock<HashMap<RecordId, PatientRecord>>,
    audit: RwLock<Vec<AuditEntry>>,
    unavailable: AtomicBool,
    record_writes_unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches every operation between working and failing with
    /// [`PersistenceError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
        tracing::debug!(available, "Memory storage availability changed");
    }

    /// Fails only record inserts, replacements and deletions
    pub fn set_record_writes_available(&self, available: bool) {
        self.record_writes_unavailable
            .store(!available, Ordering::SeqCst);
        tracing::debug!(available, "Memory storage record write availability changed");
    }

    /// Delays every operation by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn enter(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("memory storage is offline".to_string()).into());
        }
        Ok(())
    }

    async fn enter_record_write(&self) -> Result<()> {
        self.enter().await?;
        if self.record_writes_unavailable.load(Ordering::SeqCst) {
            return Err(
                PersistenceError::Unavailable("record writes are offline".to_string()).into(),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStorage {
    async fn insert_user(&self, user: &User) -> Result<()> {
        self.enter().await?;
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.username == user.username) {
            return Err(ConflictError::DuplicateUsername(user.username.clone()).into());
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.enter().await?;
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.enter().await?;
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.enter().await?;
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                existing.credential_hash = user.credential_hash.clone();
                existing.role = user.role;
                existing.active = user.active;
                Ok(())
            }
            None => Err(VigilError::UserNotFound {
                username: user.username.clone(),
            }),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.enter().await?;
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users)
    }

    async fn count_users(&self) -> Result<u64> {
        self.enter().await?;
        Ok(self.users.read().await.len() as u64)
    }
}

#[async_trait]
impl RecordRepository for MemoryStorage {
    async fn insert_record(&self, record: &PatientRecord) -> Result<()> {
        self.enter_record_write().await?;
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(VigilError::Internal(format!(
                "Record {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn replace_record(&self, record: &PatientRecord) -> Result<()> {
        self.enter_record_write().await?;
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(VigilError::NotFound {
                record_id: record.id,
            }),
        }
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<PatientRecord>> {
        self.enter().await?;
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_records(&self) -> Result<Vec<PatientRecord>> {
        self.enter().await?;
        let mut records: Vec<PatientRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn delete_record(&self, id: RecordId) -> Result<bool> {
        self.enter_record_write().await?;
        Ok(self.records.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl AuditRepository for MemoryStorage {
    async fn insert_entry(&self, entry: &AuditEntry) -> Result<()> {
        self.enter().await?;
        let mut audit = self.audit.write().await;
        if let Some(last) = audit.last() {
            if entry.seq <= last.seq {
                return Err(VigilError::Internal(format!(
                    "Audit sequence {} does not follow {}",
                    entry.seq, last.seq
                )));
            }
        }
        audit.push(entry.clone());
        Ok(())
    }

    async fn last_seq(&self) -> Result<u64> {
        self.enter().await?;
        Ok(self.audit.read().await.last().map_or(0, |entry| entry.seq))
    }

    async fn query_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        self.enter().await?;
        let audit = self.audit.read().await;
        let matching = audit.iter().filter(|entry| query.matches(entry)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn count_entries(&self) -> Result<u64> {
        self.enter().await?;
        Ok(self.audit.read().await.len() as u64)
    }
}
