//! Access control engine
//!
//! [`Engine`] is the single mediation point between callers and the
//! components. Each [`perform`](Engine::perform) call:
//!
//! 1. checks that the session was issued by this engine and is still open,
//!    then re-reads the caller's account, so role changes and deactivation
//!    apply to sessions issued earlier
//! 2. derives the required capability from the operation and consults the
//!    role table
//! 3. appends exactly one audit entry
//!
//! Writes are audited before their effect runs. Reads are audited after they
//! run, and their result is released only once the entry is stored. When the
//! audit append fails, the operation fails.

use super::grant::UnmaskGrant;
use super::operation::{Operation, Outcome};
use super::session::{Session, SessionRegistry};
use super::table::authorize;
use crate::adapters::database::{create_storage, Storage};
use crate::anonymization::Anonymizer;
use crate::audit::{write_export, AuditAction, AuditEntry, AuditLog, AuditQuery, NewAuditEntry};
use crate::config::{SecretString, VigilConfig};
use crate::credentials::CredentialStore;
use crate::domain::{
    AuthError, Capability, Decision, PatientRecord, PermissionError, RawDelta, RawFields,
    RecordId, RecordView, Result, Role, User, UserId, UserSummary, View, VigilError,
};
use crate::log_access_denied;
use crate::records::{AnonymizeTarget, RecordStore};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A validated write, ready to run once its audit entry is stored
enum Write {
    Create(PatientRecord),
    Update(RecordId, RawDelta),
    Delete(RecordId),
    Anonymize(AnonymizeTarget),
    Provision {
        username: String,
        secret: SecretString,
        role: Role,
    },
    Reassign(String, Role),
    Deactivate(String),
    Purge(DateTime<Utc>),
}

enum Read {
    Record(RecordId, View),
    List(View),
    Unmask(RecordId),
    Audit(AuditQuery),
    Users,
}

enum Staged {
    Write(Write),
    Read(Read),
}

/// Shared entry point for every data operation; cheap to clone
#[derive(Clone)]
pub struct Engine {
    credentials: CredentialStore,
    records: RecordStore,
    audit: AuditLog,
    retention_days: u32,
    default_timeout: Duration,
    backend: &'static str,
    bootstrap_lock: Arc<Mutex<()>>,
    sessions: Arc<SessionRegistry>,
}

impl Engine {
    /// Build an engine over an existing storage bundle
    pub fn new(storage: Storage, config: &VigilConfig) -> Result<Self> {
        let read_retries = config.storage.read_retries;
        let backend = storage.backend_name();
        let anonymizer = Arc::new(Anonymizer::from_config(&config.anonymization)?);

        let mut audit = AuditLog::new(storage.audit, read_retries);
        if let Some(path) = &config.audit.mirror_path {
            audit = audit.with_mirror(path)?;
        }

        tracing::info!(
            backend,
            name_strategy = %anonymizer.name_strategy().as_str(),
            fingerprint = %anonymizer.fingerprint(),
            "Engine ready"
        );

        Ok(Self {
            credentials: CredentialStore::new(storage.users, &config.credentials, read_retries)?,
            records: RecordStore::new(storage.records, anonymizer, read_retries),
            audit,
            retention_days: config.retention.retention_days,
            default_timeout: config.storage.operation_timeout(),
            backend,
            bootstrap_lock: Arc::new(Mutex::new(())),
            sessions: Arc::new(SessionRegistry::default()),
        })
    }

    /// Build the configured storage backend and an engine over it
    pub async fn from_config(config: &VigilConfig) -> Result<Self> {
        let storage = create_storage(&config.storage).await?;
        Self::new(storage, config)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    /// Fingerprint of the active anonymizer
    pub fn fingerprint(&self) -> &str {
        self.records.anonymizer().fingerprint()
    }

    /// Authenticate and open a session
    ///
    /// Both outcomes are audited. An unknown username and a wrong secret
    /// produce the same error.
    pub async fn login(&self, username: &str, secret: &SecretString) -> Result<Session> {
        let limit = self.default_timeout;
        match self.credentials.authenticate(username, secret, limit).await {
            Ok(user) => {
                let entry = NewAuditEntry::new(user.id, user.role, AuditAction::Login, Decision::Granted);
                self.audit.append(entry, limit).await?;
                tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");
                Ok(self.sessions.open(user.id, &user.username, user.role))
            }
            Err(error) => {
                let entry = NewAuditEntry::anonymous(AuditAction::Login, Decision::Denied)
                    .with_details(format!("username={username} error={}", error.kind()));
                self.audit.append(entry, limit).await?;
                tracing::warn!(error = %error.kind(), "Login failed");
                Err(error)
            }
        }
    }

    /// Close a session
    ///
    /// Later operations presenting it, or any clone of it, are refused.
    pub async fn logout(&self, session: &Session) -> Result<()> {
        let limit = self.default_timeout;
        if let Err(error) = self.sessions.check(session) {
            self.audit_refused(session, AuditAction::Logout, None, "", &error, limit)
                .await?;
            return Err(error);
        }

        let entry = NewAuditEntry::new(
            session.user_id(),
            session.role(),
            AuditAction::Logout,
            Decision::Granted,
        );
        self.audit.append(entry, limit).await?;
        self.sessions.close(session);
        tracing::info!(user_id = %session.user_id(), "Logged out");
        Ok(())
    }

    /// Create the first administrator of an empty deployment
    ///
    /// Audited with no actor. Refused once any account exists.
    pub async fn bootstrap_admin(&self, username: &str, secret: &SecretString) -> Result<UserId> {
        let limit = self.default_timeout;
        let _bootstrap = self.bootstrap_lock.lock().await;

        let details = format!("username={username} role={} bootstrap", Role::Admin);
        if self.credentials.count(limit).await? > 0 {
            let entry = NewAuditEntry::anonymous(AuditAction::ProvisionUser, Decision::Denied)
                .with_details(details);
            self.audit.append(entry, limit).await?;
            return Err(PermissionError::Denied(Capability::ManageUsers).into());
        }

        let entry = NewAuditEntry::anonymous(AuditAction::ProvisionUser, Decision::Granted);
        if let Err(error) = self.credentials.validate_new_account(username, secret) {
            self.audit
                .append(entry.with_details(failure(&details, &error)), limit)
                .await?;
            return Err(error);
        }
        self.audit.append(entry.with_details(details), limit).await?;

        let user = self
            .credentials
            .provision(username, secret, Role::Admin, limit)
            .await?;
        tracing::info!(user_id = %user.id, "Bootstrap administrator created");
        Ok(user.id)
    }

    /// Replace the caller's own secret after re-verifying the current one
    pub async fn change_secret(
        &self,
        session: &Session,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<()> {
        let limit = self.default_timeout;
        let verified = match self.sessions.check(session) {
            Ok(()) => {
                self.credentials
                    .verify_current(session.user_id(), current, limit)
                    .await
            }
            Err(error) => Err(error),
        };
        let user = match verified {
            Ok(user) => user,
            Err(error) => {
                self.audit_refused(session, AuditAction::ChangeSecret, None, "", &error, limit)
                    .await?;
                return Err(error);
            }
        };

        let granted = NewAuditEntry::new(user.id, user.role, AuditAction::ChangeSecret, Decision::Granted);
        if let Err(error) = self.credentials.validate_secret(new) {
            self.audit
                .append(granted.with_details(failure("", &error)), limit)
                .await?;
            return Err(error);
        }
        self.audit.append(granted, limit).await?;

        self.credentials.replace_secret(user, new, limit).await
    }

    /// Run an operation with the default time limit
    pub async fn perform(&self, session: &Session, operation: Operation) -> Result<Outcome> {
        self.perform_with_timeout(session, operation, self.default_timeout)
            .await
    }

    /// Run an operation; `limit` bounds each storage call it makes
    pub async fn perform_with_timeout(
        &self,
        session: &Session,
        operation: Operation,
        limit: Duration,
    ) -> Result<Outcome> {
        let action = operation.action();
        let capability = operation.required_capability();
        let details = operation.describe();

        let principal = match self.principal(session, limit).await {
            Ok(user) => user,
            Err(error) => {
                self.audit_refused(session, action, operation.target(), &details, &error, limit)
                    .await?;
                return Err(error);
            }
        };

        let decision = authorize(principal.role, capability);
        let entry = NewAuditEntry::new(principal.id, principal.role, action, decision)
            .with_target(operation.target());

        if !decision.is_granted() {
            self.audit
                .append(
                    entry.with_details(format!("{details} capability={capability}")),
                    limit,
                )
                .await?;
            log_access_denied!(principal.id, principal.role, capability, action);
            return Err(PermissionError::Denied(capability).into());
        }

        match self.stage(operation) {
            Err(error) => {
                self.audit
                    .append(entry.with_details(failure(&details, &error)), limit)
                    .await?;
                Err(error)
            }
            Ok(Staged::Write(write)) => {
                let entry = match &write {
                    Write::Create(record) => entry.with_target(Some(record.id)),
                    _ => entry,
                };
                self.audit.append(entry.with_details(details), limit).await?;
                self.write(write, limit).await
            }
            Ok(Staged::Read(read)) => {
                let result = self.read(read, &principal, limit).await;
                let details = match &result {
                    Ok(outcome) => join(&details, &outcome.describe()),
                    Err(error) => failure(&details, error),
                };
                self.audit.append(entry.with_details(details), limit).await?;
                result
            }
        }
    }

    pub async fn create_record(&self, session: &Session, raw: RawFields) -> Result<RecordId> {
        match self.perform(session, Operation::CreateRecord { raw }).await? {
            Outcome::Created(id) => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn update_record(
        &self,
        session: &Session,
        id: RecordId,
        delta: RawDelta,
    ) -> Result<RecordId> {
        match self
            .perform(session, Operation::UpdateRecord { id, delta })
            .await?
        {
            Outcome::Updated(id) => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    /// Remove one record; entries naming it stay in the audit log
    pub async fn delete_record(&self, session: &Session, id: RecordId) -> Result<()> {
        match self.perform(session, Operation::DeleteRecord { id }).await? {
            Outcome::Deleted(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn read_record(&self, session: &Session, id: RecordId, view: View) -> Result<RecordView> {
        match self.perform(session, Operation::ReadRecord { id, view }).await? {
            Outcome::Record(record) => Ok(record),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list_records(&self, session: &Session, view: View) -> Result<Vec<RecordView>> {
        match self.perform(session, Operation::ListRecords { view }).await? {
            Outcome::Records(records) => Ok(records),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn unmask_contact(&self, session: &Session, id: RecordId) -> Result<String> {
        match self.perform(session, Operation::UnmaskContact { id }).await? {
            Outcome::Contact(contact) => Ok(contact),
            other => Err(unexpected(&other)),
        }
    }

    /// Re-derive anonymized projections; returns the number of records processed
    pub async fn anonymize(&self, session: &Session, target: AnonymizeTarget) -> Result<usize> {
        match self
            .perform(session, Operation::TriggerAnonymize { target })
            .await?
        {
            Outcome::Anonymized(count) => Ok(count),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn view_audit(&self, session: &Session, query: AuditQuery) -> Result<Vec<AuditEntry>> {
        match self.perform(session, Operation::ViewAudit { query }).await? {
            Outcome::Audit(entries) => Ok(entries),
            other => Err(unexpected(&other)),
        }
    }

    /// Write the entries matching `query` to a JSON-lines file
    ///
    /// Requires the same capability as [`view_audit`](Self::view_audit) and is
    /// audited the same way.
    pub async fn export_audit(
        &self,
        session: &Session,
        query: AuditQuery,
        path: impl AsRef<Path>,
    ) -> Result<usize> {
        let entries = self.view_audit(session, query).await?;
        write_export(entries, path).await
    }

    pub async fn provision_user(
        &self,
        session: &Session,
        username: &str,
        secret: SecretString,
        role: Role,
    ) -> Result<UserId> {
        let operation = Operation::ProvisionUser {
            username: username.to_string(),
            secret,
            role,
        };
        match self.perform(session, operation).await? {
            Outcome::UserProvisioned(id) => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn reassign_role(&self, session: &Session, username: &str, role: Role) -> Result<()> {
        let operation = Operation::ReassignRole {
            username: username.to_string(),
            role,
        };
        match self.perform(session, operation).await? {
            Outcome::RoleReassigned => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn deactivate_user(&self, session: &Session, username: &str) -> Result<()> {
        let operation = Operation::DeactivateUser {
            username: username.to_string(),
        };
        match self.perform(session, operation).await? {
            Outcome::UserDeactivated => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list_users(&self, session: &Session) -> Result<Vec<UserSummary>> {
        match self.perform(session, Operation::ListUsers).await? {
            Outcome::Users(users) => Ok(users),
            other => Err(unexpected(&other)),
        }
    }

    /// Delete records past the retention period; returns how many were removed
    pub async fn purge_expired(&self, session: &Session, now: DateTime<Utc>) -> Result<usize> {
        match self.perform(session, Operation::PurgeExpired { now }).await? {
            Outcome::Purged(count) => Ok(count),
            other => Err(unexpected(&other)),
        }
    }

    /// Record a refusal attributed to the account the session names
    async fn audit_refused(
        &self,
        session: &Session,
        action: AuditAction,
        target: Option<RecordId>,
        details: &str,
        error: &VigilError,
        limit: Duration,
    ) -> Result<()> {
        let entry = NewAuditEntry::new(session.user_id(), session.role(), action, Decision::Denied)
            .with_target(target)
            .with_details(failure(details, error));
        self.audit.append(entry, limit).await?;
        if matches!(error, VigilError::Auth(AuthError::SessionClosed)) {
            tracing::warn!(
                user_id = %session.user_id(),
                action = %action,
                "Refused a session that is not open"
            );
        }
        Ok(())
    }

    async fn principal(&self, session: &Session, limit: Duration) -> Result<User> {
        self.sessions.check(session)?;
        let user = self
            .credentials
            .find_by_id(session.user_id(), limit)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.active {
            return Err(AuthError::AccountDeactivated.into());
        }
        Ok(user)
    }

    /// Validate an operation without touching storage
    fn stage(&self, operation: Operation) -> Result<Staged> {
        let staged = match operation {
            Operation::CreateRecord { raw } => {
                Staged::Write(Write::Create(self.records.prepare(RecordId::new(), raw)?))
            }
            Operation::UpdateRecord { id, delta } => {
                self.records.validate_update(&delta)?;
                Staged::Write(Write::Update(id, delta))
            }
            Operation::DeleteRecord { id } => Staged::Write(Write::Delete(id)),
            Operation::TriggerAnonymize { target } => Staged::Write(Write::Anonymize(target)),
            Operation::ProvisionUser {
                username,
                secret,
                role,
            } => {
                self.credentials.validate_new_account(&username, &secret)?;
                Staged::Write(Write::Provision {
                    username,
                    secret,
                    role,
                })
            }
            Operation::ReassignRole { username, role } => {
                Staged::Write(Write::Reassign(username, role))
            }
            Operation::DeactivateUser { username } => Staged::Write(Write::Deactivate(username)),
            Operation::PurgeExpired { now } => Staged::Write(Write::Purge(now)),
            Operation::ReadRecord { id, view } => Staged::Read(Read::Record(id, view)),
            Operation::ListRecords { view } => Staged::Read(Read::List(view)),
            Operation::UnmaskContact { id } => Staged::Read(Read::Unmask(id)),
            Operation::ViewAudit { query } => Staged::Read(Read::Audit(query)),
            Operation::ListUsers => Staged::Read(Read::Users),
        };
        Ok(staged)
    }

    async fn write(&self, write: Write, limit: Duration) -> Result<Outcome> {
        match write {
            Write::Create(record) => self.records.insert(record, limit).await.map(Outcome::Created),
            Write::Update(id, delta) => {
                let record = self.records.update(id, delta, limit).await?;
                Ok(Outcome::Updated(record.id))
            }
            Write::Delete(id) => {
                self.records.delete(id, limit).await?;
                Ok(Outcome::Deleted(id))
            }
            Write::Anonymize(target) => self
                .records
                .rederive(target, limit)
                .await
                .map(Outcome::Anonymized),
            Write::Provision {
                username,
                secret,
                role,
            } => {
                let user = self
                    .credentials
                    .provision(&username, &secret, role, limit)
                    .await?;
                Ok(Outcome::UserProvisioned(user.id))
            }
            Write::Reassign(username, role) => {
                self.credentials.reassign_role(&username, role, limit).await?;
                Ok(Outcome::RoleReassigned)
            }
            Write::Deactivate(username) => {
                self.credentials.deactivate(&username, limit).await?;
                Ok(Outcome::UserDeactivated)
            }
            Write::Purge(now) => {
                let purged = self
                    .records
                    .purge_expired(now, self.retention_days, limit)
                    .await?;
                Ok(Outcome::Purged(purged.len()))
            }
        }
    }

    async fn read(&self, read: Read, principal: &User, limit: Duration) -> Result<Outcome> {
        match read {
            Read::Record(id, view) => self.records.read(id, view, limit).await.map(Outcome::Record),
            Read::List(view) => self.records.list(view, limit).await.map(Outcome::Records),
            Read::Unmask(id) => {
                let grant = UnmaskGrant::issue(principal.role, principal.id)
                    .ok_or(PermissionError::Denied(Capability::Unmask))?;
                self.records
                    .unmask_contact(id, &grant, limit)
                    .await
                    .map(Outcome::Contact)
            }
            Read::Audit(query) => self.audit.query(&query, limit).await.map(Outcome::Audit),
            Read::Users => self.credentials.list(limit).await.map(Outcome::Users),
        }
    }
}

fn join(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{first} {second}"),
    }
}

fn failure(details: &str, error: &VigilError) -> String {
    join(details, &format!("error={}", error.kind()))
}

fn unexpected(outcome: &Outcome) -> VigilError {
    VigilError::Internal(format!("Unexpected outcome: {}", outcome.label()))
}
