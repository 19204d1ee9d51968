//! Record store: canonical patient records and their projections
//!
//! Every write re-derives the anonymized fields from the raw fields and
//! stores both in a single repository call, so the two can never be observed
//! out of step. Writes hold the record's write lock and run on a spawned task.

use super::locks::RecordLocks;
use crate::access::UnmaskGrant;
use crate::adapters::database::{bounded, spawn_bounded, with_read_retries, RecordRepository};
use crate::anonymization::{Anonymizer, MaskedValue, SensitiveField};
use crate::domain::validation::{validate_delta, validate_raw_fields};
use crate::domain::{
    ConsistencyError, PatientRecord, RawDelta, RawFields, RecordId, RecordView, Result, View,
    VigilError,
};
use crate::log_consistency_violation;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Records to re-derive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "scope", content = "record_id")]
pub enum AnonymizeTarget {
    Record(RecordId),
    All,
}

impl AnonymizeTarget {
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            AnonymizeTarget::Record(id) => Some(*id),
            AnonymizeTarget::All => None,
        }
    }
}

impl fmt::Display for AnonymizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnonymizeTarget::Record(id) => write!(f, "record {id}"),
            AnonymizeTarget::All => f.write_str("all"),
        }
    }
}

/// Handle to the patient records; cheap to clone
#[derive(Clone)]
pub struct RecordStore {
    records: Arc<dyn RecordRepository>,
    anonymizer: Arc<Anonymizer>,
    locks: Arc<RecordLocks>,
    read_retries: u32,
}

impl RecordStore {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        anonymizer: Arc<Anonymizer>,
        read_retries: u32,
    ) -> Self {
        Self {
            records,
            anonymizer,
            locks: Arc::new(RecordLocks::new()),
            read_retries,
        }
    }

    pub fn anonymizer(&self) -> &Arc<Anonymizer> {
        &self.anonymizer
    }

    /// Build a new record under a caller-chosen id
    ///
    /// Validates the raw fields and derives the anonymized projection. Nothing
    /// is stored.
    pub fn prepare(&self, id: RecordId, raw: RawFields) -> Result<PatientRecord> {
        validate_raw_fields(&raw)?;
        let now = Utc::now();
        Ok(PatientRecord {
            id,
            anonymized: self.anonymizer.derive(&raw)?,
            fingerprint: self.anonymizer.fingerprint().to_string(),
            raw,
            created_at: now,
            updated_at: now,
        })
    }

    /// Store a record built by [`prepare`](Self::prepare)
    pub async fn insert(&self, record: PatientRecord, limit: Duration) -> Result<RecordId> {
        let id = record.id;
        let guard = bounded(limit, async { Ok(self.locks.write(id).await) }).await?;

        let records = Arc::clone(&self.records);
        spawn_bounded(limit, async move {
            let _guard = guard;
            records.insert_record(&record).await
        })
        .await?;

        tracing::info!(record_id = %id, "Record created");
        Ok(id)
    }

    /// Validate and store new raw fields under a fresh id
    pub async fn create(&self, raw: RawFields, limit: Duration) -> Result<RecordId> {
        let record = self.prepare(RecordId::new(), raw)?;
        self.insert(record, limit).await
    }

    /// Check a delta without touching storage
    pub fn validate_update(&self, delta: &RawDelta) -> Result<()> {
        validate_delta(delta)
    }

    /// Apply `delta` and re-derive the projection in one write
    ///
    /// # Errors
    ///
    /// [`VigilError::NotFound`] for an unknown id; validation errors leave the
    /// record untouched.
    pub async fn update(
        &self,
        id: RecordId,
        delta: RawDelta,
        limit: Duration,
    ) -> Result<PatientRecord> {
        validate_delta(&delta)?;
        let guard = bounded(limit, async { Ok(self.locks.write(id).await) }).await?;

        let records = Arc::clone(&self.records);
        let anonymizer = Arc::clone(&self.anonymizer);
        let updated = spawn_bounded(limit, async move {
            let _guard = guard;
            let current = records
                .get_record(id)
                .await?
                .ok_or(VigilError::NotFound { record_id: id })?;

            let raw = delta.apply(&current.raw);
            let record = PatientRecord {
                anonymized: anonymizer.derive(&raw)?,
                fingerprint: anonymizer.fingerprint().to_string(),
                raw,
                updated_at: Utc::now(),
                ..current
            };
            records.replace_record(&record).await?;

            tracing::info!(
                record_id = %id,
                fields = ?delta.changed_fields(),
                "Record updated"
            );
            Ok(record)
        })
        .await?;

        Ok(updated)
    }

    /// Read one record in the requested view
    ///
    /// # Errors
    ///
    /// [`VigilError::NotFound`] for an unknown id and
    /// [`ConsistencyError::AnonymizationMismatch`] when the stored projection
    /// was derived under a different anonymizer.
    pub async fn read(&self, id: RecordId, view: View, limit: Duration) -> Result<RecordView> {
        let record = self.load_consistent(id, limit).await?;
        Ok(record.project(view))
    }

    /// Every record in the requested view, ordered by creation
    pub async fn list(&self, view: View, limit: Duration) -> Result<Vec<RecordView>> {
        let records = bounded(
            limit,
            with_read_retries(self.read_retries, || self.records.list_records()),
        )
        .await?;

        records
            .iter()
            .map(|record| {
                self.check_consistent(record)?;
                Ok(record.project(view))
            })
            .collect()
    }

    /// Recover the contact of a record from its sealed copy
    pub async fn unmask_contact(
        &self,
        id: RecordId,
        grant: &UnmaskGrant,
        limit: Duration,
    ) -> Result<String> {
        let record = self.load_consistent(id, limit).await?;
        self.anonymizer.unmask(
            SensitiveField::Contact,
            &MaskedValue::Sealed(record.anonymized.sealed_contact),
            grant,
        )
    }

    /// Recompute projections under the active anonymizer
    ///
    /// Idempotent. Returns the number of records re-derived.
    pub async fn rederive(&self, target: AnonymizeTarget, limit: Duration) -> Result<usize> {
        let ids = match target {
            AnonymizeTarget::Record(id) => vec![id],
            AnonymizeTarget::All => bounded(
                limit,
                with_read_retries(self.read_retries, || self.records.list_records()),
            )
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect(),
        };

        for id in &ids {
            self.rederive_one(*id, limit).await?;
        }

        tracing::info!(target = %target, count = ids.len(), "Anonymized projections re-derived");
        Ok(ids.len())
    }

    async fn rederive_one(&self, id: RecordId, limit: Duration) -> Result<()> {
        let guard = bounded(limit, async { Ok(self.locks.write(id).await) }).await?;

        let records = Arc::clone(&self.records);
        let anonymizer = Arc::clone(&self.anonymizer);
        spawn_bounded(limit, async move {
            let _guard = guard;
            let current = records
                .get_record(id)
                .await?
                .ok_or(VigilError::NotFound { record_id: id })?;
            let record = PatientRecord {
                anonymized: anonymizer.derive(&current.raw)?,
                fingerprint: anonymizer.fingerprint().to_string(),
                updated_at: Utc::now(),
                ..current
            };
            records.replace_record(&record).await
        })
        .await
    }

    /// Remove one record
    ///
    /// Audit entries naming it are kept.
    ///
    /// # Errors
    ///
    /// [`VigilError::NotFound`] for an unknown id.
    pub async fn delete(&self, id: RecordId, limit: Duration) -> Result<()> {
        if !self.remove(id, limit).await? {
            return Err(VigilError::NotFound { record_id: id });
        }
        tracing::info!(record_id = %id, "Record deleted");
        Ok(())
    }

    /// Delete records created more than `retention_days` before `now`
    ///
    /// Each record is removed under its own write lock.
    pub async fn purge_expired(
        &self,
        now: DateTime<Utc>,
        retention_days: u32,
        limit: Duration,
    ) -> Result<Vec<RecordId>> {
        let cutoff = now - ChronoDuration::days(i64::from(retention_days));
        let expired: Vec<RecordId> = bounded(
            limit,
            with_read_retries(self.read_retries, || self.records.list_records()),
        )
        .await?
        .into_iter()
        .filter(|record| record.created_at < cutoff)
        .map(|record| record.id)
        .collect();

        let mut deleted = Vec::with_capacity(expired.len());
        for id in expired {
            if self.remove(id, limit).await? {
                deleted.push(id);
            }
        }
        tracing::info!(
            cutoff = %cutoff,
            count = deleted.len(),
            "Expired records purged"
        );
        Ok(deleted)
    }

    /// Delete under the record's write lock; false if it was already gone
    async fn remove(&self, id: RecordId, limit: Duration) -> Result<bool> {
        let guard = bounded(limit, async { Ok(self.locks.write(id).await) }).await?;
        let records = Arc::clone(&self.records);
        spawn_bounded(limit, async move {
            let _guard = guard;
            records.delete_record(id).await
        })
        .await
    }

    async fn load_consistent(&self, id: RecordId, limit: Duration) -> Result<PatientRecord> {
        let record = bounded(limit, async {
            let _guard = self.locks.read(id).await;
            with_read_retries(self.read_retries, || self.records.get_record(id)).await
        })
        .await?
        .ok_or(VigilError::NotFound { record_id: id })?;

        self.check_consistent(&record)?;
        Ok(record)
    }

    fn check_consistent(&self, record: &PatientRecord) -> Result<()> {
        let expected = self.anonymizer.fingerprint();
        if record.fingerprint != expected {
            log_consistency_violation!(record.id, expected, record.fingerprint);
            return Err(ConsistencyError::AnonymizationMismatch {
                record_id: record.id,
                expected: expected.to_string(),
                found: record.fingerprint.clone(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::Storage;
    use crate::config::schema::test_config;
    use crate::domain::{PersistenceError, Role, UserId};

    const LIMIT: Duration = Duration::from_secs(5);

    fn store() -> RecordStore {
        let (storage, _) = Storage::memory();
        let anonymizer = Anonymizer::from_config(&test_config().anonymization).unwrap();
        RecordStore::new(storage.records, Arc::new(anonymizer), 0)
    }

    fn john() -> RawFields {
        RawFields::new("John Doe", "555-111-4592", "Seasonal influenza")
    }

    #[tokio::test]
    async fn test_create_derives_projection() {
        let store = store();
        let id = store.create(john(), LIMIT).await.unwrap();

        let view = store.read(id, View::Anonymized, LIMIT).await.unwrap();
        let anonymized = view.as_anonymized().unwrap();
        assert!(anonymized.name.starts_with("ANON_"));
        assert_eq!(anonymized.contact, "XXX-XXX-4592");
        assert_eq!(anonymized.diagnosis, "Seasonal influenza");

        let view = store.read(id, View::Raw, LIMIT).await.unwrap();
        let raw = view.as_raw().unwrap();
        let expected = store.anonymizer().derive(&john()).unwrap();
        assert_eq!(raw.raw, john());
        assert_eq!(raw.anonymized.name, expected.name);
        assert_eq!(raw.anonymized.contact, expected.contact);

        let grant = UnmaskGrant::issue(Role::Admin, UserId::new()).unwrap();
        let contact = store
            .anonymizer()
            .unmask(
                SensitiveField::Contact,
                &MaskedValue::Sealed(raw.anonymized.sealed_contact.clone()),
                &grant,
            )
            .unwrap();
        assert_eq!(contact, "555-111-4592");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let store = store();
        let result = store
            .create(RawFields::new("J1", "abc", "flu"), LIMIT)
            .await;
        assert!(matches!(result, Err(VigilError::Validation(_))));
        assert!(store.list(View::Raw, LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rederives() {
        let store = store();
        let id = store.create(john(), LIMIT).await.unwrap();
        let before = store.read(id, View::Anonymized, LIMIT).await.unwrap();

        let updated = store
            .update(id, RawDelta::new().with_contact("555-222-9876"), LIMIT)
            .await
            .unwrap();
        assert_eq!(updated.raw.contact, "555-222-9876");
        assert_eq!(updated.anonymized.contact, "XXX-XXX-9876");
        assert_eq!(updated.raw.name, "John Doe");

        let after = store.read(id, View::Anonymized, LIMIT).await.unwrap();
        assert_eq!(
            before.as_anonymized().unwrap().name,
            after.as_anonymized().unwrap().name
        );
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let store = store();
        let id = RecordId::new();
        assert!(matches!(
            store.read(id, View::Raw, LIMIT).await,
            Err(VigilError::NotFound { .. })
        ));
        assert!(matches!(
            store
                .update(id, RawDelta::new().with_name("Jane Doe"), LIMIT)
                .await,
            Err(VigilError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unmask_contact() {
        let store = store();
        let id = store.create(john(), LIMIT).await.unwrap();
        let grant = UnmaskGrant::issue(Role::Admin, UserId::new()).unwrap();
        assert_eq!(
            store.unmask_contact(id, &grant, LIMIT).await.unwrap(),
            "555-111-4592"
        );
    }

    #[tokio::test]
    async fn test_rederive_all_is_idempotent() {
        let store = store();
        store.create(john(), LIMIT).await.unwrap();
        store
            .create(RawFields::new("Jane Roe", "", "Sprained ankle"), LIMIT)
            .await
            .unwrap();

        assert_eq!(store.rederive(AnonymizeTarget::All, LIMIT).await.unwrap(), 2);
        assert_eq!(store.rederive(AnonymizeTarget::All, LIMIT).await.unwrap(), 2);
        assert_eq!(store.list(View::Anonymized, LIMIT).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reads_of_unknown_ids_leave_no_locks() {
        let store = store();
        for _ in 0..500 {
            let result = store.read(RecordId::new(), View::Anonymized, LIMIT).await;
            assert!(matches!(result, Err(VigilError::NotFound { .. })));
        }
        let id = store.create(john(), LIMIT).await.unwrap();
        store
            .update(id, RawDelta::new().with_name("Jane Doe"), LIMIT)
            .await
            .unwrap();
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_delete_record() {
        let store = store();
        let id = store.create(john(), LIMIT).await.unwrap();
        let other = store
            .create(RawFields::new("Jane Roe", "", "Sprained ankle"), LIMIT)
            .await
            .unwrap();

        store.delete(id, LIMIT).await.unwrap();
        assert!(matches!(
            store.read(id, View::Raw, LIMIT).await,
            Err(VigilError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(id, LIMIT).await,
            Err(VigilError::NotFound { record_id }) if record_id == id
        ));
        assert!(store.read(other, View::Raw, LIMIT).await.is_ok());
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_purge_waits_for_writer() {
        let store = store();
        let id = store.create(john(), LIMIT).await.unwrap();
        let writer = store.locks.write(id).await;

        let later = Utc::now() + ChronoDuration::days(31);
        let blocked = store
            .purge_expired(later, 30, Duration::from_millis(20))
            .await;
        assert!(matches!(
            blocked,
            Err(VigilError::Persistence(PersistenceError::Timeout(_)))
        ));
        drop(writer);
        assert!(store.read(id, View::Raw, LIMIT).await.is_ok());

        let purged = store.purge_expired(later, 30, LIMIT).await.unwrap();
        assert_eq!(purged, vec![id]);
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = store();
        store.create(john(), LIMIT).await.unwrap();

        let nothing = store.purge_expired(Utc::now(), 30, LIMIT).await.unwrap();
        assert!(nothing.is_empty());

        let later = Utc::now() + ChronoDuration::days(31);
        let purged = store.purge_expired(later, 30, LIMIT).await.unwrap();
        assert_eq!(purged.len(), 1);
        assert!(store.list(View::Raw, LIMIT).await.unwrap().is_empty());
    }
}
