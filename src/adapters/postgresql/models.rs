//! Row mappings for the PostgreSQL tables

use crate::audit::{AuditAction, AuditEntry};
use crate::domain::{
    AnonymizedFields, Decision, PatientRecord, RawFields, RecordId, Result, Role, User, UserId,
    VigilError,
};
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str = "user_id, username, credential_hash, role, active, created_at";

pub(crate) const RECORD_COLUMNS: &str = "record_id, name, contact, diagnosis, anonymized_name, \
     anonymized_contact, sealed_contact, fingerprint, created_at, updated_at";

pub(crate) const AUDIT_COLUMNS: &str =
    "seq, user_id, role, action, target_id, outcome, timestamp, details";

fn corrupt(table: &str, detail: String) -> VigilError {
    VigilError::Serialization(format!("Invalid row in {table}: {detail}"))
}

fn try_get<'a, T>(row: &'a Row, table: &str, column: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| corrupt(table, format!("column {column}: {e}")))
}

/// Convert a `users` row
pub(crate) fn user_from_row(row: &Row) -> Result<User> {
    let role: String = try_get(row, "users", "role")?;
    Ok(User {
        id: UserId::from_uuid(try_get(row, "users", "user_id")?),
        username: try_get(row, "users", "username")?,
        credential_hash: try_get(row, "users", "credential_hash")?,
        role: role.parse::<Role>().map_err(|e| corrupt("users", e))?,
        active: try_get(row, "users", "active")?,
        created_at: try_get(row, "users", "created_at")?,
    })
}

/// Convert a `records` row
pub(crate) fn record_from_row(row: &Row) -> Result<PatientRecord> {
    Ok(PatientRecord {
        id: RecordId::from_uuid(try_get(row, "records", "record_id")?),
        raw: RawFields {
            name: try_get(row, "records", "name")?,
            contact: try_get(row, "records", "contact")?,
            diagnosis: try_get(row, "records", "diagnosis")?,
        },
        anonymized: AnonymizedFields {
            name: try_get(row, "records", "anonymized_name")?,
            contact: try_get(row, "records", "anonymized_contact")?,
            sealed_contact: try_get(row, "records", "sealed_contact")?,
        },
        fingerprint: try_get(row, "records", "fingerprint")?,
        created_at: try_get(row, "records", "created_at")?,
        updated_at: try_get(row, "records", "updated_at")?,
    })
}

/// Convert an `audit_entries` row
pub(crate) fn audit_entry_from_row(row: &Row) -> Result<AuditEntry> {
    let seq: i64 = try_get(row, "audit_entries", "seq")?;
    let user_id: Option<Uuid> = try_get(row, "audit_entries", "user_id")?;
    let role: Option<String> = try_get(row, "audit_entries", "role")?;
    let action: String = try_get(row, "audit_entries", "action")?;
    let target_id: Option<Uuid> = try_get(row, "audit_entries", "target_id")?;
    let outcome: String = try_get(row, "audit_entries", "outcome")?;
    let timestamp: DateTime<Utc> = try_get(row, "audit_entries", "timestamp")?;

    Ok(AuditEntry {
        seq: u64::try_from(seq).map_err(|e| corrupt("audit_entries", e.to_string()))?,
        actor_id: user_id.map(UserId::from_uuid),
        actor_role: role
            .map(|role| role.parse::<Role>())
            .transpose()
            .map_err(|e| corrupt("audit_entries", e))?,
        action: action
            .parse::<AuditAction>()
            .map_err(|e| corrupt("audit_entries", e))?,
        target_id: target_id.map(RecordId::from_uuid),
        outcome: outcome
            .parse::<Decision>()
            .map_err(|e| corrupt("audit_entries", e))?,
        timestamp,
        details: try_get(row, "audit_entries", "details")?,
    })
}

/// `seq` as stored in a BIGINT column
pub(crate) fn seq_to_db(seq: u64) -> Result<i64> {
    i64::try_from(seq)
        .map_err(|_| VigilError::Internal(format!("Audit sequence {seq} exceeds BIGINT range")))
}
