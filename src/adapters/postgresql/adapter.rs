//! PostgreSQL implementation of the repository traits

use crate::adapters::database::traits::{AuditRepository, RecordRepository, UserRepository};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    audit_entry_from_row, record_from_row, seq_to_db, user_from_row, AUDIT_COLUMNS,
    RECORD_COLUMNS, USER_COLUMNS,
};
use crate::audit::{AuditEntry, AuditQuery};
use crate::domain::{
    ConflictError, PatientRecord, RecordId, Result, User, UserId, VigilError,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// PostgreSQL-backed storage for users, records and audit entries
pub struct PostgreSQLStorage {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLStorage {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl UserRepository for PostgreSQLStorage {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let statement = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (username) DO NOTHING"
        );
        let inserted = self
            .client
            .execute(
                &statement,
                &[
                    user.id.as_uuid(),
                    &user.username,
                    &user.credential_hash,
                    &user.role.as_str(),
                    &user.active,
                    &user.created_at,
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(ConflictError::DuplicateUsername(user.username.clone()).into());
        }
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let rows = self.client.query(&query, &[&username]).await?;
        rows.first().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let rows = self.client.query(&query, &[id.as_uuid()]).await?;
        rows.first().map(user_from_row).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let updated = self
            .client
            .execute(
                "UPDATE users SET credential_hash = $2, role = $3, active = $4 WHERE user_id = $1",
                &[
                    user.id.as_uuid(),
                    &user.credential_hash,
                    &user.role.as_str(),
                    &user.active,
                ],
            )
            .await?;

        if updated == 0 {
            return Err(VigilError::UserNotFound {
                username: user.username.clone(),
            });
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, username");
        let rows = self.client.query(&query, &[]).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn count_users(&self) -> Result<u64> {
        let rows = self.client.query("SELECT COUNT(*) FROM users", &[]).await?;
        count_from_rows(&rows)
    }
}

#[async_trait]
impl RecordRepository for PostgreSQLStorage {
    async fn insert_record(&self, record: &PatientRecord) -> Result<()> {
        let statement = format!(
            "INSERT INTO records ({RECORD_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        self.client
            .execute(
                &statement,
                &[
                    record.id.as_uuid(),
                    &record.raw.name,
                    &record.raw.contact,
                    &record.raw.diagnosis,
                    &record.anonymized.name,
                    &record.anonymized.contact,
                    &record.anonymized.sealed_contact,
                    &record.fingerprint,
                    &record.created_at,
                    &record.updated_at,
                ],
            )
            .await?;

        tracing::debug!(record_id = %record.id, "Record inserted into PostgreSQL");
        Ok(())
    }

    async fn replace_record(&self, record: &PatientRecord) -> Result<()> {
        let updated = self
            .client
            .execute(
                "UPDATE records SET name = $2, contact = $3, diagnosis = $4, \
                 anonymized_name = $5, anonymized_contact = $6, sealed_contact = $7, \
                 fingerprint = $8, updated_at = $9 WHERE record_id = $1",
                &[
                    record.id.as_uuid(),
                    &record.raw.name,
                    &record.raw.contact,
                    &record.raw.diagnosis,
                    &record.anonymized.name,
                    &record.anonymized.contact,
                    &record.anonymized.sealed_contact,
                    &record.fingerprint,
                    &record.updated_at,
                ],
            )
            .await?;

        if updated == 0 {
            return Err(VigilError::NotFound {
                record_id: record.id,
            });
        }
        Ok(())
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<PatientRecord>> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM records WHERE record_id = $1");
        let rows = self.client.query(&query, &[id.as_uuid()]).await?;
        rows.first().map(record_from_row).transpose()
    }

    async fn list_records(&self) -> Result<Vec<PatientRecord>> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY created_at, record_id");
        let rows = self.client.query(&query, &[]).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn delete_record(&self, id: RecordId) -> Result<bool> {
        let deleted = self
            .client
            .execute("DELETE FROM records WHERE record_id = $1", &[id.as_uuid()])
            .await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl AuditRepository for PostgreSQLStorage {
    async fn insert_entry(&self, entry: &AuditEntry) -> Result<()> {
        let statement = format!(
            "INSERT INTO audit_entries ({AUDIT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        let seq = seq_to_db(entry.seq)?;
        let user_id = entry.actor_id.map(UserId::into_inner);
        let role = entry.actor_role.map(|role| role.as_str());
        let target_id = entry.target_id.map(RecordId::into_inner);

        self.client
            .execute(
                &statement,
                &[
                    &seq,
                    &user_id,
                    &role,
                    &entry.action.as_str(),
                    &target_id,
                    &entry.outcome.as_str(),
                    &entry.timestamp,
                    &entry.details,
                ],
            )
            .await?;
        Ok(())
    }

    async fn last_seq(&self) -> Result<u64> {
        let rows = self
            .client
            .query("SELECT COALESCE(MAX(seq), 0) FROM audit_entries", &[])
            .await?;
        count_from_rows(&rows)
    }

    async fn query_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let filter = AuditFilterSql::from_query(query);
        let mut sql = format!("SELECT {AUDIT_COLUMNS} FROM audit_entries");
        if !filter.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY seq ASC");
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let params: Vec<&(dyn ToSql + Sync)> = filter
            .params
            .iter()
            .map(|param| param.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let rows = self.client.query(&sql, &params).await?;
        rows.iter().map(audit_entry_from_row).collect()
    }

    async fn count_entries(&self) -> Result<u64> {
        let rows = self
            .client
            .query("SELECT COUNT(*) FROM audit_entries", &[])
            .await?;
        count_from_rows(&rows)
    }
}

/// WHERE clauses and positional parameters for an [`AuditQuery`]
struct AuditFilterSql {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl AuditFilterSql {
    fn from_query(query: &AuditQuery) -> Self {
        let mut filter = Self {
            clauses: Vec::new(),
            params: Vec::new(),
        };
        if let Some(role) = query.role {
            filter.push("role", "=", Box::new(role.as_str().to_string()));
        }
        if let Some(actor) = query.actor {
            filter.push("user_id", "=", Box::new(actor.into_inner()));
        }
        if let Some(action) = query.action {
            filter.push("action", "=", Box::new(action.as_str().to_string()));
        }
        if let Some(target) = query.target {
            filter.push("target_id", "=", Box::new(target.into_inner()));
        }
        if let Some(outcome) = query.outcome {
            filter.push("outcome", "=", Box::new(outcome.as_str().to_string()));
        }
        if let Some(since) = query.since {
            filter.push("timestamp", ">=", Box::new(since));
        }
        if let Some(until) = query.until {
            filter.push("timestamp", "<", Box::new(until));
        }
        filter
    }

    fn push(&mut self, column: &str, operator: &str, param: Box<dyn ToSql + Sync + Send>) {
        self.params.push(param);
        self.clauses
            .push(format!("{column} {operator} ${}", self.params.len()));
    }
}

fn count_from_rows(rows: &[tokio_postgres::Row]) -> Result<u64> {
    let count: i64 = rows
        .first()
        .ok_or_else(|| VigilError::Internal("Aggregate query returned no rows".to_string()))?
        .try_get(0)
        .map_err(|e| VigilError::Serialization(e.to_string()))?;
    u64::try_from(count).map_err(|e| VigilError::Serialization(e.to_string()))
}
