//! The append-only audit log
//!
//! Appends are serialized so `seq` increases by exactly one per stored entry.
//! An append reports success only after the repository has stored the entry;
//! the JSON-lines mirror is best effort on top of that.

use super::entry::{AuditEntry, NewAuditEntry};
use super::jsonl::JsonLinesWriter;
use super::query::AuditQuery;
use crate::adapters::database::{bounded, spawn_bounded, with_read_retries, AuditRepository};
use crate::domain::{Result, VigilError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Handle to the audit trail. Clones share the same sequence lock.
#[derive(Clone)]
pub struct AuditLog {
    repo: Arc<dyn AuditRepository>,
    append_lock: Arc<Mutex<()>>,
    mirror: Option<Arc<JsonLinesWriter>>,
    read_retries: u32,
}

impl AuditLog {
    pub fn new(repo: Arc<dyn AuditRepository>, read_retries: u32) -> Self {
        Self {
            repo,
            append_lock: Arc::new(Mutex::new(())),
            mirror: None,
            read_retries,
        }
    }

    /// Also write every appended entry to a JSON-lines file
    pub fn with_mirror(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let writer = JsonLinesWriter::append_to(path.as_ref()).map_err(|e| {
            VigilError::Configuration(format!("Invalid audit mirror path: {e:#}"))
        })?;
        self.mirror = Some(Arc::new(writer));
        Ok(self)
    }

    /// Append an entry and return it with its assigned `seq`
    ///
    /// Never retried. On [`PersistenceError::Timeout`](crate::domain::PersistenceError)
    /// the append may still complete in the background.
    pub async fn append(&self, entry: NewAuditEntry, limit: Duration) -> Result<AuditEntry> {
        let guard = bounded(limit, async {
            Ok(Arc::clone(&self.append_lock).lock_owned().await)
        })
        .await?;

        let repo = Arc::clone(&self.repo);
        let mirror = self.mirror.clone();
        spawn_bounded(limit, async move {
            let _guard = guard;
            let seq = repo.last_seq().await? + 1;
            let entry = entry.into_entry(seq);
            repo.insert_entry(&entry).await?;

            if let Some(mirror) = mirror {
                let line = entry.clone();
                let mirrored =
                    tokio::task::spawn_blocking(move || mirror.append(&line)).await;
                match mirrored {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(seq, error = %e, "Audit mirror write failed"),
                    Err(e) => tracing::warn!(seq, error = %e, "Audit mirror task failed"),
                }
            }

            tracing::debug!(
                seq,
                action = %entry.action,
                outcome = %entry.outcome,
                "Audit entry appended"
            );
            Ok(entry)
        })
        .await
    }

    /// Entries matching `query`, ordered by `seq`
    pub async fn query(&self, query: &AuditQuery, limit: Duration) -> Result<Vec<AuditEntry>> {
        bounded(
            limit,
            with_read_retries(self.read_retries, || self.repo.query_entries(query)),
        )
        .await
    }

    pub async fn count(&self, limit: Duration) -> Result<u64> {
        bounded(
            limit,
            with_read_retries(self.read_retries, || self.repo.count_entries()),
        )
        .await
    }
}

/// Write `entries` to a fresh JSON-lines file at `path`
pub async fn write_export(entries: Vec<AuditEntry>, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref().to_path_buf();
    let written = tokio::task::spawn_blocking(move || {
        let writer = JsonLinesWriter::create(&path)?;
        writer.append_all(&entries)
    })
    .await
    .map_err(|e| VigilError::Internal(format!("Export task failed: {e}")))?
    .map_err(|e| VigilError::Io(format!("{e:#}")))?;

    tracing::info!(count = written, "Audit entries exported");
    Ok(written)
}
