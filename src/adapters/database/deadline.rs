//! Time limits and retries for persistence calls

use crate::domain::{PersistenceError, Result, VigilError};
use crate::log_retry_attempt;
use std::future::Future;
use std::time::Duration;

/// Runs `fut` with a time limit
///
/// Expiry surfaces as [`PersistenceError::Timeout`]. The future is dropped on
/// expiry, so use this only for reads and lock acquisition.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::Timeout(limit).into()),
    }
}

/// Runs `fut` on its own task and waits at most `limit` for it
///
/// On expiry the task keeps running to completion, so a write is never
/// abandoned halfway. The caller sees [`PersistenceError::Timeout`] and the
/// final state is whatever the write produced.
pub async fn spawn_bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let handle = tokio::spawn(fut);
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(VigilError::Internal(format!(
            "Persistence task failed: {join_error}"
        ))),
        Err(_) => {
            tracing::warn!(
                timeout_ms = limit.as_millis() as u64,
                "Write exceeded its time limit and continues in the background"
            );
            Err(PersistenceError::Timeout(limit).into())
        }
    }
}

/// Retries an idempotent read while storage reports itself unavailable
///
/// Timeouts and every other error are returned immediately.
pub async fn with_read_retries<T, F, Fut>(retries: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(VigilError::Persistence(PersistenceError::Unavailable(reason)))
                if attempt < retries =>
            {
                attempt += 1;
                log_retry_attempt!(attempt, retries, reason.as_str());
                tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded(Duration::from_secs(1), async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<()> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(VigilError::Persistence(PersistenceError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_spawn_bounded_finishes_write_after_timeout() {
        let done = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&done);

        let result = spawn_bounded(Duration::from_millis(10), async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(VigilError::Persistence(PersistenceError::Timeout(_)))
        ));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_retries_recover_from_unavailable() {
        let calls = AtomicU32::new(0);
        let value = with_read_retries(2, || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Err(PersistenceError::Unavailable("blip".to_string()).into())
                } else {
                    Ok(call)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_read_retries_give_up() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_read_retries(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(PersistenceError::Unavailable("down".to_string()).into()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_read_retries_skip_other_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_read_retries(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(VigilError::Validation("bad".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
