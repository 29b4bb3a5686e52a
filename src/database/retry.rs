use crate::error::Result;
use std::future::Future;
use std::time::Duration;

pub const MAX_TRANSACTION_ATTEMPTS: u32 = 3;

/// Re-runs `op` while it fails with SQLite write contention.
pub async fn retry_on_contention<T, F, Fut>(label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_contention() && attempt < MAX_TRANSACTION_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "{} hit write contention, retrying", label);
                tokio::time::sleep(Duration::from_millis(25 * u64::from(attempt))).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
