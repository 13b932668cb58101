//! Bounded polling retry
//!
//! Used by detached continuations to re-read state another task has
//! just written (e.g. a critique re-reading the job row its target run
//! persisted). Backoff doubles per attempt from `base_delay`.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Run `op` until it succeeds or `attempts` tries are spent. A zero
/// attempt count still runs once.
pub async fn poll_retry<T, E, F, Fut>(attempts: u32, base_delay: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(err);
                }
                sleep(base_delay * 2u32.pow(attempt - 1)).await;
            }
        }
    }
}
