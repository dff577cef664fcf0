use std::{future::Future, time::Duration};

/// Await `future` for at most `timeout`
///
/// Every network operation and subprocess wait in this crate goes through here,
/// so nothing blocks indefinitely. When the deadline passes the future is dropped,
/// which cancels an in-flight request and kills a child spawned with `kill_on_drop`.
///
/// # Returns
/// `Some(output)` if the future completed in time, `None` otherwise
pub async fn bounded<F>(timeout: Duration, future: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::time::timeout(timeout, future).await.ok()
}
