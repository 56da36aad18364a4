use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;

use super::events::SyncEvent;

/// Wraps a future to catch panics and convert them to errors.
///
/// Instead of a spawned task silently disappearing, its panic message comes
/// back as `Err(String)` so it can be reported to the event loop.
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

/// Send an event, logging instead of failing when the receiver is gone
/// (session shutting down).
pub(crate) async fn send_event(tx: &mpsc::Sender<SyncEvent>, event: SyncEvent, name: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        assert_eq!(catch_task_panic(async { 42 }).await, Ok(42));
    }

    #[tokio::test]
    async fn test_catch_task_panic_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));
    }
}
