//! Bridge from blocking threads into the async runtime

use ha_core::{HomeAssistantError, HomeAssistantResult};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::trace;

/// Submit `future` to the runtime behind `runtime` and block until it finishes
///
/// Meant for threads that are not driving the runtime (plain threads, the
/// blocking pool). Called from inside an async task it returns
/// [`HomeAssistantError::EventLoop`] without submitting `future`.
///
/// Also returns an error if the task was dropped before completing, e.g.
/// because it panicked or the runtime is shutting down.
pub fn run_coroutine_threadsafe<F>(runtime: &Handle, future: F) -> HomeAssistantResult<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if !can_block_current_thread() {
        return Err(HomeAssistantError::EventLoop(
            "cannot wait for a result from within the runtime".to_string(),
        ));
    }

    let (tx, rx) = oneshot::channel();
    runtime.spawn(async move {
        let output = future.await;
        if tx.send(output).is_err() {
            trace!("Caller stopped waiting for threadsafe result");
        }
    });

    rx.blocking_recv().map_err(|_| {
        HomeAssistantError::EventLoop("task dropped before completing".to_string())
    })
}

/// Whether this thread may block on a result from the runtime
///
/// Receiving on a closed channel returns at once where blocking is allowed
/// and panics on a thread driving a runtime.
fn can_block_current_thread() -> bool {
    let (tx, rx) = oneshot::channel::<()>();
    drop(tx);
    panic::catch_unwind(AssertUnwindSafe(move || rx.blocking_recv())).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_runs_on_runtime_and_waits() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();

        let value = run_coroutine_threadsafe(rt.handle(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            42
        })
        .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_panicking_task_reports_error() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();

        let result = run_coroutine_threadsafe(rt.handle(), async {
            if true {
                panic!("boom");
            }
        });
        assert!(matches!(result, Err(HomeAssistantError::EventLoop(_))));
    }

    #[tokio::test]
    async fn test_inside_runtime_is_an_error() {
        let submitted = Arc::new(AtomicBool::new(false));
        let flag = submitted.clone();

        let result = run_coroutine_threadsafe(&Handle::current(), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert!(matches!(result, Err(HomeAssistantError::EventLoop(_))));

        tokio::task::yield_now().await;
        assert!(!submitted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_plain_thread_can_block() {
        assert!(can_block_current_thread());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_from_blocking_pool() {
        let handle = Handle::current();
        let value = tokio::task::spawn_blocking(move || {
            run_coroutine_threadsafe(&handle, async { "done" })
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(value, "done");
    }
}
