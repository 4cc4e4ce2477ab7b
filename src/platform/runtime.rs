use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Platform-independent helper to spawn an async task that runs in the background.
#[cfg(target_arch = "wasm32")]
pub fn spawn_detached<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// Platform-independent helper to spawn an async task that runs in the background.
///
/// Uses the ambient tokio runtime when called from within one, otherwise a lazily created
/// single-worker runtime owned by the crate.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_detached<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    use std::sync::LazyLock;
    use tokio::runtime::{Builder, Handle, Runtime};

    static BACKGROUND_RUNTIME: LazyLock<Option<Runtime>> = LazyLock::new(|| {
        Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("matomo-dispatch")
            .enable_all()
            .build()
            .map_err(|err| log::error!("failed to build background tokio runtime: {err}"))
            .ok()
    });

    if let Ok(handle) = Handle::try_current() {
        handle.spawn(future);
    } else if let Some(runtime) = BACKGROUND_RUNTIME.as_ref() {
        runtime.spawn(future);
    }
}

/// Asynchronously waits for the provided duration in a platform-compatible way.
pub async fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }

    sleep_impl(duration).await;
}

#[cfg(target_arch = "wasm32")]
async fn sleep_impl(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep_impl(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Returned by [`with_timeout`] when the deadline elapses first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutError;

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation timed out")
    }
}

impl std::error::Error for TimeoutError {}

/// Races `future` against `duration`.
#[cfg(not(target_arch = "wasm32"))]
pub async fn with_timeout<F, T>(future: F, duration: Duration) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError)
}

/// Races `future` against `duration`.
#[cfg(target_arch = "wasm32")]
pub async fn with_timeout<F, T>(future: F, duration: Duration) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    use futures::future::{select, Either};

    let future = std::pin::pin!(future);
    let timer = std::pin::pin!(sleep(duration));
    match select(future, timer).await {
        Either::Left((value, _)) => Ok(value),
        Either::Right(_) => Err(TimeoutError),
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn with_timeout_returns_value_before_deadline() {
        let value = with_timeout(async { 7 }, Duration::from_millis(50)).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn with_timeout_reports_elapsed_deadline() {
        let slow = sleep(Duration::from_millis(200));
        let result = with_timeout(slow, Duration::from_millis(10)).await;
        assert_eq!(result, Err(TimeoutError));
    }
}
