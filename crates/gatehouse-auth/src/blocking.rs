//! Offloading of CPU-bound work.

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

/// Run `f` on the blocking thread pool so bcrypt rounds never stall the
/// async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("Blocking task failed: {e}")))
}
