//! The tokio runtime that host futures and timers run on.
//!
//! # Design
//!
//! 1. **Global Runtime**: A lazily-initialized multi-thread runtime, shared
//!    by every task that needs one. It is created once and never dropped.
//!
//! 2. **Handle Preference**: Inside a tokio runtime the current handle is
//!    used, so futures spawned by `Task::from_future` and timers created by
//!    `TokioTimer::new` live on the caller's runtime. Outside any runtime a
//!    thread-locally cached handle to the global runtime is used.
//!
//! 3. **Blocking Execution**: [`try_run_blocking`] drives a future to
//!    completion from synchronous code. Inside a multi-thread runtime it uses
//!    `block_in_place`; inside a current-thread runtime it refuses with
//!    [`BlockingError::CurrentThreadRuntime`] instead of panicking.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::LazyLock;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

// =============================================================================
// Global Runtime
// =============================================================================

/// Global tokio runtime, one worker per CPU core, all drivers enabled.
static GLOBAL_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("taskarian-worker")
        .enable_all()
        .build()
        .expect("failed to build the global tokio runtime")
});

/// Returns the global runtime, building it on first use.
///
/// # Panics
///
/// Panics on first use if the operating system refuses to create the
/// runtime's worker threads or I/O driver.
#[inline]
#[must_use]
pub fn global() -> &'static Runtime {
    &GLOBAL_RUNTIME
}

// =============================================================================
// Handle Caching
// =============================================================================

thread_local! {
    static CACHED_HANDLE: RefCell<Option<Handle>> = const { RefCell::new(None) };
}

/// Returns a handle to the current runtime, or to the global one when the
/// caller is not inside a runtime.
///
/// # Examples
///
/// ```rust
/// use taskarian::runtime::handle;
///
/// let value = handle().block_on(async { 42 });
/// assert_eq!(value, 42);
/// ```
#[inline]
#[must_use]
pub fn handle() -> Handle {
    if let Ok(current_handle) = Handle::try_current() {
        return current_handle;
    }

    CACHED_HANDLE.with(|cached| {
        cached
            .borrow_mut()
            .get_or_insert_with(|| global().handle().clone())
            .clone()
    })
}

// =============================================================================
// Blocking Error
// =============================================================================

/// Why a future could not be driven to completion from synchronous code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingError {
    /// Called from inside a current-thread runtime, where `block_in_place`
    /// is unavailable.
    CurrentThreadRuntime,

    /// Called from inside a runtime whose flavor is not known to support
    /// blocking execution.
    UnsupportedRuntimeFlavor,
}

impl fmt::Display for BlockingError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentThreadRuntime => {
                write!(
                    formatter,
                    "cannot block inside a current-thread runtime: \
                     block_in_place is only supported in multi-thread runtimes"
                )
            }
            Self::UnsupportedRuntimeFlavor => {
                write!(
                    formatter,
                    "cannot block: the runtime flavor is not supported for blocking execution"
                )
            }
        }
    }
}

impl Error for BlockingError {}

// =============================================================================
// Blocking Execution
// =============================================================================

/// Drives `future` to completion, blocking the current thread.
///
/// # Errors
///
/// Returns [`BlockingError::CurrentThreadRuntime`] when called from inside a
/// current-thread runtime, and [`BlockingError::UnsupportedRuntimeFlavor`]
/// for runtime flavors this crate does not know about.
///
/// # Examples
///
/// ```rust
/// use taskarian::runtime::try_run_blocking;
///
/// assert_eq!(try_run_blocking(async { 42 }), Ok(42));
/// ```
pub fn try_run_blocking<F, T>(future: F) -> Result<T, BlockingError>
where
    F: Future<Output = T>,
{
    match Handle::try_current() {
        Ok(current_handle) => match current_handle.runtime_flavor() {
            RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(|| {
                current_handle.block_on(future)
            })),
            RuntimeFlavor::CurrentThread => Err(BlockingError::CurrentThreadRuntime),
            _ => Err(BlockingError::UnsupportedRuntimeFlavor),
        },
        Err(_) => Ok(global().block_on(future)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ptr;

    #[rstest]
    fn global_returns_same_instance() {
        assert!(ptr::eq(global(), global()));
    }

    #[rstest]
    fn handle_works_from_outside_runtime() {
        assert_eq!(handle().block_on(async { 42 }), 42);
    }

    #[rstest]
    #[tokio::test]
    async fn handle_prefers_current_runtime() {
        let spawned = handle().spawn(async { 42 }).await;
        assert_eq!(spawned.ok(), Some(42));
    }

    #[rstest]
    #[case(BlockingError::CurrentThreadRuntime, "current-thread runtime")]
    #[case(BlockingError::UnsupportedRuntimeFlavor, "runtime flavor")]
    fn blocking_error_display(#[case] error: BlockingError, #[case] fragment: &str) {
        assert!(error.to_string().contains(fragment));
    }

    #[rstest]
    fn try_run_blocking_from_outside_runtime() {
        assert_eq!(try_run_blocking(async { 42 }), Ok(42));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn try_run_blocking_inside_multi_thread_runtime() {
        let result = tokio::task::spawn_blocking(|| try_run_blocking(async { 42 })).await;
        assert_eq!(result.ok(), Some(Ok(42)));
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn try_run_blocking_inside_current_thread_runtime() {
        assert_eq!(
            try_run_blocking(async { 42 }),
            Err(BlockingError::CurrentThreadRuntime)
        );
    }
}
