//! A timer backed by `tokio::time`.

use std::time::Duration;

use tokio::runtime::Handle;

use super::{Timer, TimerCallback};
use crate::runtime;
use crate::task::Cancel;

/// A [`Timer`] that sleeps on a tokio runtime.
///
/// Each scheduled callback is a spawned task that sleeps for the delay and
/// then runs the callback; cancelling aborts the spawned task.
///
/// # Examples
///
/// ```rust,ignore
/// use taskarian::task::Task;
/// use taskarian::timer::TokioTimer;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let timer = TokioTimer::new();
///     let value = Task::<String, i32>::delay(timer, Duration::from_millis(10), 42)
///         .resolve()
///         .await;
///     assert_eq!(value, Ok(42));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    /// Uses the current runtime when called inside one, otherwise the
    /// shared global runtime.
    pub fn new() -> Self {
        Self {
            handle: runtime::handle(),
        }
    }

    /// Uses the runtime behind `handle`.
    pub const fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Default for TokioTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Cancel {
        let sleeper = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        let abort = sleeper.abort_handle();
        Cancel::new(move || abort.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn callback_fires_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        TokioTimer::new().schedule(
            Duration::from_millis(50),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert!(!fired.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn cancelled_callback_never_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let cancel = TokioTimer::new().schedule(
            Duration::from_millis(50),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        cancel.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
