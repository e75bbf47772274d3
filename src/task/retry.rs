//! Interval-based retry.
//!
//! [`Task::retry_loop_with`] forks a task, and every time it fails schedules
//! another fork on a [`Timer`] after a constant interval. The first success
//! resolves the loop. Failures are never surfaced, so the loop's failure type
//! is [`Infallible`].

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Cancel, CancelSlot, Settler, Task};
use crate::timer::Timer;

#[cfg(feature = "async")]
use crate::timer::TokioTimer;

/// One fork of a retry loop.
///
/// Attempt `n` (counted from 1) occupies slot stage `2n - 2` and the timer
/// scheduled after its failure occupies stage `2n - 1`, so the slot always
/// holds whichever of the two is live.
struct RetryLoop<E, T> {
    task: Task<E, T>,
    timer: Arc<dyn Timer>,
    interval: Duration,
    settler: Settler<Infallible, T>,
    slot: CancelSlot,
    attempts: AtomicUsize,
}

impl<E: Send + 'static, T: Send + 'static> RetryLoop<E, T> {
    fn attempt(self: &Arc<Self>) {
        if self.settler.is_spent() {
            return;
        }
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let retry = Arc::clone(self);
        let finish = Arc::clone(self);
        let cancel = self.task.fork(
            move |_error| retry.schedule_retry(attempt),
            move |value| {
                if finish.settler.resolve(value) {
                    tracing::debug!(attempts = attempt, "retry loop resolved");
                }
            },
        );
        self.slot.enter(2 * attempt - 2, cancel);
    }

    fn schedule_retry(self: &Arc<Self>, attempt: usize) {
        if self.settler.is_spent() {
            return;
        }
        tracing::debug!(attempt, interval = ?self.interval, "attempt failed; scheduling retry");
        let next = Arc::clone(self);
        let pending = self
            .timer
            .schedule(self.interval, Box::new(move || next.attempt()));
        self.slot.enter(2 * attempt - 1, pending);
    }

    fn stop(&self) {
        self.settler.disarm();
        self.slot.cancel();
    }
}

impl<T: Send + 'static> Task<Infallible, T> {
    /// Retries `task` every `interval` until it succeeds, on the tokio timer.
    ///
    /// The timer is bound to the runtime current at the call, or to the
    /// shared runtime outside any runtime. See [`Task::retry_loop_with`].
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use taskarian::task::Task;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let flaky = Task::<String, i32>::from_future(|| async { Ok(42) });
    ///     let value = Task::retry_loop(Duration::from_millis(100), flaky).resolve().await;
    ///     assert_eq!(value, Ok(42));
    /// }
    /// ```
    #[cfg(feature = "async")]
    pub fn retry_loop<E>(interval: Duration, task: Task<E, T>) -> Self
    where
        E: Send + 'static,
    {
        Self::retry_loop_with(TokioTimer::new(), interval, task)
    }

    /// Retries `task` every `interval` until it succeeds, scheduling retries
    /// on `timer`.
    ///
    /// The first attempt is forked immediately. After each failure the next
    /// attempt waits `interval`; the interval never grows. Cancelling the
    /// loop cancels the pending timer (or the running attempt) and no
    /// further attempt is forked.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    /// use taskarian::timer::ManualTimer;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::time::Duration;
    ///
    /// let forks = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&forks);
    /// let flaky: Task<String, usize> = Task::new(move |reject, resolve| {
    ///     match counter.fetch_add(1, Ordering::SeqCst) {
    ///         0 | 1 => reject("not yet".to_string()),
    ///         attempt => resolve(attempt),
    ///     }
    ///     taskarian::task::Cancel::noop()
    /// });
    ///
    /// let timer = ManualTimer::new();
    /// let outcome = Arc::new(AtomicUsize::new(0));
    /// let sink = Arc::clone(&outcome);
    /// Task::retry_loop_with(timer.clone(), Duration::from_millis(10), flaky)
    ///     .fork(|never| match never {}, move |value| sink.store(value, Ordering::SeqCst));
    ///
    /// timer.advance(Duration::from_millis(20));
    /// assert_eq!(outcome.load(Ordering::SeqCst), 2);
    /// assert_eq!(forks.load(Ordering::SeqCst), 3);
    /// ```
    pub fn retry_loop_with<E, C>(timer: C, interval: Duration, task: Task<E, T>) -> Self
    where
        E: Send + 'static,
        C: Timer + 'static,
    {
        let timer: Arc<dyn Timer> = Arc::new(timer);
        Self::new(move |reject, resolve| {
            let retry = Arc::new(RetryLoop {
                task: task.clone(),
                timer: Arc::clone(&timer),
                interval,
                settler: Settler::new(reject, resolve),
                slot: CancelSlot::new(),
                attempts: AtomicUsize::new(0),
            });
            retry.attempt();
            Cancel::new(move || retry.stop())
        })
    }
}
