//! Timer-backed constructors.

use std::sync::Arc;
use std::time::Duration;

use super::Task;
use crate::timer::Timer;

impl<E: Send + 'static, T: Send + 'static> Task<E, T> {
    /// A task that resolves with `value` once `duration` has elapsed on `timer`.
    ///
    /// Cancelling the fork cancels the scheduled callback.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    /// use taskarian::timer::ManualTimer;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicI32, Ordering};
    /// use std::time::Duration;
    ///
    /// let timer = ManualTimer::new();
    /// let seen = Arc::new(AtomicI32::new(0));
    /// let sink = Arc::clone(&seen);
    ///
    /// Task::<String, i32>::delay(timer.clone(), Duration::from_secs(1), 42)
    ///     .fork(|_| unreachable!(), move |value| sink.store(value, Ordering::SeqCst));
    ///
    /// assert_eq!(seen.load(Ordering::SeqCst), 0);
    /// timer.advance(Duration::from_secs(1));
    /// assert_eq!(seen.load(Ordering::SeqCst), 42);
    /// ```
    pub fn delay<C>(timer: C, duration: Duration, value: T) -> Self
    where
        C: Timer + 'static,
        T: Clone + Sync,
    {
        let timer = Arc::new(timer);
        Self::new(move |_reject, resolve| {
            let value = value.clone();
            timer.schedule(duration, Box::new(move || resolve(value)))
        })
    }

    /// A task that rejects with `error` once `duration` has elapsed on `timer`.
    ///
    /// Racing a task against `fail_after` bounds how long it may run:
    ///
    /// ```rust
    /// use taskarian::task::{Cancel, Task};
    /// use taskarian::timer::ManualTimer;
    /// use std::time::Duration;
    ///
    /// let timer = ManualTimer::new();
    /// let stuck: Task<String, i32> = Task::new(|_reject, _resolve| Cancel::noop());
    /// let bounded = Task::race(vec![
    ///     stuck,
    ///     Task::fail_after(timer.clone(), Duration::from_millis(50), "timed out".to_string()),
    /// ]);
    ///
    /// bounded.fork(|error| assert_eq!(error, "timed out"), |_| unreachable!());
    /// timer.advance(Duration::from_millis(50));
    /// ```
    pub fn fail_after<C>(timer: C, duration: Duration, error: E) -> Self
    where
        C: Timer + 'static,
        E: Clone + Sync,
    {
        let timer = Arc::new(timer);
        Self::new(move |reject, _resolve| {
            let error = error.clone();
            timer.schedule(duration, Box::new(move || reject(error)))
        })
    }
}
