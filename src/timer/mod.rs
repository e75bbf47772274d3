//! Timers - the callback-scheduling primitive tasks are built on.
//!
//! The task core never sleeps, spawns threads or runs an event loop. Anything
//! time-based (`Task::retry_loop`, `Task::delay`, `Task::fail_after`) goes
//! through a [`Timer`], which schedules a callback and hands back a
//! [`Cancel`] handle for it.
//!
//! Two implementations are provided:
//!
//! - [`ManualTimer`]: a virtual clock driven by [`ManualTimer::advance`].
//!   Deterministic, so it suits tests and simulations.
//! - `TokioTimer` (feature `async`): sleeps on the shared tokio runtime.
//!
//! # Examples
//!
//! ```rust
//! use taskarian::timer::{ManualTimer, Timer};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::time::Duration;
//!
//! let timer = ManualTimer::new();
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&fired);
//!
//! timer.schedule(Duration::from_millis(10), Box::new(move || flag.store(true, Ordering::SeqCst)));
//! timer.advance(Duration::from_millis(9));
//! assert!(!fired.load(Ordering::SeqCst));
//! timer.advance(Duration::from_millis(1));
//! assert!(fired.load(Ordering::SeqCst));
//! ```

mod manual;

#[cfg(feature = "async")]
mod tokio_timer;

use std::time::Duration;

use crate::task::Cancel;

pub use manual::ManualTimer;

#[cfg(feature = "async")]
pub use tokio_timer::TokioTimer;

/// A boxed callback run by a [`Timer`].
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// Schedules callbacks to run after a delay.
///
/// Implementations must never run the callback from inside `schedule`
/// itself, and must guarantee that once the returned handle is cancelled
/// the callback does not start.
pub trait Timer: Send + Sync {
    /// Runs `callback` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Cancel;
}
