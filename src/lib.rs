//! # taskarian
//!
//! Deferred, cancellable asynchronous computations with a combinator algebra.
//!
//! ## Overview
//!
//! A [`Task<E, T>`](task::Task) is a recipe for a computation that either
//! resolves with a `T` or rejects with an `E`. Nothing runs until the task is
//! forked, every fork is an independent run, and every fork hands back a
//! [`Cancel`](task::Cancel) handle. The crate provides:
//!
//! - **Sequential combinators**: `map`, `map_error`, `and_then`, `or_else`,
//!   `assign`, `inspect`, `inspect_err`
//! - **Parallel combinators**: `all` (fail-fast join) and `race`
//!   (first settlement wins)
//! - **Retry and sequencing**: `retry_loop` and the step-driven `run`
//! - **Timers**: the [`Timer`](timer::Timer) primitive, with a tokio-backed
//!   and a deterministic manual implementation
//! - **Future interop**: `from_future`, `and_then_future` and `resolve`
//!
//! ## Feature Flags
//!
//! - `async` (default): tokio-backed runtime, timer and future interop
//!
//! ## Example
//!
//! ```rust
//! use taskarian::prelude::*;
//!
//! let task: Task<String, i32> = Task::all(vec![Task::succeed(20), Task::succeed(22)])
//!     .map(|values| values.into_iter().sum());
//!
//! task.fork(|_| unreachable!(), |sum| assert_eq!(sum, 42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use taskarian::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::MissingEnvironmentVar;
    pub use crate::task::{AllPolicy, Cancel, Source, Step, Steps, Task};
    pub use crate::timer::{ManualTimer, Timer};

    #[cfg(feature = "async")]
    pub use crate::task::TaskFuture;

    #[cfg(feature = "async")]
    pub use crate::timer::TokioTimer;
}

pub mod error;
pub mod task;
pub mod timer;

#[cfg(feature = "async")]
pub mod runtime;
