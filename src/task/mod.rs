//! Task - deferred, cancellable asynchronous computations.
//!
//! A [`Task<E, T>`] describes a computation that, once forked, settles
//! exactly once: it either resolves with a `T` or rejects with an `E`.
//! Building a task (through a constructor or any combinator) performs no
//! side effects. Execution starts only when [`Task::fork`] is called, and
//! every fork is an independent run that re-executes all effects.
//!
//! # Design Philosophy
//!
//! A task wraps a single *computation*: a function that receives a reject
//! continuation and a resolve continuation, starts some effect, and returns
//! a [`Cancel`] handle. Combinators build new computations out of old ones;
//! none of them ever blocks or suspends. They register continuations and
//! return immediately.
//!
//! # Examples
//!
//! ```rust
//! use taskarian::task::Task;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! let observed = Arc::new(AtomicI32::new(0));
//! let sink = Arc::clone(&observed);
//!
//! let task: Task<String, i32> = Task::succeed(20)
//!     .map(|x| x + 1)
//!     .and_then(|x| Task::succeed(x * 2));
//!
//! // Pure chains settle before `fork` returns.
//! task.fork(|_| {}, move |value| sink.store(value, Ordering::SeqCst));
//! assert_eq!(observed.load(Ordering::SeqCst), 42);
//! ```
//!
//! # Settlement Guarantees
//!
//! - A fork delivers at most one outcome, even when the computation calls
//!   both continuations or calls one twice.
//! - Once the handle returned by `fork` is invoked, the fork never settles.
//!   Computations that cannot abort their effect still have their outcome
//!   suppressed.
//! - Invoking a handle after settlement, or more than once, does nothing.
//! - Panics raised inside a computation are not caught; they unwind out of
//!   `fork` like any other panic.

mod cancel;
mod env;
mod parallel;
mod retry;
mod sequence;
mod sequential;
mod settle;
mod timed;

#[cfg(feature = "async")]
mod interop;

use std::fmt;
use std::sync::Arc;

pub use cancel::Cancel;
pub use parallel::AllPolicy;
pub use sequence::{Step, Steps};
pub use sequential::Source;

#[cfg(feature = "async")]
pub use interop::TaskFuture;

pub(crate) use cancel::{CancelSet, CancelSlot};
pub(crate) use settle::Settler;

/// The failure continuation handed to a computation.
pub type Reject<E> = Box<dyn FnOnce(E) + Send>;

/// The success continuation handed to a computation.
pub type Resolve<T> = Box<dyn FnOnce(T) + Send>;

type Computation<E, T> = Arc<dyn Fn(Reject<E>, Resolve<T>) -> Cancel + Send + Sync>;

/// A deferred computation that either resolves with `T` or rejects with `E`.
///
/// Tasks are immutable recipes. Cloning is cheap (the computation is shared)
/// and forking the same task twice produces two unrelated runs.
///
/// # Type Parameters
///
/// - `E`: The failure type. The crate never constrains or wraps it.
/// - `T`: The success type.
///
/// # Laws
///
/// For every task `m` and functions `f`, `g`:
///
/// 1. **Identity**: `m.map(|x| x)` settles like `m`
/// 2. **Composition**: `m.map(f).map(g)` settles like `m.map(|x| g(f(x)))`
/// 3. **Left Identity**: `Task::succeed(a).and_then(f)` settles like `f(a)`
/// 4. **Right Identity**: `m.and_then(Task::succeed)` settles like `m`
pub struct Task<E, T> {
    computation: Computation<E, T>,
}

impl<E, T> Clone for Task<E, T> {
    fn clone(&self) -> Self {
        Self {
            computation: Arc::clone(&self.computation),
        }
    }
}

impl<E, T> fmt::Debug for Task<E, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Task").finish_non_exhaustive()
    }
}

impl<E: Send + 'static, T: Send + 'static> Task<E, T> {
    /// Creates a task from a computation.
    ///
    /// The computation runs once per fork. It should start its effect,
    /// eventually call at most one of the two continuations, and return a
    /// handle that aborts the effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::{Cancel, Task};
    ///
    /// let task: Task<String, i32> = Task::new(|_reject, resolve| {
    ///     resolve(42);
    ///     Cancel::noop()
    /// });
    /// # let _ = task;
    /// ```
    pub fn new<F>(computation: F) -> Self
    where
        F: Fn(Reject<E>, Resolve<T>) -> Cancel + Send + Sync + 'static,
    {
        Self {
            computation: Arc::new(computation),
        }
    }

    /// Runs the task.
    ///
    /// `reject` receives the error if the task fails, `resolve` the value if
    /// it succeeds. At most one of them is ever called. The returned handle
    /// aborts the run; after it is invoked neither continuation fires.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// let cancel = Task::<String, i32>::fail("oops".to_string()).fork(
    ///     |error| assert_eq!(error, "oops"),
    ///     |_| unreachable!("a failed task never resolves"),
    /// );
    /// cancel.cancel();
    /// ```
    pub fn fork<R, S>(&self, reject: R, resolve: S) -> Cancel
    where
        R: FnOnce(E) + Send + 'static,
        S: FnOnce(T) + Send + 'static,
    {
        let settler = Settler::new(Box::new(reject), Box::new(resolve));
        let cancel = (self.computation)(settler.rejecter(), settler.resolver());
        Cancel::new(move || {
            if settler.disarm() {
                cancel.cancel();
            }
        })
    }

    /// A task that always resolves with `value`, synchronously.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// let task: Task<String, i32> = Task::succeed(42);
    /// task.fork(|_| unreachable!(), |value| assert_eq!(value, 42));
    /// ```
    pub fn succeed(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move |_reject, resolve| {
            resolve(value.clone());
            Cancel::noop()
        })
    }

    /// A task that always rejects with `error`, synchronously.
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::new(move |reject, _resolve| {
            reject(error.clone());
            Cancel::noop()
        })
    }

    /// Folds a `Result` into a task that settles synchronously.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// let parsed: Result<i32, String> = "12".parse::<i32>().map_err(|e| e.to_string());
    /// Task::from_result(parsed).fork(|_| unreachable!(), |value| assert_eq!(value, 12));
    /// ```
    pub fn from_result(outcome: Result<T, E>) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
    {
        Self::new(move |reject, resolve| {
            match outcome.clone() {
                Ok(value) => resolve(value),
                Err(error) => reject(error),
            }
            Cancel::noop()
        })
    }

    /// Folds an `Option` into a task, rejecting with `error` on `None`.
    pub fn from_option(option: Option<T>, error: E) -> Self
    where
        T: Clone + Sync,
        E: Clone + Sync,
    {
        Self::from_result(option.ok_or(error))
    }
}

static_assertions::assert_impl_all!(Task<String, i32>: Send, Sync, Clone);
static_assertions::assert_impl_all!(Cancel: Send, Sync, Clone);
