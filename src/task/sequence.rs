//! Step-driven sequencing.
//!
//! [`Task::run`] sequences a dynamically produced chain of dependent tasks
//! without nesting `and_then` calls. A [`Steps`] state machine is asked for
//! the next step, given the previous step's result; it answers either with a
//! task to run next ([`Step::Continue`]) or with the final value
//! ([`Step::Done`]).
//!
//! # Design Philosophy
//!
//! The driver is a trampoline: when a step's task settles synchronously the
//! driver loops instead of recursing, so long chains of synchronous steps run
//! in constant stack depth.
//!
//! # Examples
//!
//! ```rust
//! use taskarian::task::{Step, Task};
//!
//! let task: Task<String, i32> = Task::run(|| {
//!     let mut total = 0;
//!     move |previous: Option<i32>| {
//!         total += previous.unwrap_or(0);
//!         if total >= 10 {
//!             Step::Done(total)
//!         } else {
//!             Step::Continue(Task::succeed(4))
//!         }
//!     }
//! });
//!
//! task.fork(|_| unreachable!(), |total| assert_eq!(total, 12));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{Cancel, CancelSlot, Settler, Task};

/// What a [`Steps`] state machine does next.
pub enum Step<E, T> {
    /// Run this task; its result is passed to the next `resume` call.
    Continue(Task<E, T>),
    /// Stop and resolve the run with this value.
    Done(T),
}

impl<E, T: std::fmt::Debug> std::fmt::Debug for Step<E, T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue(task) => formatter.debug_tuple("Continue").field(task).finish(),
            Self::Done(value) => formatter.debug_tuple("Done").field(value).finish(),
        }
    }
}

/// A resumable state machine producing the steps of a [`Task::run`].
///
/// `resume` is called with `None` the first time and with the previous
/// step's result afterwards. It is never called again once it returns
/// [`Step::Done`] or once a step rejects.
///
/// Any `FnMut(Option<T>) -> Step<E, T>` closure implements this trait.
pub trait Steps<E, T>: Send {
    /// Produces the next step.
    fn resume(&mut self, previous: Option<T>) -> Step<E, T>;
}

impl<E, T, F> Steps<E, T> for F
where
    F: FnMut(Option<T>) -> Step<E, T> + Send,
{
    fn resume(&mut self, previous: Option<T>) -> Step<E, T> {
        self(previous)
    }
}

/// Where a step's result goes once its task settles.
enum Handoff<T> {
    /// `fork` has not returned yet; a result is parked for the loop.
    Forking,
    /// A result arrived before `fork` returned.
    Ready(T),
    /// `fork` returned without a result; the callback drives on its own.
    Returned,
}

struct Driver<E, T, S> {
    steps: Mutex<S>,
    settler: Settler<E, T>,
    slot: CancelSlot,
    stage: AtomicUsize,
}

impl<E, T, S> Driver<E, T, S>
where
    E: Send + 'static,
    T: Send + 'static,
    S: Steps<E, T> + 'static,
{
    fn drive(self: &Arc<Self>, mut previous: Option<T>) {
        loop {
            if self.settler.is_spent() {
                return;
            }
            let step = self.steps.lock().resume(previous.take());
            let task = match step {
                Step::Done(value) => {
                    self.settler.resolve(value);
                    return;
                }
                Step::Continue(task) => task,
            };

            let stage = self.stage.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(stage, "run forking step");

            let handoff = Arc::new(Mutex::new(Handoff::Forking));
            let parked = Arc::clone(&handoff);
            let driver = Arc::clone(self);
            let cancel = task.fork(self.settler.rejecter(), move |value| {
                let mut state = parked.lock();
                if matches!(*state, Handoff::Forking) {
                    *state = Handoff::Ready(value);
                } else {
                    drop(state);
                    driver.drive(Some(value));
                }
            });
            self.slot.enter(stage, cancel);

            let settled = std::mem::replace(&mut *handoff.lock(), Handoff::Returned);
            match settled {
                Handoff::Ready(value) => previous = Some(value),
                Handoff::Forking | Handoff::Returned => return,
            }
        }
    }

    fn stop(&self) {
        self.settler.disarm();
        self.slot.cancel();
    }
}

impl<E: Send + 'static, T: Send + 'static> Task<E, T> {
    /// Runs the steps produced by a fresh state machine from `factory`.
    ///
    /// Every fork calls `factory` once, so forks never share step state.
    /// The first rejecting step rejects the run and `resume` is not called
    /// again. Cancelling the run cancels the step in flight.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::{Step, Task};
    ///
    /// let task: Task<String, i32> = Task::run(|| {
    ///     let mut stage = 0;
    ///     move |previous: Option<i32>| {
    ///         stage += 1;
    ///         match (stage, previous) {
    ///             (1, _) => Step::Continue(Task::succeed(20)),
    ///             (2, Some(x)) => Step::Continue(Task::succeed(x + 1)),
    ///             (_, Some(x)) => Step::Done(x * 2),
    ///             (_, None) => Step::Continue(Task::fail("no value".to_string())),
    ///         }
    ///     }
    /// });
    ///
    /// task.fork(|_| unreachable!(), |value| assert_eq!(value, 42));
    /// ```
    pub fn run<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Steps<E, T> + 'static,
    {
        Self::new(move |reject, resolve| {
            let driver = Arc::new(Driver {
                steps: Mutex::new(factory()),
                settler: Settler::new(reject, resolve),
                slot: CancelSlot::new(),
                stage: AtomicUsize::new(0),
            });
            driver.drive(None);
            Cancel::new(move || driver.stop())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Resolve;
    use rstest::rstest;
    use std::sync::atomic::AtomicBool;

    fn outcome(task: &Task<String, i32>) -> Option<Result<i32, String>> {
        let slot = Arc::new(Mutex::new(None));
        let on_reject = Arc::clone(&slot);
        let on_resolve = Arc::clone(&slot);
        task.fork(
            move |error| *on_reject.lock() = Some(Err(error)),
            move |value| *on_resolve.lock() = Some(Ok(value)),
        );
        slot.lock().take()
    }

    fn counting_to(limit: i32) -> Task<String, i32> {
        Task::run(move || {
            move |previous: Option<i32>| match previous {
                Some(count) if count >= limit => Step::Done(count),
                previous => Step::Continue(Task::succeed(previous.unwrap_or(0) + 1)),
            }
        })
    }

    #[rstest]
    fn done_on_first_resume_resolves_without_steps() {
        let task: Task<String, i32> = Task::run(|| |_: Option<i32>| Step::Done(7));
        assert_eq!(outcome(&task), Some(Ok(7)));
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    fn feeds_results_back_into_steps(#[case] limit: i32) {
        assert_eq!(outcome(&counting_to(limit)), Some(Ok(limit)));
    }

    #[rstest]
    fn long_synchronous_runs_do_not_grow_the_stack() {
        assert_eq!(outcome(&counting_to(100_000)), Some(Ok(100_000)));
    }

    #[rstest]
    fn first_rejection_stops_the_run() {
        let resumed_after_failure = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&resumed_after_failure);
        let task: Task<String, i32> = Task::run(move || {
            let flag = Arc::clone(&flag);
            let mut failed = false;
            move |_: Option<i32>| {
                if failed {
                    flag.store(true, Ordering::SeqCst);
                    return Step::Done(0);
                }
                failed = true;
                Step::Continue(Task::fail("step failed".to_string()))
            }
        });

        assert_eq!(outcome(&task), Some(Err("step failed".to_string())));
        assert!(!resumed_after_failure.load(Ordering::SeqCst));
    }

    #[rstest]
    fn asynchronous_steps_resume_from_the_callback() {
        let parked: Arc<Mutex<Vec<Resolve<i32>>>> = Arc::new(Mutex::new(Vec::new()));
        let stash = Arc::clone(&parked);
        let deferred = Task::new(move |_reject, resolve| {
            stash.lock().push(resolve);
            Cancel::noop()
        });
        let task: Task<String, i32> = Task::run(move || {
            let deferred = deferred.clone();
            move |previous: Option<i32>| match previous {
                None => Step::Continue(deferred.clone()),
                Some(x) if x < 3 => Step::Continue(deferred.clone()),
                Some(x) => Step::Done(x * 10),
            }
        });

        let result = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&result);
        task.fork(|_| unreachable!(), move |value| *sink.lock() = Some(value));

        for input in 1..=3 {
            let resolve = parked.lock().pop();
            if let Some(resolve) = resolve {
                resolve(input);
            }
        }
        assert_eq!(*result.lock(), Some(30));
    }

    #[rstest]
    fn cancel_reaches_the_step_in_flight() {
        let aborts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&aborts);
        let pending: Task<String, i32> = Task::new(move |_reject, _resolve| {
            let counter = Arc::clone(&counter);
            Cancel::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        let task: Task<String, i32> = Task::run(move || {
            let pending = pending.clone();
            move |previous: Option<i32>| match previous {
                None => Step::Continue(Task::succeed(1)),
                Some(_) => Step::Continue(pending.clone()),
            }
        });

        let cancel = task.fork(|_| unreachable!(), |_| unreachable!());
        cancel.cancel();
        cancel.cancel();
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn each_fork_gets_fresh_steps() {
        let task = counting_to(3);
        assert_eq!(outcome(&task), Some(Ok(3)));
        assert_eq!(outcome(&task), Some(Ok(3)));
    }
}
