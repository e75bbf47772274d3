//! Sequential combinators.
//!
//! Each combinator returns a new task and runs nothing. When the new task is
//! forked it forks its source and wires the continuations accordingly.
//!
//! Combinators that start a second stage (`and_then`, `or_else`, `assign`)
//! keep the live stage's cancel handle in a shared slot, so cancelling the
//! outer handle aborts whichever stage is running at that moment.

use std::sync::Arc;

use super::{CancelSlot, Settler, Task};

/// Where [`Task::assign`] gets the task whose result is merged in.
///
/// # Examples
///
/// ```rust
/// use taskarian::task::{Source, Task};
///
/// let direct: Source<String, i32, i32> = Task::succeed(8).into();
/// let derived: Source<String, i32, i32> = Source::derived(|x: &i32| Task::succeed(x * 2));
/// # let _ = (direct, derived);
/// ```
pub enum Source<E, T, A> {
    /// A task that does not depend on the accumulated value.
    Direct(Task<E, A>),
    /// A task derived from the accumulated value.
    Derived(Arc<dyn Fn(&T) -> Task<E, A> + Send + Sync>),
}

impl<E, T, A> Source<E, T, A> {
    /// Wraps a derivation function.
    pub fn derived<F>(derive: F) -> Self
    where
        F: Fn(&T) -> Task<E, A> + Send + Sync + 'static,
    {
        Self::Derived(Arc::new(derive))
    }
}

impl<E, T, A> From<Task<E, A>> for Source<E, T, A> {
    fn from(task: Task<E, A>) -> Self {
        Self::Direct(task)
    }
}

impl<E, T, A> Clone for Source<E, T, A> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct(task) => Self::Direct(task.clone()),
            Self::Derived(derive) => Self::Derived(Arc::clone(derive)),
        }
    }
}

impl<E: Send + 'static, T: Send + 'static> Task<E, T> {
    /// Transforms the success value. Failures pass through unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// Task::<String, i32>::succeed(42)
    ///     .map(|x| x - 12)
    ///     .fork(|_| unreachable!(), |value| assert_eq!(value, 30));
    /// ```
    pub fn map<A, F>(self, function: F) -> Task<E, A>
    where
        A: Send + 'static,
        F: Fn(T) -> A + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Task::new(move |reject, resolve| {
            let function = Arc::clone(&function);
            self.fork(reject, move |value| resolve(function(value)))
        })
    }

    /// Transforms the failure value. Successes pass through unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// Task::<String, i32>::fail("Oops!".to_string())
    ///     .map_error(|error| error.to_uppercase())
    ///     .fork(|error| assert_eq!(error, "OOPS!"), |_| unreachable!());
    /// ```
    pub fn map_error<X, F>(self, function: F) -> Task<X, T>
    where
        X: Send + 'static,
        F: Fn(E) -> X + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Task::new(move |reject, resolve| {
            let function = Arc::clone(&function);
            self.fork(move |error| reject(function(error)), resolve)
        })
    }

    /// Chains a task built from the success value.
    ///
    /// A failure of either stage rejects the result; `function` is never
    /// called when the first stage fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// Task::<String, i32>::succeed(42)
    ///     .and_then(|x| Task::succeed(x - 12))
    ///     .fork(|_| unreachable!(), |value| assert_eq!(value, 30));
    /// ```
    pub fn and_then<A, F>(self, function: F) -> Task<E, A>
    where
        A: Send + 'static,
        F: Fn(T) -> Task<E, A> + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Task::new(move |reject, resolve| {
            let settler = Settler::new(reject, resolve);
            let slot = CancelSlot::new();
            let function = Arc::clone(&function);
            let next_slot = slot.clone();
            let on_reject = settler.rejecter();
            let first = self.fork(on_reject, move |value| {
                let second = function(value).fork(settler.rejecter(), settler.resolver());
                next_slot.enter(1, second);
            });
            slot.enter(0, first);
            slot.handle()
        })
    }

    /// Alias for [`Task::and_then`].
    pub fn flat_map<A, F>(self, function: F) -> Task<E, A>
    where
        A: Send + 'static,
        F: Fn(T) -> Task<E, A> + Send + Sync + 'static,
    {
        self.and_then(function)
    }

    /// Recovers from a failure with a task built from the error.
    ///
    /// The recovery task may fail with a different error type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// Task::<String, usize>::fail("Oops!".to_string())
    ///     .or_else(|error| Task::<(), usize>::succeed(error.len()))
    ///     .fork(|_| unreachable!(), |value| assert_eq!(value, 5));
    /// ```
    pub fn or_else<X, F>(self, function: F) -> Task<X, T>
    where
        X: Send + 'static,
        F: Fn(E) -> Task<X, T> + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Task::new(move |reject, resolve| {
            let settler = Settler::new(reject, resolve);
            let slot = CancelSlot::new();
            let function = Arc::clone(&function);
            let next_slot = slot.clone();
            let on_resolve = settler.resolver();
            let first = self.fork(
                move |error| {
                    let second = function(error).fork(settler.rejecter(), settler.resolver());
                    next_slot.enter(1, second);
                },
                on_resolve,
            );
            slot.enter(0, first);
            slot.handle()
        })
    }

    /// Runs another task and merges its result into the accumulated value.
    ///
    /// `source` is either a task or a function deriving one from the value
    /// accumulated so far. `merge` combines the accumulated value with the
    /// new result, typically by setting one field of a record. Any failure
    /// short-circuits the chain.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::{Source, Task};
    ///
    /// #[derive(Clone, Default, Debug, PartialEq)]
    /// struct Scope {
    ///     x: i32,
    ///     y: i32,
    ///     z: String,
    /// }
    ///
    /// Task::<String, Scope>::succeed(Scope::default())
    ///     .assign(Task::succeed(42), |scope, x| Scope { x, ..scope })
    ///     .assign(Task::succeed(8), |scope, y| Scope { y, ..scope })
    ///     .assign(
    ///         Source::derived(|scope: &Scope| Task::succeed((scope.x + scope.y).to_string())),
    ///         |scope, z| Scope { z, ..scope },
    ///     )
    ///     .fork(|_| unreachable!(), |scope| assert_eq!(scope.z, "50"));
    /// ```
    pub fn assign<A, B, S, M>(self, source: S, merge: M) -> Task<E, B>
    where
        T: Clone + Sync,
        A: Send + 'static,
        B: Send + 'static,
        S: Into<Source<E, T, A>>,
        M: Fn(T, A) -> B + Send + Sync + 'static,
    {
        let source = source.into();
        let merge = Arc::new(merge);
        self.and_then(move |record| {
            let next = match &source {
                Source::Direct(task) => task.clone(),
                Source::Derived(derive) => derive(&record),
            };
            let merge = Arc::clone(&merge);
            next.map(move |value| merge(record.clone(), value))
        })
    }

    /// Runs a side effect on the success value without altering it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// Task::<String, &str>::succeed("hi")
    ///     .inspect(|greeting| println!("{greeting}"))
    ///     .fork(|_| unreachable!(), |value| assert_eq!(value, "hi"));
    /// ```
    pub fn inspect<F>(self, function: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.map(move |value| {
            function(&value);
            value
        })
    }

    /// Runs a side effect on the failure value without altering it.
    pub fn inspect_err<F>(self, function: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.map_error(move |error| {
            function(&error);
            error
        })
    }
}
