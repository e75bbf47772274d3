//! Parallel combinators: fail-fast join and first-settle-wins race.
//!
//! Both combinators fork every child synchronously, in input order, before
//! any result is observed. Children settle in whatever order their effects
//! complete.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Cancel, CancelSet, Reject, Resolve, Settler, Task};

/// What [`Task::all_with`] does with still-running children once one of
/// them rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllPolicy {
    /// Siblings keep running; their results are discarded.
    #[default]
    LeaveRunning,
    /// Siblings are cancelled and children not yet forked are never forked.
    CancelSiblings,
}

struct JoinState<T> {
    results: Vec<Option<T>>,
    remaining: usize,
}

impl<E: Send + 'static, T: Send + 'static> Task<E, T> {
    /// Runs every task in parallel and collects the results in input order.
    ///
    /// The first rejection rejects the aggregate; other results are
    /// discarded and the remaining children keep running. An empty input
    /// resolves immediately with an empty vector.
    ///
    /// Cancelling the aggregate cancels every child.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// Task::<String, i32>::all(vec![Task::succeed(1), Task::succeed(2), Task::succeed(3)])
    ///     .fork(|_| unreachable!(), |values| assert_eq!(values, vec![1, 2, 3]));
    /// ```
    pub fn all<I>(tasks: I) -> Task<E, Vec<T>>
    where
        I: IntoIterator<Item = Self>,
    {
        Self::all_with(tasks, AllPolicy::LeaveRunning)
    }

    /// Like [`Task::all`], with an explicit policy for siblings of a failed child.
    pub fn all_with<I>(tasks: I, policy: AllPolicy) -> Task<E, Vec<T>>
    where
        I: IntoIterator<Item = Self>,
    {
        let tasks: Arc<[Self]> = tasks.into_iter().collect();
        if tasks.is_empty() {
            return Task::new(|_reject, resolve| {
                resolve(Vec::new());
                Cancel::noop()
            });
        }
        Task::new(move |reject, resolve| fork_all(&tasks, policy, reject, resolve))
    }

    /// Runs every task in parallel; the first one to settle wins.
    ///
    /// Rejections count as settling: the first rejection rejects the
    /// aggregate just as the first resolution resolves it. At that moment
    /// every other child is cancelled. Every child is forked, in input
    /// order, even when an earlier one settles during `fork`; such late
    /// children are cancelled as soon as they are forked. An empty input
    /// never settles.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::{Cancel, Task};
    ///
    /// let never: Task<String, i32> = Task::new(|_reject, _resolve| Cancel::noop());
    /// Task::race(vec![never, Task::succeed(7)])
    ///     .fork(|_| unreachable!(), |value| assert_eq!(value, 7));
    /// ```
    pub fn race<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let tasks: Arc<[Self]> = tasks.into_iter().collect();
        if tasks.is_empty() {
            return Self::new(|_reject, _resolve| Cancel::noop());
        }
        Self::new(move |reject, resolve| fork_race(&tasks, reject, resolve))
    }
}

fn fork_all<E, T>(
    tasks: &[Task<E, T>],
    policy: AllPolicy,
    reject: Reject<E>,
    resolve: Resolve<Vec<T>>,
) -> Cancel
where
    E: Send + 'static,
    T: Send + 'static,
{
    let count = tasks.len();
    tracing::trace!(count, ?policy, "forking parallel join");

    let settler = Settler::new(reject, resolve);
    let children = CancelSet::with_capacity(count);
    let state = Arc::new(Mutex::new(JoinState {
        results: (0..count).map(|_| None).collect(),
        remaining: count,
    }));

    for (index, task) in tasks.iter().enumerate() {
        if children.is_closed() {
            break;
        }

        let on_reject = {
            let settler = settler.clone();
            let children = children.clone();
            move |error| {
                if settler.reject(error) && policy == AllPolicy::CancelSiblings {
                    tracing::debug!(index, "join child rejected; cancelling siblings");
                    children.cancel_all();
                }
            }
        };
        let on_resolve = {
            let settler = settler.clone();
            let state = Arc::clone(&state);
            move |value| {
                let completed = {
                    let mut state = state.lock();
                    state.results[index] = Some(value);
                    state.remaining -= 1;
                    if state.remaining == 0 {
                        Some(state.results.drain(..).flatten().collect::<Vec<_>>())
                    } else {
                        None
                    }
                };
                if let Some(values) = completed {
                    settler.resolve(values);
                }
            }
        };

        children.register(task.fork(on_reject, on_resolve));
    }

    children.handle()
}

fn fork_race<E, T>(tasks: &[Task<E, T>], reject: Reject<E>, resolve: Resolve<T>) -> Cancel
where
    E: Send + 'static,
    T: Send + 'static,
{
    tracing::trace!(count = tasks.len(), "forking race");

    let settler = Settler::new(reject, resolve);
    let children = CancelSet::with_capacity(tasks.len());

    // Every child is forked even after the race settles; a child forked
    // late registers into a closed set and is cancelled on the spot.
    for (index, task) in tasks.iter().enumerate() {
        let on_reject = {
            let settler = settler.clone();
            let children = children.clone();
            move |error| {
                if settler.reject(error) {
                    tracing::trace!(index, "race settled by rejection");
                    children.cancel_all();
                }
            }
        };
        let on_resolve = {
            let settler = settler.clone();
            let children = children.clone();
            move |value| {
                if settler.resolve(value) {
                    tracing::trace!(index, "race settled by resolution");
                    children.cancel_all();
                }
            }
        };

        children.register(task.fork(on_reject, on_resolve));
    }

    children.handle()
}
