//! Interop between tasks and Rust futures.
//!
//! - [`Task::from_future`] and [`Task::and_then_future`] lift futures into
//!   tasks. The futures are spawned on the shared runtime
//!   ([`crate::runtime::handle`]).
//! - [`Task::resolve`] goes the other way: it forks the task and returns a
//!   [`TaskFuture`] that completes with the task's outcome.
//!
//! A spawned future is never aborted by cancelling the task; it runs to
//! completion in the background and its outcome is discarded.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use parking_lot::Mutex;
use pin_project_lite::pin_project;

use super::{Cancel, Settler, Task};
use crate::runtime::{self, BlockingError};

pin_project! {
    /// A future completing with the outcome of one fork of a task.
    ///
    /// Returned by [`Task::resolve`]. Dropping it cancels the fork. If the
    /// fork never settles (for example `Task::race` of nothing), the future
    /// never completes.
    #[must_use = "futures do nothing unless polled, and dropping this one cancels the task"]
    pub struct TaskFuture<E, T> {
        #[pin]
        receiver: oneshot::Receiver<Result<T, E>>,
        cancel: Cancel,
    }

    impl<E, T> PinnedDrop for TaskFuture<E, T> {
        fn drop(this: Pin<&mut Self>) {
            this.project().cancel.cancel();
        }
    }
}

impl<E, T> Future for TaskFuture<E, T> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.receiver.poll(context) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The fork's settler owns the senders and lives in `cancel`, so
            // the channel only closes once this future is being dropped.
            Poll::Ready(Err(oneshot::Canceled)) | Poll::Pending => Poll::Pending,
        }
    }
}

fn spawn_settlement<E, T, Fut>(future: Fut, settler: Settler<E, T>)
where
    E: Send + 'static,
    T: Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    runtime::handle().spawn(async move {
        match future.await {
            Ok(value) => settler.resolve(value),
            Err(error) => settler.reject(error),
        };
    });
}

impl<E: Send + 'static, T: Send + 'static> Task<E, T> {
    /// Lifts a future factory into a task.
    ///
    /// Each fork calls `factory` and spawns the returned future; `Ok`
    /// resolves the task and `Err` rejects it.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use taskarian::task::Task;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let task = Task::<String, i32>::from_future(|| async { Ok(42) }).map(|n| n + 8);
    ///     assert_eq!(task.resolve().await, Ok(50));
    /// }
    /// ```
    pub fn from_future<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(move |reject, resolve| {
            spawn_settlement(factory(), Settler::new(reject, resolve));
            Cancel::noop()
        })
    }

    /// Chains a future built from the success value.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use taskarian::task::Task;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let task = Task::<String, i32>::succeed(42).and_then_future(|n| async move { Ok(n + 8) });
    ///     assert_eq!(task.resolve().await, Ok(50));
    /// }
    /// ```
    pub fn and_then_future<A, F, Fut>(self, function: F) -> Task<E, A>
    where
        A: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, E>> + Send + 'static,
    {
        let function = Arc::new(function);
        Task::new(move |reject, resolve| {
            let settler = Settler::new(reject, resolve);
            let function = Arc::clone(&function);
            let on_reject = settler.rejecter();
            self.fork(on_reject, move |value| {
                spawn_settlement(function(value), settler);
            })
        })
    }

    /// Forks the task and returns a future of its outcome.
    ///
    /// Every call is a new fork, so every call re-runs the task's effects.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use taskarian::task::Task;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let outcome = Task::<String, i32>::succeed(42).map(|n| n + 38).resolve().await;
    ///     assert_eq!(outcome, Ok(80));
    /// }
    /// ```
    pub fn resolve(&self) -> TaskFuture<E, T> {
        let (sender, receiver) = oneshot::channel();
        let sender = Arc::new(Mutex::new(Some(sender)));
        let on_reject = Arc::clone(&sender);
        let cancel = self.fork(
            move |error| deliver(&on_reject, Err(error)),
            move |value| deliver(&sender, Ok(value)),
        );
        TaskFuture { receiver, cancel }
    }

    /// Forks the task and blocks the current thread until it settles.
    ///
    /// A task that never settles blocks forever.
    ///
    /// # Errors
    ///
    /// Returns a [`BlockingError`] when called from a runtime that cannot
    /// block, such as a current-thread runtime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// let outcome = Task::<String, i32>::from_future(|| async { Ok(1) }).resolve_blocking();
    /// assert_eq!(outcome, Ok(Ok(1)));
    /// ```
    pub fn resolve_blocking(&self) -> Result<Result<T, E>, BlockingError> {
        runtime::try_run_blocking(self.resolve())
    }
}

type Sender<E, T> = Arc<Mutex<Option<oneshot::Sender<Result<T, E>>>>>;

fn deliver<E, T>(sender: &Sender<E, T>, outcome: Result<T, E>) {
    let sender = sender.lock().take();
    if let Some(sender) = sender {
        if sender.send(outcome).is_err() {
            tracing::debug!("task settled after its future was dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[rstest]
    #[tokio::test]
    async fn from_future_resolves_and_rejects() {
        let ok = Task::<String, i32>::from_future(|| async { Ok(42) }).map(|n| n + 8);
        assert_eq!(ok.resolve().await, Ok(50));

        let err = Task::<String, i32>::from_future(|| async { Err("whoops!".to_string()) })
            .map(|n| n + 8);
        assert_eq!(err.resolve().await, Err("whoops!".to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn from_future_calls_factory_once_per_fork() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let task = Task::<String, usize>::from_future(move || {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(call) }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(task.resolve().await, Ok(0));
        assert_eq!(task.resolve().await, Ok(1));
    }

    #[rstest]
    #[tokio::test]
    async fn and_then_future_chains_both_outcomes() {
        let ok = Task::<String, i32>::succeed(42).and_then_future(|n| async move { Ok(n + 8) });
        assert_eq!(ok.resolve().await, Ok(50));

        let err = Task::<String, i32>::succeed(42)
            .and_then_future(|_| async { Err::<i32, _>("Whoops!".to_string()) });
        assert_eq!(err.resolve().await, Err("Whoops!".to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn dropping_the_future_cancels_the_fork() {
        let aborts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&aborts);
        let task: Task<String, i32> = Task::new(move |_reject, _resolve| {
            let counter = Arc::clone(&counter);
            Cancel::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        drop(task.resolve());
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn future_of_task_dropping_its_continuations_stays_pending() {
        let task: Task<String, i32> = Task::new(|reject, resolve| {
            drop((reject, resolve));
            Cancel::noop()
        });

        let waited = tokio::time::timeout(Duration::from_secs(60), task.resolve()).await;
        assert!(waited.is_err());
    }

    #[rstest]
    fn resolve_blocking_outside_runtime() {
        let task = Task::<String, i32>::succeed(40).map(|n| n + 2);
        assert_eq!(task.resolve_blocking(), Ok(Ok(42)));
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn resolve_blocking_refuses_current_thread_runtime() {
        let task = Task::<String, i32>::succeed(1);
        assert_eq!(
            task.resolve_blocking(),
            Err(BlockingError::CurrentThreadRuntime)
        );
    }
}
