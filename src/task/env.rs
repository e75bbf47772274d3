//! Environment lookups as tasks.

use super::{Cancel, Task};
use crate::error::MissingEnvironmentVar;

impl Task<MissingEnvironmentVar, String> {
    /// A task that reads the environment variable `key` when forked.
    ///
    /// Each fork reads the variable anew. A variable that is unset or not
    /// valid unicode rejects with [`MissingEnvironmentVar`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskarian::task::Task;
    ///
    /// Task::read_var("TASKARIAN_SURELY_UNSET_VARIABLE").fork(
    ///     |error| assert_eq!(error.key, "TASKARIAN_SURELY_UNSET_VARIABLE"),
    ///     |_| unreachable!(),
    /// );
    /// ```
    pub fn read_var(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |reject, resolve| {
            match std::env::var(&key) {
                Ok(value) => resolve(value),
                Err(_) => reject(MissingEnvironmentVar::new(key.clone())),
            }
            Cancel::noop()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rstest::rstest;
    use std::sync::Arc;

    fn outcome(task: &Task<MissingEnvironmentVar, String>) -> Option<Result<String, MissingEnvironmentVar>> {
        let slot = Arc::new(Mutex::new(None));
        let on_reject = Arc::clone(&slot);
        let on_resolve = Arc::clone(&slot);
        task.fork(
            move |error| *on_reject.lock() = Some(Err(error)),
            move |value| *on_resolve.lock() = Some(Ok(value)),
        );
        slot.lock().take()
    }

    #[rstest]
    fn present_variable_resolves() {
        let expected = std::env::var("PATH").ok();
        assert_eq!(outcome(&Task::read_var("PATH")).and_then(Result::ok), expected);
    }

    #[rstest]
    fn missing_variable_rejects_with_key() {
        let key = "TASKARIAN_TEST_VARIABLE_THAT_IS_NEVER_SET";
        assert_eq!(
            outcome(&Task::read_var(key)),
            Some(Err(MissingEnvironmentVar::new(key)))
        );
    }
}
