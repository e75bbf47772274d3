//! At-most-once delivery of a fork's outcome.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Reject, Resolve};

/// Shares a reject/resolve pair between several callers and delivers only
/// the first outcome.
///
/// Continuations are taken out of the lock before they run, so a continuation
/// may freely re-enter the settler (or anything else guarded by it).
pub(crate) struct Settler<E, T> {
    continuations: Arc<Mutex<Option<(Reject<E>, Resolve<T>)>>>,
}

impl<E, T> Clone for Settler<E, T> {
    fn clone(&self) -> Self {
        Self {
            continuations: Arc::clone(&self.continuations),
        }
    }
}

impl<E: Send + 'static, T: Send + 'static> Settler<E, T> {
    pub(crate) fn new(reject: Reject<E>, resolve: Resolve<T>) -> Self {
        Self {
            continuations: Arc::new(Mutex::new(Some((reject, resolve)))),
        }
    }

    /// Delivers `error`. Returns `false` if an outcome was already delivered
    /// or the settler was disarmed.
    pub(crate) fn reject(&self, error: E) -> bool {
        let continuations = self.continuations.lock().take();
        match continuations {
            Some((reject, _)) => {
                reject(error);
                true
            }
            None => false,
        }
    }

    /// Delivers `value`. Returns `false` if an outcome was already delivered
    /// or the settler was disarmed.
    pub(crate) fn resolve(&self, value: T) -> bool {
        let continuations = self.continuations.lock().take();
        match continuations {
            Some((_, resolve)) => {
                resolve(value);
                true
            }
            None => false,
        }
    }

    /// Drops the continuations without calling either. Returns `true` if
    /// the settler was still pending.
    pub(crate) fn disarm(&self) -> bool {
        let continuations = self.continuations.lock().take();
        continuations.is_some()
    }

    /// Returns `true` once an outcome was delivered or the settler was disarmed.
    pub(crate) fn is_spent(&self) -> bool {
        self.continuations.lock().is_none()
    }

    pub(crate) fn rejecter(&self) -> Reject<E> {
        let settler = self.clone();
        Box::new(move |error| {
            settler.reject(error);
        })
    }

    pub(crate) fn resolver(&self) -> Resolve<T> {
        let settler = self.clone();
        Box::new(move |value| {
            settler.resolve(value);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    type Outcome = Arc<Mutex<Vec<Result<i32, String>>>>;

    fn recording() -> (Outcome, Settler<String, i32>) {
        let outcomes: Outcome = Arc::new(Mutex::new(Vec::new()));
        let on_reject = Arc::clone(&outcomes);
        let on_resolve = Arc::clone(&outcomes);
        let settler = Settler::new(
            Box::new(move |error| on_reject.lock().push(Err(error))),
            Box::new(move |value| on_resolve.lock().push(Ok(value))),
        );
        (outcomes, settler)
    }

    #[rstest]
    fn first_outcome_wins() {
        let (outcomes, settler) = recording();
        assert!(settler.resolve(1));
        assert!(!settler.reject("late".to_string()));
        assert!(!settler.resolve(2));
        assert_eq!(*outcomes.lock(), vec![Ok(1)]);
    }

    #[rstest]
    fn disarmed_settler_delivers_nothing() {
        let (outcomes, settler) = recording();
        assert!(settler.disarm());
        assert!(!settler.disarm());
        assert!(settler.is_spent());
        settler.rejecter()("ignored".to_string());
        assert!(outcomes.lock().is_empty());
    }

    #[rstest]
    fn boxed_continuations_share_one_outcome() {
        let (outcomes, settler) = recording();
        let reject = settler.rejecter();
        let resolve = settler.resolver();
        reject("boom".to_string());
        resolve(7);
        assert_eq!(*outcomes.lock(), vec![Err("boom".to_string())]);
    }
}
