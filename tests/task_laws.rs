//! Property-based tests for the Task functor and monad laws.
//!
//! Tasks built from `succeed`, `fail` and their combinators settle
//! synchronously, so the laws are checked by comparing the outcome each side
//! delivers before `fork` returns:
//! - Identity: m.map(|x| x) == m
//! - Composition: m.map(f).map(g) == m.map(|x| g(f(x)))
//! - Left Identity: succeed(a).and_then(f) == f(a)
//! - Right Identity: m.and_then(succeed) == m
//! - Associativity: m.and_then(f).and_then(g) == m.and_then(|x| f(x).and_then(g))

use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use taskarian::task::Task;

fn outcome<E, T>(task: &Task<E, T>) -> Option<Result<T, E>>
where
    E: Send + 'static,
    T: Send + 'static,
{
    let slot = Arc::new(Mutex::new(None));
    let on_reject = Arc::clone(&slot);
    let on_resolve = Arc::clone(&slot);
    task.fork(
        move |error| *on_reject.lock() = Some(Err(error)),
        move |value| *on_resolve.lock() = Some(Ok(value)),
    );
    slot.lock().take()
}

fn settled() -> impl Strategy<Value = Result<i32, String>> {
    prop_oneof![
        any::<i32>().prop_map(Ok),
        "[a-z]{1,8}".prop_map(Err),
    ]
}

fn halve_evens(n: i32) -> Task<String, i32> {
    if n % 2 == 0 {
        Task::succeed(n / 2)
    } else {
        Task::fail(format!("{n} is odd"))
    }
}

fn bump(n: i32) -> Task<String, i32> {
    Task::succeed(n.wrapping_add(1))
}

// =============================================================================
// Functor Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_task_functor_identity(input in settled()) {
        let task = Task::from_result(input);
        prop_assert_eq!(outcome(&task.clone().map(|x| x)), outcome(&task));
    }

    #[test]
    fn prop_task_functor_composition(input in settled()) {
        let function1 = |n: i32| n.wrapping_mul(3);
        let function2 = |n: i32| n.to_string();

        let task = Task::from_result(input);
        let left = task.clone().map(function1).map(function2);
        let right = task.map(move |x| function2(function1(x)));
        prop_assert_eq!(outcome(&left), outcome(&right));
    }

    #[test]
    fn prop_task_map_error_identity(input in settled()) {
        let task = Task::from_result(input);
        prop_assert_eq!(outcome(&task.clone().map_error(|e| e)), outcome(&task));
    }
}

// =============================================================================
// Monad Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_task_monad_left_identity(value: i32) {
        let left = Task::<String, i32>::succeed(value).and_then(halve_evens);
        prop_assert_eq!(outcome(&left), outcome(&halve_evens(value)));
    }

    #[test]
    fn prop_task_monad_right_identity(input in settled()) {
        let task = Task::from_result(input);
        prop_assert_eq!(outcome(&task.clone().and_then(Task::succeed)), outcome(&task));
    }

    #[test]
    fn prop_task_monad_associativity(input in settled()) {
        let task = Task::from_result(input);
        let left = task.clone().and_then(halve_evens).and_then(bump);
        let right = task.and_then(|x| halve_evens(x).and_then(bump));
        prop_assert_eq!(outcome(&left), outcome(&right));
    }

    #[test]
    fn prop_task_fail_short_circuits_and_then(error in "[a-z]{1,8}") {
        let task = Task::<String, i32>::fail(error.clone()).and_then(bump);
        prop_assert_eq!(outcome(&task), Some(Err(error)));
    }
}

// =============================================================================
// Settlement Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_task_all_preserves_input_order(values in prop::collection::vec(any::<i32>(), 0..16)) {
        let tasks: Vec<Task<String, i32>> = values.iter().copied().map(Task::succeed).collect();
        prop_assert_eq!(outcome(&Task::all(tasks)), Some(Ok(values)));
    }

    #[test]
    fn prop_task_race_takes_first_synchronous_child(values in prop::collection::vec(any::<i32>(), 1..8)) {
        let tasks: Vec<Task<String, i32>> = values.iter().copied().map(Task::succeed).collect();
        prop_assert_eq!(outcome(&Task::race(tasks)), Some(Ok(values[0])));
    }
}
