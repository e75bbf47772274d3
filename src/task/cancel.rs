//! Cancellation handles.
//!
//! A [`Cancel`] is the value returned by [`Task::fork`](super::Task::fork)
//! and by every computation. Invoking it asks the running effect to abort.
//!
//! Handles are idempotent: the wrapped action runs at most once, no matter
//! how many clones of the handle are invoked or how often.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type CancelAction = Box<dyn FnOnce() + Send>;

/// An idempotent, cloneable cancellation handle.
///
/// # Examples
///
/// ```rust
/// use taskarian::task::Cancel;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// let cancel = Cancel::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// cancel.cancel();
/// cancel.clone().cancel();
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct Cancel {
    action: Arc<Mutex<Option<CancelAction>>>,
}

impl Cancel {
    /// Creates a handle that runs `action` the first time it is cancelled.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
        }
    }

    /// Creates a handle that does nothing.
    ///
    /// Used by computations that settle synchronously and therefore have
    /// nothing left to abort.
    pub fn noop() -> Self {
        Self {
            action: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs the cancellation action if it has not run yet.
    pub fn cancel(&self) {
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    /// Returns `true` once the handle has nothing left to do, either because
    /// it was cancelled or because it was created with [`Cancel::noop`].
    pub fn is_spent(&self) -> bool {
        self.action.lock().is_none()
    }
}

impl Default for Cancel {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Cancel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Cancel")
            .field("spent", &self.is_spent())
            .finish()
    }
}

// =============================================================================
// Stage Slot
// =============================================================================

/// Holds the cancel handle of whichever stage of a chain is currently live.
///
/// Stages are numbered in the order they start. A stage that registers late
/// (its predecessor settled synchronously before `fork` returned) never
/// displaces a later one, and a stage that registers after the slot was
/// cancelled is cancelled on the spot.
#[derive(Clone, Default)]
pub(crate) struct CancelSlot {
    state: Arc<Mutex<SlotState>>,
}

#[derive(Default)]
struct SlotState {
    stage: usize,
    current: Option<Cancel>,
    cancelled: bool,
}

impl CancelSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self, stage: usize, cancel: Cancel) {
        let mut state = self.state.lock();
        if state.cancelled {
            drop(state);
            cancel.cancel();
            return;
        }
        if stage < state.stage {
            return;
        }
        state.stage = stage;
        state.current = Some(cancel);
    }

    pub(crate) fn cancel(&self) {
        let current = {
            let mut state = self.state.lock();
            state.cancelled = true;
            state.current.take()
        };
        if let Some(current) = current {
            current.cancel();
        }
    }

    /// Returns a handle that cancels the live stage.
    pub(crate) fn handle(&self) -> Cancel {
        let slot = self.clone();
        Cancel::new(move || slot.cancel())
    }
}

// =============================================================================
// Child Set
// =============================================================================

/// The cancel handles of the children of a parallel combinator.
///
/// Once closed, every registered handle has been cancelled and any handle
/// registered afterwards is cancelled immediately.
#[derive(Clone, Default)]
pub(crate) struct CancelSet {
    state: Arc<Mutex<SetState>>,
}

#[derive(Default)]
struct SetState {
    closed: bool,
    handles: Vec<Cancel>,
}

impl CancelSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SetState {
                closed: false,
                handles: Vec::with_capacity(capacity),
            })),
        }
    }

    pub(crate) fn register(&self, cancel: Cancel) {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            cancel.cancel();
        } else {
            state.handles.push(cancel);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Closes the set and cancels every registered handle in registration order.
    pub(crate) fn cancel_all(&self) {
        let handles = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.handles)
        };
        for handle in handles {
            handle.cancel();
        }
    }

    pub(crate) fn handle(&self) -> Cancel {
        let set = self.clone();
        Cancel::new(move || set.cancel_all())
    }
}
