//! A virtual clock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::{Timer, TimerCallback};
use crate::task::Cancel;

/// A deterministic [`Timer`] whose clock only moves when told to.
///
/// Callbacks fire from [`ManualTimer::advance`], in deadline order; callbacks
/// with the same deadline fire in the order they were scheduled. A callback
/// scheduled by another callback fires in the same `advance` call if its
/// deadline falls inside the advanced window.
///
/// Clones share the same clock.
#[derive(Clone, Default)]
pub struct ManualTimer {
    clock: Arc<Mutex<Clock>>,
}

type Slot = (Duration, u64);

#[derive(Default)]
struct Clock {
    now: Duration,
    sequence: u64,
    scheduled: BTreeMap<Slot, TimerCallback>,
}

impl ManualTimer {
    /// Creates a clock at time zero with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of callbacks waiting to fire.
    pub fn pending(&self) -> usize {
        self.clock.lock().scheduled.len()
    }

    /// Moves the clock forward by `duration`, firing every callback that
    /// falls due. Returns how many callbacks fired.
    ///
    /// `advance(Duration::ZERO)` fires callbacks that are already due,
    /// including zero-delay ones.
    pub fn advance(&self, duration: Duration) -> usize {
        let target = self.now() + duration;
        let mut fired = 0;
        loop {
            let due = {
                let mut clock = self.clock.lock();
                let next = clock
                    .scheduled
                    .first_key_value()
                    .map(|(slot, _)| *slot)
                    .filter(|(deadline, _)| *deadline <= target);
                match next {
                    Some(slot) => {
                        clock.now = slot.0;
                        clock.scheduled.remove(&slot)
                    }
                    None => {
                        clock.now = target;
                        None
                    }
                }
            };
            match due {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => return fired,
            }
        }
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Cancel {
        let slot = {
            let mut clock = self.clock.lock();
            let slot = (clock.now + delay, clock.sequence);
            clock.sequence += 1;
            clock.scheduled.insert(slot, callback);
            slot
        };
        // Weak: a scheduled callback may own this very handle.
        let clock: Weak<Mutex<Clock>> = Arc::downgrade(&self.clock);
        Cancel::new(move || {
            if let Some(clock) = clock.upgrade() {
                let removed = clock.lock().scheduled.remove(&slot);
                drop(removed);
            }
        })
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self.clock.lock();
        formatter
            .debug_struct("ManualTimer")
            .field("now", &clock.now)
            .field("pending", &clock.scheduled.len())
            .finish()
    }
}
