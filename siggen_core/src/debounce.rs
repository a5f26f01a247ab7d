//! Per-field debounce timers driven by a [`Clock`].
//!
//! Timers are cooperative: nothing fires on its own. The owner polls
//! [`Debouncer::take_if_due`] from its event loop and runs the deferred apply
//! when it returns true. Re-arming replaces the pending deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use siggen_traits::Clock;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Pending deadline of one field; at most one at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceState {
    deadline: Option<Instant>,
}

impl DebounceState {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Shared interval and time source for all timers of a panel.
#[derive(Clone)]
pub struct Debouncer {
    interval: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Debouncer")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Debouncer {
    pub fn new(interval: Duration, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { interval, clock }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Arm or re-arm: the deadline becomes `now + interval`.
    pub fn arm(&self, state: &mut DebounceState) -> Instant {
        let deadline = self.clock.now() + self.interval;
        state.deadline = Some(deadline);
        deadline
    }

    pub fn cancel(&self, state: &mut DebounceState) {
        state.deadline = None;
    }

    /// Clear and report a deadline that has passed.
    pub fn take_if_due(&self, state: &mut DebounceState) -> bool {
        match state.deadline {
            Some(deadline) if self.clock.now() >= deadline => {
                state.deadline = None;
                true
            }
            _ => false,
        }
    }
}
