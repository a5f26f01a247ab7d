//! Cooperative loops driving a [`ControlPanel`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::panel::ControlPanel;

/// Cap on a single wait so the shutdown flag is polled regularly.
const MAX_WAIT: Duration = Duration::from_millis(50);

/// Pump events and sleep on the panel's clock until no event is queued and no
/// debounce timer is armed. Returns the number of debounced writes issued.
pub fn run_until_idle(panel: &mut ControlPanel) -> usize {
    let clock = panel.clock().clone();
    let mut applied = 0;
    loop {
        applied += panel.pump();
        if !panel.has_pending() {
            return applied;
        }
        if let Some(deadline) = panel.next_deadline() {
            clock.sleep(deadline.saturating_duration_since(clock.now()));
        }
    }
}

/// Block on the event channel and fire debounce timers until `shutdown` is
/// set. `idle` bounds the wait when nothing is armed.
pub fn run_event_loop(panel: &mut ControlPanel, shutdown: &AtomicBool, idle: Duration) -> usize {
    let clock = panel.clock().clone();
    let mut applied = 0;
    while !shutdown.load(Ordering::Relaxed) {
        applied += panel.pump();
        let wait = panel
            .next_deadline()
            .map_or(idle, |d| d.saturating_duration_since(clock.now()).min(idle))
            .min(MAX_WAIT);
        panel.wait_event(wait);
    }
    applied + panel.pump()
}
