//! Timers on a virtual clock
//!
//! The wheel never sleeps. Its owner advances the clock with
//! [`TimerWheel::advance`] and due timers fire in deadline order on the
//! calling thread. Timers started before [`TimerWheel::set_ready`] are held
//! and only armed, relative to the clock at that moment, once the host is
//! ready.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, trace};
use wb_core::TimerId;
use wb_rules::{TimerHost, TimerRef, TimerTarget};

/// Shortest period a ticker may have; keeps `advance` finite
const MIN_PERIOD: Duration = Duration::from_millis(1);

struct Entry {
    target: TimerTarget,
    delay: Duration,
    periodic: bool,
    /// Deadline on the virtual clock, `None` while held
    due: Option<Duration>,
}

impl Entry {
    fn is_named(&self, name: &str) -> bool {
        matches!(&self.target, TimerTarget::Named(n) if n == name)
    }
}

#[derive(Default)]
struct WheelState {
    now: Duration,
    next_id: u64,
    ready: bool,
    entries: BTreeMap<TimerId, Entry>,
}

impl WheelState {
    /// Earliest armed timer due no later than `limit`
    fn next_due(&self, limit: Duration) -> Option<(TimerId, Duration)> {
        self.entries
            .iter()
            .filter_map(|(id, entry)| entry.due.map(|due| (*id, due)))
            .filter(|(_, due)| *due <= limit)
            .min_by_key(|(id, due)| (*due, *id))
    }
}

#[derive(Default)]
pub struct TimerWheel {
    state: Mutex<WheelState>,
    firing: Mutex<Option<String>>,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WheelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn firing(&self) -> MutexGuard<'_, Option<String>> {
        self.firing.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Arm every held timer
    pub fn set_ready(&self) {
        let mut state = self.lock();
        if state.ready {
            return;
        }
        state.ready = true;
        let now = state.now;
        let mut armed = 0;
        for entry in state.entries.values_mut() {
            if entry.due.is_none() {
                entry.due = Some(now + entry.delay);
                armed += 1;
            }
        }
        info!(armed, "Timers ready");
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of live timers, held ones included
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Advance the clock by `by`, firing due timers
    ///
    /// `on_named` runs for each named timer while it is marked as firing.
    /// Returns the number of firings.
    pub fn advance(&self, by: Duration, mut on_named: impl FnMut(&str)) -> usize {
        let limit = self.now() + by;
        let mut fired = 0;

        loop {
            let target = {
                let mut state = self.lock();
                let Some((id, due)) = state.next_due(limit) else {
                    state.now = limit;
                    break;
                };
                state.now = due;
                let Some(entry) = state.entries.get_mut(&id) else {
                    break;
                };
                let target = entry.target.clone();
                if entry.periodic {
                    entry.due = Some(due + entry.delay.max(MIN_PERIOD));
                } else {
                    state.entries.remove(&id);
                }
                target
            };

            self.fire(target, &mut on_named);
            fired += 1;
        }

        fired
    }

    fn fire(&self, target: TimerTarget, on_named: &mut impl FnMut(&str)) {
        match target {
            TimerTarget::Named(name) => {
                debug!(timer = %name, "Timer fired");
                *self.firing() = Some(name.clone());
                on_named(&name);
                *self.firing() = None;
            }
            TimerTarget::Callback(callback) => {
                trace!("Timer callback fired");
                callback();
            }
        }
    }
}

impl TimerHost for TimerWheel {
    fn start_timer(&self, target: TimerTarget, delay: Duration, periodic: bool) -> TimerId {
        let mut state = self.lock();
        if let TimerTarget::Named(name) = &target {
            state.entries.retain(|_, entry| !entry.is_named(name));
        }

        state.next_id += 1;
        let id = TimerId::new(state.next_id);
        let due = state.ready.then(|| state.now + delay);
        debug!(%id, ?target, ?delay, periodic, held = due.is_none(), "Timer started");

        state.entries.insert(
            id,
            Entry {
                target,
                delay,
                periodic,
                due,
            },
        );
        id
    }

    fn stop_timer(&self, timer: TimerRef) {
        let mut state = self.lock();
        match &timer {
            TimerRef::Named(name) => state.entries.retain(|_, entry| !entry.is_named(name)),
            TimerRef::Id(id) => {
                state.entries.remove(id);
            }
        }
        debug!(?timer, "Timer stopped");
    }

    fn is_timer_firing(&self, name: &str) -> bool {
        self.firing().as_deref() == Some(name)
    }
}
