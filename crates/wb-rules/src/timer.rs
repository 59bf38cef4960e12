//! Uniform start/stop/status over host timer primitives

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use wb_core::TimerId;

use crate::catalog::LazyCatalog;
use crate::error::RuleResult;
use crate::host::{TimerHost, TimerRef, TimerTarget};

/// Status wrapper for a named timer
pub struct TimerStatus {
    name: String,
    host: Arc<dyn TimerHost>,
}

impl TimerStatus {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this timer is the one currently firing
    pub fn firing(&self) -> bool {
        self.host.is_timer_firing(&self.name)
    }

    /// Cancel the timer
    pub fn stop(&self) {
        debug!(timer = %self.name, "Stopping timer");
        self.host.stop_timer(TimerRef::Named(self.name.clone()));
    }
}

/// Named timers, tickers and deferred callbacks
pub struct Timers {
    host: Arc<dyn TimerHost>,
    statuses: LazyCatalog<TimerStatus>,
}

impl Timers {
    pub fn new(host: Arc<dyn TimerHost>) -> Self {
        let status_host = host.clone();
        Self {
            host,
            statuses: LazyCatalog::new(move |name| TimerStatus {
                name: name.to_string(),
                host: status_host.clone(),
            }),
        }
    }

    /// Start a named timer
    pub fn start(&self, name: &str, delay: Duration, periodic: bool) {
        debug!(timer = name, ?delay, periodic, "Starting timer");
        self.host.start_timer(TimerTarget::Named(name.to_string()), delay, periodic);
    }

    /// Start a one-shot named timer
    pub fn start_timer(&self, name: &str, delay: Duration) {
        self.start(name, delay, false);
    }

    /// Start a periodic named timer
    pub fn start_ticker(&self, name: &str, delay: Duration) {
        self.start(name, delay, true);
    }

    /// Status wrapper for `name`
    pub fn get(&self, name: &str) -> Arc<TimerStatus> {
        self.statuses.get(name)
    }

    /// Status catalog backing [`Timers::get`]
    pub fn statuses(&self) -> &LazyCatalog<TimerStatus> {
        &self.statuses
    }

    /// Run `callback` once after `delay`
    pub fn set_timeout<F>(&self, callback: F, delay: Duration) -> TimerId
    where
        F: Fn() -> RuleResult<()> + Send + Sync + 'static,
    {
        self.host.start_timer(Self::isolate(callback), delay, false)
    }

    /// Run `callback` every `delay`
    pub fn set_interval<F>(&self, callback: F, delay: Duration) -> TimerId
    where
        F: Fn() -> RuleResult<()> + Send + Sync + 'static,
    {
        self.host.start_timer(Self::isolate(callback), delay, true)
    }

    pub fn clear_timeout(&self, id: TimerId) {
        self.host.stop_timer(TimerRef::Id(id));
    }

    pub fn clear_interval(&self, id: TimerId) {
        self.clear_timeout(id);
    }

    fn isolate<F>(callback: F) -> TimerTarget
    where
        F: Fn() -> RuleResult<()> + Send + Sync + 'static,
    {
        TimerTarget::Callback(Arc::new(move || {
            if let Err(e) = callback() {
                error!(error = %e, "Timer callback failed");
            }
        }))
    }
}
