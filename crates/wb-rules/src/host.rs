//! Collaborator interfaces provided by the host
//!
//! The engine does not store cell values, schedule anything or run processes
//! itself. A host supplies those primitives through the traits in this module
//! and invokes the callables the engine hands back (normalized rules, timer
//! callbacks, process exit callbacks) from its dispatch loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use wb_core::{ProcessOutcome, TimerId, Value};

use crate::rule::NormalizedRule;

/// A single cell as seen by the host's storage
pub trait CellHandle: Send + Sync {
    /// Whether the host has determined a value for this cell
    fn is_complete(&self) -> bool;

    /// Current value; an incomplete cell returns the host's placeholder
    fn value(&self) -> Value;

    /// Forward a new value to storage
    fn set_value(&self, value: Value);
}

/// A device as seen by the host's storage
pub trait DeviceHandle: Send + Sync {
    /// Device name
    fn name(&self) -> &str;

    /// Handle for one of the device's cells, created on demand
    fn cell(&self, name: &str) -> Arc<dyn CellHandle>;
}

/// Host cell storage
pub trait CellStore: Send + Sync {
    /// Handle for a device, created on demand
    fn device(&self, name: &str) -> Arc<dyn DeviceHandle>;
}

/// Host rule registry
///
/// Whether a second registration under the same name replaces the first or
/// is rejected is up to the implementation.
pub trait RuleRegistry: Send + Sync {
    fn register_rule(&self, name: &str, rule: NormalizedRule);
}

/// What a timer fires
#[derive(Clone)]
pub enum TimerTarget {
    /// A named timer; firing is observed by rules
    Named(String),
    /// A callback invoked on each firing
    Callback(Arc<dyn Fn() + Send + Sync>),
}

impl fmt::Debug for TimerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerTarget::Named(name) => f.debug_tuple("Named").field(name).finish(),
            TimerTarget::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Which timer to cancel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerRef {
    Named(String),
    Id(TimerId),
}

/// Host timer primitives
pub trait TimerHost: Send + Sync {
    fn start_timer(&self, target: TimerTarget, delay: Duration, periodic: bool) -> TimerId;

    /// Request cancellation; a callback already in flight is not interrupted
    fn stop_timer(&self, timer: TimerRef);

    /// Whether the named timer is the one currently firing
    fn is_timer_firing(&self, name: &str) -> bool;
}

/// Callback invoked by the host when a spawned process exits
pub type ProcessExitFn = Box<dyn FnOnce(ProcessOutcome) + Send>;

/// Fully normalized process invocation
pub struct ProcessRequest {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    pub exit_callback: Option<ProcessExitFn>,
    pub capture_output: bool,
    pub capture_error_output: bool,
    /// Text written to the process's standard input
    pub input: Option<String>,
}

impl fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("argv", &self.argv)
            .field("exit_callback", &self.exit_callback.is_some())
            .field("capture_output", &self.capture_output)
            .field("capture_error_output", &self.capture_error_output)
            .field("input", &self.input)
            .finish()
    }
}

/// Host process execution
pub trait ProcessHost: Send + Sync {
    fn spawn_process(&self, request: ProcessRequest);
}

/// The set of host collaborators an engine runs against
#[derive(Clone)]
pub struct Host {
    pub cells: Arc<dyn CellStore>,
    pub rules: Arc<dyn RuleRegistry>,
    pub timers: Arc<dyn TimerHost>,
    pub processes: Arc<dyn ProcessHost>,
}

impl Host {
    pub fn new(
        cells: Arc<dyn CellStore>,
        rules: Arc<dyn RuleRegistry>,
        timers: Arc<dyn TimerHost>,
        processes: Arc<dyn ProcessHost>,
    ) -> Self {
        Self {
            cells,
            rules,
            timers,
            processes,
        }
    }

    /// Use one object for every collaborator
    pub fn uniform<T>(host: Arc<T>) -> Self
    where
        T: CellStore + RuleRegistry + TimerHost + ProcessHost + 'static,
    {
        Self {
            cells: host.clone(),
            rules: host.clone(),
            timers: host.clone(),
            processes: host,
        }
    }
}
