//! Recording fake host for rule engine tests
//!
//! Models every host primitive the engine consumes: cell storage with
//! completeness, the rule registry, timers fired by hand and processes
//! completed by hand.

#![allow(dead_code)]

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wb_rules::{
    CellHandle, CellStore, DeviceHandle, EngineConfig, Host, NormalizedRule, ProcessHost,
    ProcessOutcome, ProcessRequest, RuleEngine, RuleRegistry, TimerHost, TimerId, TimerRef,
    TimerTarget, Value,
};

#[derive(Default)]
pub struct FakeCell {
    value: Mutex<Option<Value>>,
}

impl CellHandle for FakeCell {
    fn is_complete(&self) -> bool {
        self.value.lock().unwrap().is_some()
    }

    fn value(&self) -> Value {
        self.value.lock().unwrap().clone().unwrap_or(Value::Null)
    }

    fn set_value(&self, value: Value) {
        *self.value.lock().unwrap() = Some(value);
    }
}

pub struct FakeDevice {
    name: String,
    cells: DashMap<String, Arc<FakeCell>>,
}

impl FakeDevice {
    pub fn cell_handle(&self, name: &str) -> Arc<FakeCell> {
        self.cells.entry(name.to_string()).or_default().clone()
    }
}

impl DeviceHandle for FakeDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, name: &str) -> Arc<dyn CellHandle> {
        self.cell_handle(name)
    }
}

#[derive(Debug, Clone)]
pub struct StartedTimer {
    pub id: TimerId,
    pub target: TimerTarget,
    pub delay: Duration,
    pub periodic: bool,
}

#[derive(Default)]
pub struct FakeHost {
    devices: DashMap<String, Arc<FakeDevice>>,
    pub device_lookups: AtomicUsize,
    pub rules: Mutex<Vec<(String, NormalizedRule)>>,
    pub timers: Mutex<Vec<StartedTimer>>,
    pub stopped: Mutex<Vec<TimerRef>>,
    firing: Mutex<Option<String>>,
    next_timer: AtomicU64,
    pub processes: Mutex<Vec<ProcessRequest>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn fake_device(&self, name: &str) -> Arc<FakeDevice> {
        self.devices
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(FakeDevice {
                    name: name.to_string(),
                    cells: DashMap::new(),
                })
            })
            .clone()
    }

    /// Give a cell a determined value, as a driver would
    pub fn publish(&self, device: &str, cell: &str, value: impl Into<Value>) {
        self.fake_device(device)
            .cell_handle(cell)
            .set_value(value.into());
    }

    /// Stored value of a cell, `None` while incomplete
    pub fn stored(&self, device: &str, cell: &str) -> Option<Value> {
        let cell = self.fake_device(device).cell_handle(cell);
        cell.is_complete().then(|| cell.value())
    }

    /// Most recent registration under `name`
    pub fn rule(&self, name: &str) -> NormalizedRule {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, rule)| rule.clone())
            .expect("rule registered")
    }

    pub fn rule_count(&self) -> usize {
        self.rules.lock().unwrap().len()
    }

    pub fn timer(&self, index: usize) -> StartedTimer {
        self.timers.lock().unwrap()[index].clone()
    }

    /// Fire a started timer the way the host dispatch loop would
    pub fn fire(&self, id: TimerId) {
        let timer = self
            .timers
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .expect("timer started");
        match timer.target {
            TimerTarget::Named(name) => {
                *self.firing.lock().unwrap() = Some(name);
            }
            TimerTarget::Callback(callback) => callback(),
        }
    }

    pub fn finish_firing(&self) {
        *self.firing.lock().unwrap() = None;
    }

    pub fn process_count(&self) -> usize {
        self.processes.lock().unwrap().len()
    }

    pub fn argv(&self, index: usize) -> Vec<String> {
        self.processes.lock().unwrap()[index].argv.clone()
    }

    pub fn input(&self, index: usize) -> Option<String> {
        self.processes.lock().unwrap()[index].input.clone()
    }

    pub fn capture_flags(&self, index: usize) -> (bool, bool) {
        let processes = self.processes.lock().unwrap();
        (
            processes[index].capture_output,
            processes[index].capture_error_output,
        )
    }

    /// Deliver a process exit, invoking its callback if one was given
    pub fn complete(&self, index: usize, outcome: ProcessOutcome) {
        let callback = self.processes.lock().unwrap()[index].exit_callback.take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }
}

impl CellStore for FakeHost {
    fn device(&self, name: &str) -> Arc<dyn DeviceHandle> {
        self.device_lookups.fetch_add(1, Ordering::SeqCst);
        self.fake_device(name)
    }
}

impl RuleRegistry for FakeHost {
    fn register_rule(&self, name: &str, rule: NormalizedRule) {
        self.rules.lock().unwrap().push((name.to_string(), rule));
    }
}

impl TimerHost for FakeHost {
    fn start_timer(&self, target: TimerTarget, delay: Duration, periodic: bool) -> TimerId {
        let id = TimerId::new(self.next_timer.fetch_add(1, Ordering::SeqCst) + 1);
        self.timers.lock().unwrap().push(StartedTimer {
            id,
            target,
            delay,
            periodic,
        });
        id
    }

    fn stop_timer(&self, timer: TimerRef) {
        self.stopped.lock().unwrap().push(timer);
    }

    fn is_timer_firing(&self, name: &str) -> bool {
        self.firing.lock().unwrap().as_deref() == Some(name)
    }
}

impl ProcessHost for FakeHost {
    fn spawn_process(&self, request: ProcessRequest) {
        self.processes.lock().unwrap().push(request);
    }
}

/// Engine over a fresh fake host with default configuration
pub fn engine() -> (Arc<FakeHost>, RuleEngine) {
    let host = FakeHost::new();
    let engine = RuleEngine::new(Host::uniform(host.clone()), EngineConfig::default());
    (host, engine)
}
