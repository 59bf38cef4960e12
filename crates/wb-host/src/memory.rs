//! Single-process host driving rules from memory

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use wb_rules::{
    CellStore, DeviceHandle, EvalContext, Host, NormalizedRule, ProcessHost, RuleRegistry,
    TimerHost, TimerId, TimerRef, TimerTarget, TriggerOptions,
};

use crate::cells::{CellChange, CellTable};
use crate::rules::RuleTable;
use crate::timers::TimerWheel;

/// Cell storage, rule table and timer wheel behind one object
///
/// Rules are driven by the owner: [`MemoryHost::dispatch_change`] for cell
/// writes, [`MemoryHost::advance`] for time. Conditions are evaluated in a
/// fresh [`EvalContext`] per pass.
#[derive(Default)]
pub struct MemoryHost {
    cells: CellTable,
    rules: RuleTable,
    timers: TimerWheel,
}

impl MemoryHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cells(&self) -> &CellTable {
        &self.cells
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn timers(&self) -> &TimerWheel {
        &self.timers
    }

    /// Collaborator bundle for an engine, with processes run by `processes`
    pub fn host(self: &Arc<Self>, processes: Arc<dyn ProcessHost>) -> Host {
        Host::new(self.clone(), self.clone(), self.clone(), processes)
    }

    /// Mark the host ready, arming timers started during script loading
    pub fn set_ready(&self) {
        info!(rules = self.rules.len(), "Host ready");
        self.timers.set_ready();
    }

    /// Advance the clock, running level rules on every named timer firing
    pub fn advance(&self, by: Duration) -> usize {
        self.timers.advance(by, |_| {
            self.run_level_rules();
        })
    }

    /// Run rules whose `whenChanged` lists the written cell, then level rules
    ///
    /// Writes that leave the value unchanged trigger nothing.
    #[instrument(skip(self, change), fields(device = %change.device, cell = %change.cell))]
    pub fn dispatch_change(&self, change: &CellChange) -> usize {
        if !change.is_change() {
            return 0;
        }

        let path = format!("{}/{}", change.device, change.cell);
        let options = TriggerOptions {
            new_value: change.new_value.clone(),
            device: Some(change.device.clone()),
            cell: Some(change.cell.clone()),
        };
        let ctx = EvalContext::new();

        let mut ran = 0;
        for rule in self.rules.watching(&path) {
            if run_body(&rule, &ctx, Some(&options)) {
                ran += 1;
            }
        }
        ran + self.run_level_rules()
    }

    /// Run the body of every rule whose `when` holds
    pub fn run_level_rules(&self) -> usize {
        let ctx = EvalContext::new();
        let mut ran = 0;

        for rule in self.rules.all() {
            let Some(when) = &rule.when else {
                continue;
            };
            match when.evaluate(&ctx) {
                Ok(true) => {
                    if run_body(&rule, &ctx, None) {
                        ran += 1;
                    }
                }
                Ok(false) => {}
                Err(e) => error!(rule = %rule.name, error = %e, "Rule condition failed"),
            }
        }
        ran
    }
}

fn run_body(rule: &NormalizedRule, ctx: &EvalContext, options: Option<&TriggerOptions>) -> bool {
    let Some(then) = &rule.then else {
        return false;
    };
    debug!(rule = %rule.name, "Running rule");
    match then.run(ctx, options) {
        Ok(()) => true,
        Err(e) => {
            error!(rule = %rule.name, error = %e, "Rule body failed");
            false
        }
    }
}

impl CellStore for MemoryHost {
    fn device(&self, name: &str) -> Arc<dyn DeviceHandle> {
        self.cells.device(name)
    }
}

impl RuleRegistry for MemoryHost {
    fn register_rule(&self, name: &str, rule: NormalizedRule) {
        self.rules.register_rule(name, rule);
    }
}

impl TimerHost for MemoryHost {
    fn start_timer(&self, target: TimerTarget, delay: Duration, periodic: bool) -> TimerId {
        self.timers.start_timer(target, delay, periodic)
    }

    fn stop_timer(&self, timer: TimerRef) {
        self.timers.stop_timer(timer);
    }

    fn is_timer_firing(&self, name: &str) -> bool {
        self.timers.is_timer_firing(name)
    }
}
