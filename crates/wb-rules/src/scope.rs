//! Cell and alias access for rule-author code

use std::sync::Arc;
use wb_core::{Reading, Value};

use crate::alias::AliasRegistry;
use crate::device::{device_catalog, DeviceProxy, Devices};
use crate::error::RuleResult;
use crate::eval::EvalContext;
use crate::host::CellStore;

/// The ambient device catalog and alias registry shared by all rules
pub struct Namespace {
    devices: Arc<Devices>,
    aliases: AliasRegistry,
}

impl Namespace {
    pub fn new(store: Arc<dyn CellStore>) -> Self {
        let devices = Arc::new(device_catalog(store));
        Self {
            aliases: AliasRegistry::new(devices.clone()),
            devices,
        }
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }
}

/// What a rule closure sees while it runs
///
/// All reads go through the evaluation context, so they short-circuit on
/// incomplete cells exactly when a guarded condition is being evaluated.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    namespace: &'a Namespace,
    ctx: &'a EvalContext,
}

impl<'a> Scope<'a> {
    pub fn new(namespace: &'a Namespace, ctx: &'a EvalContext) -> Self {
        Self { namespace, ctx }
    }

    pub fn context(&self) -> &'a EvalContext {
        self.ctx
    }

    /// Device proxy for `device`
    pub fn dev(&self, device: &str) -> Arc<DeviceProxy> {
        self.namespace.devices().get(device)
    }

    pub fn read(&self, device: &str, cell: &str) -> Reading<Value> {
        self.dev(device).read(cell, self.ctx)
    }

    pub fn write(&self, device: &str, cell: &str, value: impl Into<Value>) {
        self.dev(device).write(cell, value);
    }

    /// Read the cell behind an alias
    pub fn alias(&self, alias: &str) -> RuleResult<Reading<Value>> {
        self.namespace.aliases().read(alias, self.ctx)
    }

    /// Write the cell behind an alias
    pub fn set_alias(&self, alias: &str, value: impl Into<Value>) -> RuleResult<()> {
        self.namespace.aliases().write(alias, value)
    }
}
