//! Entry point for rule-author scripts

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::alias::AliasRegistry;
use crate::config::EngineConfig;
use crate::device::Devices;
use crate::error::RuleResult;
use crate::eval::EvalContext;
use crate::host::Host;
use crate::notify::Notifier;
use crate::rule::{RuleSpec, RuleTransformer};
use crate::scope::{Namespace, Scope};
use crate::spawn::{SpawnOptions, Spawner};
use crate::timer::Timers;

/// The surface scripts use to define rules and trigger side effects
///
/// Owns the device catalog, alias registry, timer facade, process spawner
/// and notification dispatcher, all bound to one [`Host`].
pub struct RuleEngine {
    host: Host,
    namespace: Arc<Namespace>,
    transformer: RuleTransformer,
    timers: Timers,
    spawner: Arc<Spawner>,
    notifier: Notifier,
}

impl RuleEngine {
    pub fn new(host: Host, config: EngineConfig) -> Self {
        let namespace = Arc::new(Namespace::new(host.cells.clone()));
        let spawner = Arc::new(Spawner::new(host.processes.clone(), config.shell));
        info!("Rule engine initialized");

        Self {
            transformer: RuleTransformer::new(namespace.clone()),
            timers: Timers::new(host.timers.clone()),
            notifier: Notifier::new(spawner.clone(), config.notify),
            namespace,
            spawner,
            host,
        }
    }

    /// Normalize `spec` and register it with the host under `name`
    #[instrument(skip(self, spec))]
    pub fn define_rule(&self, name: &str, spec: RuleSpec) -> RuleResult<()> {
        debug!("Defining rule");
        let rule = self.transformer.normalize(name, spec)?;
        self.host.rules.register_rule(name, rule);
        Ok(())
    }

    /// Register `alias` for the cell at `full_path` (`device/cell`)
    pub fn define_alias(&self, alias: &str, full_path: &str) -> RuleResult<()> {
        self.namespace.aliases().define(alias, full_path)
    }

    /// Device catalog for script-level (unguarded) access
    pub fn dev(&self) -> &Devices {
        self.namespace.devices()
    }

    pub fn aliases(&self) -> &AliasRegistry {
        self.namespace.aliases()
    }

    /// Scope for reading and writing cells outside rule evaluation
    pub fn scope<'a>(&'a self, ctx: &'a EvalContext) -> Scope<'a> {
        Scope::new(&self.namespace, ctx)
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn start_timer(&self, name: &str, delay: Duration) {
        self.timers.start_timer(name, delay);
    }

    pub fn start_ticker(&self, name: &str, delay: Duration) {
        self.timers.start_ticker(name, delay);
    }

    pub fn spawn<S: AsRef<str>>(
        &self,
        command: &str,
        args: &[S],
        options: impl Into<Option<SpawnOptions>>,
    ) {
        self.spawner.spawn(command, args, options);
    }

    pub fn run_shell_command(&self, command: &str, options: impl Into<Option<SpawnOptions>>) {
        self.spawner.run_shell_command(command, options);
    }

    pub fn notify(&self) -> &Notifier {
        &self.notifier
    }
}
