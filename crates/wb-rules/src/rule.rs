//! Rule definitions and their normalized, host-consumable form
//!
//! Authors describe a rule with a [`RuleSpec`]. [`RuleTransformer::normalize`]
//! turns it into a [`NormalizedRule`]: cron entries become a plain `cron`
//! string, `whenChanged` names are resolved to cell paths, and every
//! condition is wrapped in an adapter that evaluates it under the
//! completeness guard.

use serde_json::Map;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use wb_core::{is_truthy, CellPath, Reading, Value};

use crate::error::{RuleError, RuleResult};
use crate::eval::EvalContext;
use crate::scope::{Namespace, Scope};

/// Keys with a dedicated meaning that cannot be passed through as extra fields
const RESERVED_FIELDS: &[&str] = &[
    "when",
    "asSoonAs",
    "as_soon_as",
    "whenChanged",
    "when_changed",
    "then",
    "readonly",
    "cron",
];

/// Rule condition: reads cells through the scope and yields a value
pub type ConditionFn = Arc<dyn Fn(&Scope<'_>) -> RuleResult<Reading<Value>> + Send + Sync>;

/// Rule body
pub type ActionFn = Arc<dyn Fn(&Scope<'_>, Activation) -> RuleResult<()> + Send + Sync>;

/// Cron schedule marker, only meaningful as a rule's `when`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronEntry {
    spec: String,
}

impl CronEntry {
    pub fn spec(&self) -> &str {
        &self.spec
    }
}

/// Wrap a cron spec for use as a rule's `when`
pub fn cron(spec: impl Into<String>) -> CronEntry {
    CronEntry { spec: spec.into() }
}

/// Scalar or sequence field value
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn try_map<U>(self, mut f: impl FnMut(T) -> RuleResult<U>) -> RuleResult<OneOrMany<U>> {
        Ok(match self {
            OneOrMany::One(item) => OneOrMany::One(f(item)?),
            OneOrMany::Many(items) => {
                OneOrMany::Many(items.into_iter().map(f).collect::<RuleResult<_>>()?)
            }
        })
    }

    /// Iterate over the contained items
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

/// Rule `when` value
#[derive(Clone)]
pub enum When {
    Cron(CronEntry),
    Condition(ConditionFn),
}

impl From<CronEntry> for When {
    fn from(entry: CronEntry) -> Self {
        When::Cron(entry)
    }
}

/// Entry of a `whenChanged` list
#[derive(Clone)]
pub enum ChangeSource {
    /// Cell path (`device/cell`) or alias name
    Name(String),
    /// Computed value whose changes are tracked
    Function(ConditionFn),
}

impl ChangeSource {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Scope<'_>) -> RuleResult<Reading<Value>> + Send + Sync + 'static,
    {
        ChangeSource::Function(Arc::new(f))
    }
}

impl From<&str> for ChangeSource {
    fn from(name: &str) -> Self {
        ChangeSource::Name(name.to_string())
    }
}

impl From<String> for ChangeSource {
    fn from(name: String) -> Self {
        ChangeSource::Name(name)
    }
}

/// Author-supplied rule definition
#[derive(Default)]
pub struct RuleSpec {
    pub when: Option<When>,
    pub as_soon_as: Option<ConditionFn>,
    pub when_changed: Option<OneOrMany<ChangeSource>>,
    pub then: Option<ActionFn>,
    pub readonly: Option<Value>,
    /// Fields passed to the host untouched
    pub extra: Map<String, Value>,
}

impl RuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when<F>(mut self, f: F) -> Self
    where
        F: Fn(&Scope<'_>) -> RuleResult<Reading<Value>> + Send + Sync + 'static,
    {
        self.when = Some(When::Condition(Arc::new(f)));
        self
    }

    pub fn when_cron(mut self, entry: CronEntry) -> Self {
        self.when = Some(When::Cron(entry));
        self
    }

    pub fn as_soon_as<F>(mut self, f: F) -> Self
    where
        F: Fn(&Scope<'_>) -> RuleResult<Reading<Value>> + Send + Sync + 'static,
    {
        self.as_soon_as = Some(Arc::new(f));
        self
    }

    /// Track a single cell, alias or function
    pub fn when_changed(mut self, source: impl Into<ChangeSource>) -> Self {
        self.when_changed = Some(OneOrMany::One(source.into()));
        self
    }

    /// Track several cells, aliases or functions
    pub fn when_changed_all<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ChangeSource>,
    {
        self.when_changed = Some(OneOrMany::Many(
            sources.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn then<F>(mut self, f: F) -> Self
    where
        F: Fn(&Scope<'_>, Activation) -> RuleResult<()> + Send + Sync + 'static,
    {
        self.then = Some(Arc::new(f));
        self
    }

    pub fn readonly(mut self, value: impl Into<Value>) -> Self {
        self.readonly = Some(value.into());
        self
    }

    /// Add a passthrough field
    ///
    /// Keys naming a rule clause (`when`, `then`, `cron`, ...) are rejected
    /// by [`RuleTransformer::normalize`].
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Options the host passes when running a rule body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerOptions {
    pub new_value: Value,
    pub device: Option<String>,
    pub cell: Option<String>,
}

/// Arguments a rule body is invoked with
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Run without trigger data (cron, timers, conditions)
    Bare,
    /// A tracked function changed value
    Value(Value),
    /// A tracked cell changed value
    Cell {
        new_value: Value,
        device: String,
        cell: Option<String>,
    },
}

impl Activation {
    fn from_options(options: Option<&TriggerOptions>) -> Self {
        match options {
            None => Activation::Bare,
            Some(TriggerOptions {
                new_value,
                device: Some(device),
                cell,
            }) => Activation::Cell {
                new_value: new_value.clone(),
                device: device.clone(),
                cell: cell.clone(),
            },
            Some(options) => Activation::Value(options.new_value.clone()),
        }
    }

    pub fn new_value(&self) -> Option<&Value> {
        match self {
            Activation::Bare => None,
            Activation::Value(v) | Activation::Cell { new_value: v, .. } => Some(v),
        }
    }
}

#[derive(Clone)]
struct Guarded {
    rule: Arc<str>,
    condition: ConditionFn,
    namespace: Arc<Namespace>,
}

impl Guarded {
    fn run(&self, ctx: &EvalContext) -> RuleResult<Option<Value>> {
        let _guard = ctx.enter();
        let scope = Scope::new(&self.namespace, ctx);
        match (self.condition)(&scope)? {
            Reading::Determined(value) => Ok(Some(value)),
            Reading::Incomplete(cell) => {
                debug!(
                    rule = %self.rule,
                    cell = %cell,
                    "Skipping rule due to incomplete cell"
                );
                Ok(None)
            }
        }
    }
}

/// `when` / `asSoonAs` adapter: boolean result, `false` on incomplete cells
#[derive(Clone)]
pub struct GuardedCondition(Guarded);

impl GuardedCondition {
    pub fn evaluate(&self, ctx: &EvalContext) -> RuleResult<bool> {
        Ok(self.0.run(ctx)?.as_ref().map_or(false, is_truthy))
    }
}

/// `whenChanged` function adapter: raw value, `None` on incomplete cells
#[derive(Clone)]
pub struct GuardedChange(Guarded);

impl GuardedChange {
    pub fn evaluate(&self, ctx: &EvalContext) -> RuleResult<Option<Value>> {
        self.0.run(ctx)
    }
}

/// Normalized `whenChanged` entry
#[derive(Clone)]
pub enum ChangeTarget {
    /// Fully qualified cell path
    Cell(String),
    Function(GuardedChange),
}

impl ChangeTarget {
    pub fn as_cell(&self) -> Option<&str> {
        match self {
            ChangeTarget::Cell(path) => Some(path),
            ChangeTarget::Function(_) => None,
        }
    }
}

impl fmt::Debug for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTarget::Cell(path) => f.debug_tuple("Cell").field(path).finish(),
            ChangeTarget::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// `then` adapter dispatching on the shape of the trigger options
#[derive(Clone)]
pub struct RuleAction {
    rule: Arc<str>,
    action: ActionFn,
    namespace: Arc<Namespace>,
}

impl RuleAction {
    pub fn run(&self, ctx: &EvalContext, options: Option<&TriggerOptions>) -> RuleResult<()> {
        let scope = Scope::new(&self.namespace, ctx);
        let activation = Activation::from_options(options);
        debug!(rule = %self.rule, ?activation, "Running rule body");
        (self.action)(&scope, activation)
    }
}

/// A rule in the form the host registry consumes
#[derive(Clone)]
pub struct NormalizedRule {
    pub name: String,
    /// Cron spec taken from a `when: cron(..)` definition
    pub cron: Option<String>,
    pub when: Option<GuardedCondition>,
    pub as_soon_as: Option<GuardedCondition>,
    pub when_changed: Option<OneOrMany<ChangeTarget>>,
    pub then: Option<RuleAction>,
    pub readonly: Option<bool>,
    pub extra: Map<String, Value>,
}

impl fmt::Debug for NormalizedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedRule")
            .field("name", &self.name)
            .field("cron", &self.cron)
            .field("when", &self.when.is_some())
            .field("as_soon_as", &self.as_soon_as.is_some())
            .field("when_changed", &self.when_changed)
            .field("then", &self.then.is_some())
            .field("readonly", &self.readonly)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Turns rule specs into normalized rules bound to a namespace
pub struct RuleTransformer {
    namespace: Arc<Namespace>,
}

impl RuleTransformer {
    pub fn new(namespace: Arc<Namespace>) -> Self {
        Self { namespace }
    }

    pub fn normalize(&self, name: &str, spec: RuleSpec) -> RuleResult<NormalizedRule> {
        if name.is_empty() {
            return Err(RuleError::InvalidRuleDefinition(
                "rule name must not be empty".to_string(),
            ));
        }
        if let Some(key) = spec
            .extra
            .keys()
            .find(|key| RESERVED_FIELDS.contains(&key.as_str()))
        {
            return Err(RuleError::InvalidRuleDefinition(format!(
                "'{key}' cannot be set as a passthrough field"
            )));
        }
        let rule: Arc<str> = Arc::from(name);

        let (cron, when) = match spec.when {
            Some(When::Cron(entry)) => (Some(entry.spec), None),
            Some(When::Condition(f)) => (None, Some(GuardedCondition(self.guard(&rule, f)))),
            None => (None, None),
        };

        let when_changed = spec
            .when_changed
            .map(|sources| sources.try_map(|source| self.change_target(&rule, source)))
            .transpose()?;

        Ok(NormalizedRule {
            name: name.to_string(),
            cron,
            when,
            as_soon_as: spec
                .as_soon_as
                .map(|f| GuardedCondition(self.guard(&rule, f))),
            when_changed,
            then: spec.then.map(|action| RuleAction {
                rule: rule.clone(),
                action,
                namespace: self.namespace.clone(),
            }),
            readonly: spec.readonly.as_ref().map(is_truthy),
            extra: spec.extra,
        })
    }

    fn guard(&self, rule: &Arc<str>, condition: ConditionFn) -> Guarded {
        Guarded {
            rule: rule.clone(),
            condition,
            namespace: self.namespace.clone(),
        }
    }

    fn change_target(&self, rule: &Arc<str>, source: ChangeSource) -> RuleResult<ChangeTarget> {
        match source {
            ChangeSource::Name(name) if CellPath::is_path_like(&name) => {
                Ok(ChangeTarget::Cell(name))
            }
            ChangeSource::Name(name) => {
                let path = self.namespace.aliases().resolve(&name)?;
                Ok(ChangeTarget::Cell(path.to_string()))
            }
            ChangeSource::Function(f) => {
                Ok(ChangeTarget::Function(GuardedChange(self.guard(rule, f))))
            }
        }
    }
}
