//! Reactive rule evaluation core
//!
//! This crate lets scripts declare rules over named cells owned by devices
//! and hands them, normalized, to a host scheduler that fires them on cell
//! changes and cron schedules.
//!
//! # Architecture
//!
//! ```text
//! define_rule → RuleTransformer → NormalizedRule → host RuleRegistry
//!                     │
//!                     └── guarded conditions read cells via Scope → DeviceProxy
//! ```
//!
//! - **Devices**: lazily built, memoized proxies over host cell handles
//! - **Guard**: conditions run inside an [`EvalContext`] scope; reading an
//!   incomplete cell there yields [`Reading::Incomplete`] and the condition
//!   is skipped instead of failing
//! - **Aliases**: short names for `device/cell` paths
//! - **Side effects**: timers, process spawning and mail/SMS notifications,
//!   all delegated to host primitives
//!
//! # Key Types
//!
//! - [`RuleEngine`] - Entry point for scripts
//! - [`RuleSpec`] - Author-facing rule definition
//! - [`NormalizedRule`] - What the host registry receives
//! - [`Host`] - The host collaborators an engine runs against

pub mod alias;
pub mod catalog;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod eval;
pub mod host;
pub mod notify;
pub mod queue;
pub mod rule;
pub mod scope;
pub mod spawn;
pub mod timer;

pub use alias::AliasRegistry;
pub use catalog::LazyCatalog;
pub use config::{EngineConfig, NotifyConfig};
pub use device::{CellRef, DeviceProxy, Devices};
pub use engine::RuleEngine;
pub use error::{RuleError, RuleResult};
pub use eval::{EvalContext, GuardScope};
pub use host::{
    CellHandle, CellStore, DeviceHandle, Host, ProcessHost, ProcessRequest, RuleRegistry,
    TimerHost, TimerRef, TimerTarget,
};
pub use notify::{NotifyMethod, Notifier};
pub use rule::{
    cron, Activation, ChangeSource, ChangeTarget, CronEntry, GuardedChange, GuardedCondition,
    NormalizedRule, OneOrMany, RuleAction, RuleSpec, RuleTransformer, TriggerOptions, When,
};
pub use scope::{Namespace, Scope};
pub use spawn::{ProcessExit, SpawnOptions, Spawner};
pub use timer::{TimerStatus, Timers};

pub use wb_core::{determined, CellPath, ProcessOutcome, Reading, TimerId, Value};
