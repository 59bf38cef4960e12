//! In-process host for the rule engine
//!
//! Supplies the primitives `wb-rules` delegates to:
//!
//! - [`CellTable`] stores cell values and broadcasts [`CellChange`]s
//! - [`RuleTable`] receives normalized rules, replacing redefinitions
//! - [`TimerWheel`] keeps timers on a virtual clock advanced by the caller,
//!   holding them until the host is marked ready
//! - [`SystemProcesses`] runs processes on a tokio runtime
//!
//! [`MemoryHost`] bundles the first three and drives rules from cell changes
//! and timer firings.

pub mod cells;
pub mod memory;
pub mod process;
pub mod rules;
pub mod timers;

pub use cells::{CellChange, CellTable};
pub use memory::MemoryHost;
pub use process::SystemProcesses;
pub use rules::RuleTable;
pub use timers::TimerWheel;
