//! Core types for the rule engine
//!
//! This crate provides the fundamental types shared by the rule engine and
//! its hosts: CellPath, Reading, TimerId, ProcessOutcome and the truthiness
//! rules used when rule conditions are coerced to booleans.

mod cell_path;
mod process;
mod reading;
mod timer;
mod value;

pub use cell_path::{CellPath, CellPathError};
pub use process::ProcessOutcome;
pub use reading::Reading;
pub use timer::TimerId;
pub use value::{is_truthy, Value};

/// Separator between the device and cell parts of a cell path
pub const PATH_SEPARATOR: char = '/';
