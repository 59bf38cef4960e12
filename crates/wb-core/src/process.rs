//! Process exit data reported by hosts

use serde::{Deserialize, Serialize};

/// What a host reports when a spawned process exits
///
/// Captured streams are `None` when capture was not requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Exit status of the process
    pub exit_status: i32,

    /// Captured standard output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_output: Option<String>,

    /// Captured standard error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_error_output: Option<String>,
}

impl ProcessOutcome {
    /// Outcome with the given status and nothing captured
    pub fn exited(exit_status: i32) -> Self {
        Self {
            exit_status,
            ..Default::default()
        }
    }

    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}
