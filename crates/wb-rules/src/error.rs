//! Error types for the rule engine

use thiserror::Error;
use wb_core::CellPathError;

/// Result type for rule engine operations
pub type RuleResult<T> = Result<T, RuleError>;

/// Errors surfaced to rule authors
///
/// Everything except `Script` is a programmer-input error raised
/// synchronously by the offending call and never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    /// Rule name or definition is malformed
    #[error("invalid rule definition: {0}")]
    InvalidRuleDefinition(String),

    /// Alias name or target is empty
    #[error("invalid alias definition: {alias:?} -> {path:?}")]
    InvalidAliasDefinition { alias: String, path: String },

    /// Alias target is not a device/cell path
    #[error("invalid cell full name for alias: {0}")]
    InvalidCellPath(#[from] CellPathError),

    /// Bare name used where an alias was expected, but none is defined
    #[error("invalid cell alias: {0}")]
    UnresolvedAlias(String),

    /// Notification method other than email or sms
    #[error("unknown notification method: {0}")]
    UnknownNotificationMethod(String),

    /// Attempt to assign into a lazily built catalog
    #[error("setting unsupported proxy value: {0}")]
    UnsupportedProxyMutation(String),

    /// Failure raised by rule-author code
    #[error("{0}")]
    Script(String),
}

impl RuleError {
    /// Create a script error from any message
    pub fn script(message: impl Into<String>) -> Self {
        RuleError::Script(message.into())
    }
}
