//! Cell path type representing a device/cell pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::PATH_SEPARATOR;

/// Error type for invalid cell paths
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CellPathError {
    #[error("cell path must have the form <device>/<cell>: {0:?}")]
    InvalidFormat(String),

    #[error("device name cannot be empty")]
    EmptyDevice,

    #[error("cell name cannot be empty")]
    EmptyCell,
}

/// Fully qualified name of a cell (e.g., "wb-gpio/Relay_1")
///
/// A path consists of the owning device's name and the cell name separated
/// by a single `/`. Neither part may be empty or contain the separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellPath {
    device: String,
    cell: String,
}

impl CellPath {
    /// Create a new CellPath from device and cell names
    pub fn new(device: impl Into<String>, cell: impl Into<String>) -> Result<Self, CellPathError> {
        let device = device.into();
        let cell = cell.into();

        if device.is_empty() {
            return Err(CellPathError::EmptyDevice);
        }
        if cell.is_empty() {
            return Err(CellPathError::EmptyCell);
        }
        if device.contains(PATH_SEPARATOR) || cell.contains(PATH_SEPARATOR) {
            return Err(CellPathError::InvalidFormat(format!("{device}/{cell}")));
        }

        Ok(Self { device, cell })
    }

    /// Get the device part of the path
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Get the cell part of the path
    pub fn cell(&self) -> &str {
        &self.cell
    }

    /// Whether a string looks like a path rather than a bare alias name
    pub fn is_path_like(s: &str) -> bool {
        s.contains(PATH_SEPARATOR)
    }
}

/// Parses `device/cell`.
///
/// Exactly one separator is accepted: `a/b/c` is an error rather than being
/// truncated to its last two segments.
impl FromStr for CellPath {
    type Err = CellPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (device, cell) = s
            .split_once(PATH_SEPARATOR)
            .ok_or_else(|| CellPathError::InvalidFormat(s.to_string()))?;
        Self::new(device, cell)
    }
}

impl TryFrom<String> for CellPath {
    type Error = CellPathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CellPath> for String {
    fn from(path: CellPath) -> String {
        path.to_string()
    }
}

impl fmt::Display for CellPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.device, PATH_SEPARATOR, self.cell)
    }
}
