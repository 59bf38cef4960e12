//! In-memory cell storage
//!
//! Devices and cells are created on first access. A cell is incomplete until
//! a value is written to it, either by a driver through
//! [`CellTable::publish`] or by a rule through its handle. Every write is
//! broadcast as a [`CellChange`].

use dashmap::DashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use wb_core::Value;
use wb_rules::{CellHandle, CellStore, DeviceHandle};

/// Default channel capacity for change subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A value written to a cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub device: String,
    pub cell: String,
    /// Value before the write, `None` if the cell was incomplete
    pub old_value: Option<Value>,
    pub new_value: Value,
}

impl CellChange {
    /// Whether the write changed the stored value
    pub fn is_change(&self) -> bool {
        self.old_value.as_ref() != Some(&self.new_value)
    }
}

pub struct MemoryCell {
    device: String,
    name: String,
    value: RwLock<Option<Value>>,
    changes: broadcast::Sender<CellChange>,
}

impl MemoryCell {
    fn read(&self) -> RwLockReadGuard<'_, Option<Value>> {
        self.value.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Value>> {
        self.value.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl CellHandle for MemoryCell {
    fn is_complete(&self) -> bool {
        self.read().is_some()
    }

    fn value(&self) -> Value {
        self.read().clone().unwrap_or(Value::Null)
    }

    fn set_value(&self, value: Value) {
        let old_value = self.write().replace(value.clone());
        trace!(device = %self.device, cell = %self.name, %value, "Cell written");

        // Send errors only mean nobody is subscribed
        let _ = self.changes.send(CellChange {
            device: self.device.clone(),
            cell: self.name.clone(),
            old_value,
            new_value: value,
        });
    }
}

pub struct MemoryDevice {
    name: String,
    cells: DashMap<String, Arc<MemoryCell>>,
    changes: broadcast::Sender<CellChange>,
}

impl MemoryDevice {
    fn memory_cell(&self, name: &str) -> Arc<MemoryCell> {
        self.cells
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(MemoryCell {
                    device: self.name.clone(),
                    name: name.to_string(),
                    value: RwLock::new(None),
                    changes: self.changes.clone(),
                })
            })
            .clone()
    }
}

impl DeviceHandle for MemoryDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, name: &str) -> Arc<dyn CellHandle> {
        self.memory_cell(name)
    }
}

/// All devices known to the host
pub struct CellTable {
    devices: DashMap<String, Arc<MemoryDevice>>,
    changes: broadcast::Sender<CellChange>,
}

impl CellTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a table whose change channel holds `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            devices: DashMap::new(),
            changes,
        }
    }

    /// Receive every subsequent cell write
    pub fn subscribe(&self) -> broadcast::Receiver<CellChange> {
        self.changes.subscribe()
    }

    fn memory_device(&self, name: &str) -> Arc<MemoryDevice> {
        self.devices
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(device = name, "Creating device");
                Arc::new(MemoryDevice {
                    name: name.to_string(),
                    cells: DashMap::new(),
                    changes: self.changes.clone(),
                })
            })
            .clone()
    }

    /// Store a value on behalf of a driver
    pub fn publish(&self, device: &str, cell: &str, value: impl Into<Value>) {
        self.memory_device(device)
            .memory_cell(cell)
            .set_value(value.into());
    }

    /// Stored value, `None` while the cell is incomplete or unknown
    pub fn get(&self, device: &str, cell: &str) -> Option<Value> {
        self.devices
            .get(device)
            .and_then(|device| device.cells.get(cell).map(|c| c.clone()))
            .and_then(|cell| cell.read().clone())
    }

    /// Names of the devices created so far
    pub fn device_names(&self) -> Vec<String> {
        self.devices.iter().map(|r| r.key().clone()).collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl Default for CellTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CellStore for CellTable {
    fn device(&self, name: &str) -> Arc<dyn DeviceHandle> {
        self.memory_device(name)
    }
}
