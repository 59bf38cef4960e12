//! Property-style access to device cells
//!
//! A [`DeviceProxy`] exists once per device name and memoizes one
//! [`CellRef`] per cell name. Reads made while an [`EvalContext`] is guarded
//! short-circuit on incomplete cells instead of returning a placeholder.

use std::fmt;
use std::sync::Arc;
use tracing::trace;
use wb_core::{Reading, Value};

use crate::catalog::LazyCatalog;
use crate::eval::EvalContext;
use crate::host::{CellHandle, CellStore, DeviceHandle};

/// Catalog of device proxies, one per device name
pub type Devices = LazyCatalog<DeviceProxy>;

/// Build the device catalog over a host cell store
pub fn device_catalog(store: Arc<dyn CellStore>) -> Devices {
    LazyCatalog::new(move |name| DeviceProxy::new(store.device(name)))
}

/// Wrapper around one host cell handle
pub struct CellRef {
    name: String,
    handle: Arc<dyn CellHandle>,
}

impl CellRef {
    fn new(name: &str, handle: Arc<dyn CellHandle>) -> Self {
        Self {
            name: name.to_string(),
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_complete(&self) -> bool {
        self.handle.is_complete()
    }

    /// Current value, whether determined or not
    pub fn value(&self) -> Value {
        self.handle.value()
    }

    pub fn set_value(&self, value: Value) {
        self.handle.set_value(value);
    }
}

impl fmt::Debug for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRef").field("name", &self.name).finish()
    }
}

/// Per-device accessor owning the device's cell wrappers
pub struct DeviceProxy {
    name: String,
    cells: LazyCatalog<CellRef>,
}

impl DeviceProxy {
    pub fn new(handle: Arc<dyn DeviceHandle>) -> Self {
        let name = handle.name().to_string();
        trace!(device = %name, "Wrapping device");
        Self {
            name,
            cells: LazyCatalog::new(move |cell| CellRef::new(cell, handle.cell(cell))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell wrapper for `cell`, created on first access
    pub fn cell(&self, cell: &str) -> Arc<CellRef> {
        self.cells.get(cell)
    }

    /// Read a cell, honoring the context's completeness guard
    pub fn read(&self, cell: &str, ctx: &EvalContext) -> Reading<Value> {
        let cell_ref = self.cell(cell);
        if ctx.is_guarded() && !cell_ref.is_complete() {
            trace!(device = %self.name, cell, "Guarded read of incomplete cell");
            return Reading::Incomplete(cell.to_string());
        }
        Reading::Determined(cell_ref.value())
    }

    /// Read a cell without enforcing completeness
    pub fn value(&self, cell: &str) -> Value {
        self.cell(cell).value()
    }

    /// Forward a new value to the backing cell
    pub fn write(&self, cell: &str, value: impl Into<Value>) {
        let value = value.into();
        trace!(device = %self.name, cell, %value, "Writing cell");
        self.cell(cell).set_value(value);
    }
}

impl fmt::Debug for DeviceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceProxy")
            .field("name", &self.name)
            .field("cells", &self.cells.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestCell {
        value: Mutex<Option<Value>>,
    }

    impl CellHandle for TestCell {
        fn is_complete(&self) -> bool {
            self.value.lock().unwrap().is_some()
        }

        fn value(&self) -> Value {
            self.value.lock().unwrap().clone().unwrap_or(Value::Null)
        }

        fn set_value(&self, value: Value) {
            *self.value.lock().unwrap() = Some(value);
        }
    }

    struct TestDevice {
        name: String,
    }

    impl DeviceHandle for TestDevice {
        fn name(&self) -> &str {
            &self.name
        }

        fn cell(&self, _name: &str) -> Arc<dyn CellHandle> {
            Arc::new(TestCell::default())
        }
    }

    struct TestStore;

    impl CellStore for TestStore {
        fn device(&self, name: &str) -> Arc<dyn DeviceHandle> {
            Arc::new(TestDevice {
                name: name.to_string(),
            })
        }
    }

    #[test]
    fn test_device_and_cell_reference_stability() {
        let devices = device_catalog(Arc::new(TestStore));

        let dev = devices.get("dev1");
        assert!(Arc::ptr_eq(&dev, &devices.get("dev1")));
        assert!(Arc::ptr_eq(&dev.cell("temp"), &dev.cell("temp")));
        assert_eq!(dev.name(), "dev1");
    }

    #[test]
    fn test_unguarded_read_returns_placeholder() {
        let dev = device_catalog(Arc::new(TestStore)).get("dev1");
        let ctx = EvalContext::new();

        assert_eq!(dev.read("temp", &ctx), Reading::Determined(Value::Null));
        assert_eq!(dev.value("temp"), Value::Null);
    }

    #[test]
    fn test_guarded_read_of_incomplete_cell() {
        let dev = device_catalog(Arc::new(TestStore)).get("dev1");
        let ctx = EvalContext::new();
        let _guard = ctx.enter();

        assert_eq!(dev.read("temp", &ctx), Reading::Incomplete("temp".into()));
    }

    #[test]
    fn test_write_then_guarded_read() {
        let dev = device_catalog(Arc::new(TestStore)).get("dev1");
        dev.write("temp", 21.5);

        let ctx = EvalContext::new();
        let _guard = ctx.enter();
        assert_eq!(dev.read("temp", &ctx), Reading::Determined(json!(21.5)));
    }
}
