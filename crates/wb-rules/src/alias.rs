//! Short names for fully qualified cells
//!
//! `define_alias("p", "dev1/temp")` registers a resolver consulted by the
//! generic alias accessors on [`AliasRegistry`]. The target device proxy is
//! looked up on first use and reused afterwards.

use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;
use wb_core::{CellPath, Reading, Value};

use crate::device::{DeviceProxy, Devices};
use crate::error::{RuleError, RuleResult};
use crate::eval::EvalContext;

struct AliasEntry {
    path: CellPath,
    device: OnceLock<Arc<DeviceProxy>>,
}

impl AliasEntry {
    fn device(&self, devices: &Devices) -> &Arc<DeviceProxy> {
        self.device.get_or_init(|| devices.get(self.path.device()))
    }
}

/// Registry of alias name → cell path
pub struct AliasRegistry {
    entries: DashMap<String, Arc<AliasEntry>>,
    devices: Arc<Devices>,
}

impl AliasRegistry {
    pub fn new(devices: Arc<Devices>) -> Self {
        Self {
            entries: DashMap::new(),
            devices,
        }
    }

    /// Register `alias` for the cell at `full_path`
    ///
    /// Redefining an alias silently replaces the previous target.
    pub fn define(&self, alias: &str, full_path: &str) -> RuleResult<()> {
        if alias.is_empty() || full_path.is_empty() {
            return Err(RuleError::InvalidAliasDefinition {
                alias: alias.to_string(),
                path: full_path.to_string(),
            });
        }
        let path: CellPath = full_path.parse()?;

        debug!(alias, path = %path, "Defining alias");
        self.entries.insert(
            alias.to_string(),
            Arc::new(AliasEntry {
                path,
                device: OnceLock::new(),
            }),
        );
        Ok(())
    }

    /// Cell path an alias points to
    pub fn resolve(&self, alias: &str) -> RuleResult<CellPath> {
        self.entry(alias).map(|entry| entry.path.clone())
    }

    /// Read through an alias with the same semantics as a device read
    pub fn read(&self, alias: &str, ctx: &EvalContext) -> RuleResult<Reading<Value>> {
        let entry = self.entry(alias)?;
        Ok(entry.device(&self.devices).read(entry.path.cell(), ctx))
    }

    /// Write through an alias
    pub fn write(&self, alias: &str, value: impl Into<Value>) -> RuleResult<()> {
        let entry = self.entry(alias)?;
        entry.device(&self.devices).write(entry.path.cell(), value);
        Ok(())
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, alias: &str) -> RuleResult<Arc<AliasEntry>> {
        self.entries
            .get(alias)
            .map(|e| e.value().clone())
            .ok_or_else(|| RuleError::UnresolvedAlias(alias.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::device_catalog;
    use crate::host::{CellHandle, CellStore, DeviceHandle};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wb_core::CellPathError;

    struct SharedCell(Mutex<Value>);

    impl CellHandle for SharedCell {
        fn is_complete(&self) -> bool {
            true
        }

        fn value(&self) -> Value {
            self.0.lock().unwrap().clone()
        }

        fn set_value(&self, value: Value) {
            *self.0.lock().unwrap() = value;
        }
    }

    struct Dev(String, Arc<SharedCell>);

    impl DeviceHandle for Dev {
        fn name(&self) -> &str {
            &self.0
        }

        fn cell(&self, _name: &str) -> Arc<dyn CellHandle> {
            self.1.clone()
        }
    }

    #[derive(Default)]
    struct CountingStore {
        lookups: AtomicUsize,
        cell: Arc<SharedCell>,
    }

    impl Default for SharedCell {
        fn default() -> Self {
            SharedCell(Mutex::new(json!(0)))
        }
    }

    impl CellStore for CountingStore {
        fn device(&self, name: &str) -> Arc<dyn DeviceHandle> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Arc::new(Dev(name.to_string(), self.cell.clone()))
        }
    }

    fn registry() -> (Arc<CountingStore>, AliasRegistry) {
        let store = Arc::new(CountingStore::default());
        let devices = Arc::new(device_catalog(store.clone()));
        (store, AliasRegistry::new(devices))
    }

    #[test]
    fn test_define_and_resolve() {
        let (_, aliases) = registry();
        aliases.define("p", "dev1/temp").unwrap();

        assert_eq!(aliases.resolve("p").unwrap().to_string(), "dev1/temp");
        assert!(aliases.contains("p"));
    }

    #[test]
    fn test_invalid_definitions() {
        let (_, aliases) = registry();

        assert!(matches!(
            aliases.define("", "dev1/temp"),
            Err(RuleError::InvalidAliasDefinition { .. })
        ));
        assert!(matches!(
            aliases.define("p", ""),
            Err(RuleError::InvalidAliasDefinition { .. })
        ));
        assert_eq!(
            aliases.define("bad", "not-a-path").unwrap_err(),
            RuleError::InvalidCellPath(CellPathError::InvalidFormat("not-a-path".into()))
        );
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_unknown_alias() {
        let (_, aliases) = registry();
        let ctx = EvalContext::new();

        assert_eq!(
            aliases.read("missing", &ctx).unwrap_err(),
            RuleError::UnresolvedAlias("missing".into())
        );
        assert_eq!(
            aliases.write("missing", 1).unwrap_err(),
            RuleError::UnresolvedAlias("missing".into())
        );
    }

    #[test]
    fn test_device_resolved_once() {
        let (store, aliases) = registry();
        aliases.define("p", "dev1/temp").unwrap();
        let ctx = EvalContext::new();

        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
        aliases.write("p", 5).unwrap();
        aliases.read("p", &ctx).unwrap();
        aliases.read("p", &ctx).unwrap();

        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(aliases.read("p", &ctx).unwrap(), Reading::Determined(json!(5)));
    }

    #[test]
    fn test_redefinition_overwrites() {
        let (_, aliases) = registry();
        aliases.define("p", "dev1/temp").unwrap();
        aliases.define("p", "dev2/humidity").unwrap();

        assert_eq!(aliases.resolve("p").unwrap().to_string(), "dev2/humidity");
        assert_eq!(aliases.len(), 1);
    }
}
