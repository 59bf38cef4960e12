//! Lazily populated, memoizing name → wrapper catalog
//!
//! Backs both the device catalog and the timer-status catalog. Entries are
//! only ever created by the catalog's constructor on first access; callers
//! cannot insert their own.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::error::{RuleError, RuleResult};

type Constructor<T> = Box<dyn Fn(&str) -> T + Send + Sync>;

/// Memoizing catalog of wrappers keyed by name
///
/// `get` returns the same `Arc` for a name until it is invalidated.
pub struct LazyCatalog<T> {
    entries: DashMap<String, Arc<T>>,
    construct: Constructor<T>,
}

impl<T> LazyCatalog<T> {
    /// Create an empty catalog with the given constructor
    pub fn new(construct: impl Fn(&str) -> T + Send + Sync + 'static) -> Self {
        Self {
            entries: DashMap::new(),
            construct: Box::new(construct),
        }
    }

    /// Get the wrapper for `name`, constructing it on first access
    pub fn get(&self, name: &str) -> Arc<T> {
        if let Some(entry) = self.entries.get(name) {
            return entry.value().clone();
        }
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| {
                trace!(name, "Constructing catalog entry");
                Arc::new((self.construct)(name))
            })
            .value()
            .clone()
    }

    /// External assignment into the catalog is never permitted
    pub fn set(&self, name: &str, _value: Arc<T>) -> RuleResult<()> {
        Err(RuleError::UnsupportedProxyMutation(name.to_string()))
    }

    /// Drop the memoized wrapper for `name`; the next `get` rebuilds it
    pub fn invalidate(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Whether a wrapper for `name` has been constructed
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of constructed wrappers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> fmt::Debug for LazyCatalog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCatalog")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_catalog() -> (Arc<AtomicUsize>, LazyCatalog<String>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let catalog = LazyCatalog::new(move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("wrapped:{name}")
        });
        (calls, catalog)
    }

    #[test]
    fn test_get_constructs_once() {
        let (calls, catalog) = counting_catalog();

        let first = catalog.get("dev1");
        let second = catalog.get("dev1");

        assert_eq!(*first, "wrapped:dev1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_names_get_distinct_entries() {
        let (calls, catalog) = counting_catalog();

        let a = catalog.get("a");
        let b = catalog.get("b");

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_set_always_fails() {
        let (_, catalog) = counting_catalog();
        let value = catalog.get("dev1");

        assert_eq!(
            catalog.set("dev1", value).unwrap_err(),
            RuleError::UnsupportedProxyMutation("dev1".to_string())
        );
        assert_eq!(
            catalog.set("other", Arc::new("x".to_string())).unwrap_err(),
            RuleError::UnsupportedProxyMutation("other".to_string())
        );
        assert!(!catalog.contains("other"));
    }

    #[test]
    fn test_invalidate_rebuilds() {
        let (calls, catalog) = counting_catalog();

        let first = catalog.get("dev1");
        assert!(catalog.invalidate("dev1"));
        assert!(!catalog.invalidate("dev1"));

        let second = catalog.get("dev1");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
