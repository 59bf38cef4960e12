//! Registry of normalized rules

use dashmap::DashMap;
use tracing::{debug, warn};
use wb_rules::{ChangeTarget, NormalizedRule, RuleRegistry};

/// Rules keyed by name
///
/// Registering a name twice replaces the earlier rule.
#[derive(Default)]
pub struct RuleTable {
    rules: DashMap<String, NormalizedRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<NormalizedRule> {
        self.rules.get(name).map(|r| r.clone())
    }

    /// Rule names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rules.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot of every rule, sorted by name
    pub fn all(&self) -> Vec<NormalizedRule> {
        let mut rules: Vec<NormalizedRule> = self.rules.iter().map(|r| r.value().clone()).collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    /// Rules whose `whenChanged` lists the cell at `path`
    pub fn watching(&self, path: &str) -> Vec<NormalizedRule> {
        self.all()
            .into_iter()
            .filter(|rule| {
                rule.when_changed.as_ref().is_some_and(|targets| {
                    targets
                        .iter()
                        .filter_map(ChangeTarget::as_cell)
                        .any(|cell| cell == path)
                })
            })
            .collect()
    }

    pub fn remove(&self, name: &str) -> Option<NormalizedRule> {
        self.rules.remove(name).map(|(_, rule)| rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleRegistry for RuleTable {
    fn register_rule(&self, name: &str, rule: NormalizedRule) {
        if self.rules.insert(name.to_string(), rule).is_some() {
            warn!(rule = name, "Rule redefined, replacing previous definition");
        } else {
            debug!(rule = name, "Rule registered");
        }
    }
}
