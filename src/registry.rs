//! Rule Registry
//!
//! An insertion-ordered map from rule ID to rule. The engine runs rules in
//! registry order, and the order is what callers see in every report.
//!
//! Registration takes a write lock; lookups and iteration take a read lock
//! and hand out cloned [`Arc`]s, so no lock is held while a rule runs.

use indexmap::IndexMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::rule::Rule;
use crate::rules::builtin_rules;

/// Thread-safe, insertion-ordered rule registry.
#[derive(Default)]
pub struct Registry {
    rules: RwLock<IndexMap<&'static str, Arc<dyn Rule>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("ids", &self.ids()).finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in rule in catalogue order.
    #[must_use]
    pub fn with_default_rules() -> Self {
        let registry = Self::new();
        for rule in builtin_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Adds a rule, or replaces the rule registered under the same ID.
    ///
    /// A replaced rule keeps its original position.
    pub fn register(&self, rule: Arc<dyn Rule>) {
        let id = rule.id();
        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        if rules.insert(id, rule).is_some() {
            tracing::debug!(rule = id, "Replaced registered rule");
        }
    }

    /// All rules in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn Rule>> {
        self.read().values().cloned().collect()
    }

    /// Looks a rule up by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Rule>> {
        self.read().get(id).cloned()
    }

    /// Resolves a rule name (`input-removed`) to its ID (`BC002`).
    #[must_use]
    pub fn id_for_name(&self, name: &str) -> Option<&'static str> {
        self.read()
            .values()
            .find(|rule| rule.name() == name)
            .map(|rule| rule.id())
    }

    /// Resolves either an ID or a name to a registered ID.
    #[must_use]
    pub fn resolve(&self, id_or_name: &str) -> Option<&'static str> {
        let rules = self.read();
        if let Some((id, _)) = rules.get_key_value(id_or_name) {
            return Some(*id);
        }
        rules
            .values()
            .find(|rule| rule.name() == id_or_name)
            .map(|rule| rule.id())
    }

    /// Registered IDs in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        self.read().keys().copied().collect()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no rule is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<&'static str, Arc<dyn Rule>>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The process-wide registry with all built-in rules, created on first use.
pub fn default_registry() -> &'static Registry {
    static DEFAULT: OnceLock<Registry> = OnceLock::new();
    DEFAULT.get_or_init(Registry::with_default_rules)
}
