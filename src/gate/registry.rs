//! Named gates built from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{GateConfig, KeygateConfig};
use crate::gate::{Gate, KeyGate, ShardedGate};

/// A set of independent, shareable gates keyed by name.
#[derive(Clone, Default)]
pub struct GateRegistry {
    gates: BTreeMap<String, Arc<dyn KeyGate>>,
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one gate per `[gates.<name>]` table.
    pub fn from_config(config: &KeygateConfig) -> Self {
        let mut registry = Self::new();
        for (name, gate) in &config.gates {
            registry.insert(name.clone(), build_gate(name, gate));
        }
        tracing::info!(gates = registry.len(), "Gate registry built");
        registry
    }

    /// Register a gate, replacing any gate already under `name`.
    pub fn insert(&mut self, name: impl Into<String>, gate: Arc<dyn KeyGate>) -> Option<Arc<dyn KeyGate>> {
        self.gates.insert(name.into(), gate)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn KeyGate>> {
        self.gates.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// Build a single gate from its config table.
pub fn build_gate(name: &str, config: &GateConfig) -> Arc<dyn KeyGate> {
    let policy = config.policy();
    match config.shards {
        Some(shards) => {
            tracing::debug!(gate = %name, shards, threshold = policy.failure_threshold, "Building sharded gate");
            Arc::new(
                ShardedGate::new(policy.failure_threshold, policy.interval, policy.cooldown, shards)
                    .named(name),
            )
        }
        None => {
            tracing::debug!(gate = %name, threshold = policy.failure_threshold, "Building gate");
            Arc::new(Gate::new(policy.failure_threshold, policy.interval, policy.cooldown).named(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::time::Duration;

    #[test]
    fn test_registry_from_config() {
        let config = parse_config(
            r#"
            [gates.payments]
            failure_threshold = 2
            cooldown_ms = 1000

            [gates.search]
            failure_threshold = 3
            shards = 4
            "#,
        )
        .unwrap();

        let registry = GateRegistry::from_config(&config);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["payments", "search"]);

        let payments = registry.get("payments").unwrap();
        assert_eq!(payments.name(), "payments");
        assert_eq!(payments.policy().cooldown, Duration::from_secs(1));
        assert!(payments.allow("k"));
        assert!(payments.allow("k"));
        assert!(!payments.allow("k"));

        let search = registry.get("search").unwrap();
        assert_eq!(search.name(), "search");
        assert!(search.allow_n("k", 3));
        assert!(!search.allow("k"));
    }

    #[test]
    fn test_gates_do_not_share_state() {
        let config = parse_config(
            r#"
            [gates.a]
            failure_threshold = 1

            [gates.b]
            failure_threshold = 1
            "#,
        )
        .unwrap();

        let first = GateRegistry::from_config(&config);
        let second = GateRegistry::from_config(&config);

        let a = first.get("a").unwrap();
        assert!(a.allow("shared-key"));
        assert!(!a.allow("shared-key"));

        assert!(first.get("b").unwrap().allow("shared-key"));
        assert!(second.get("a").unwrap().allow("shared-key"));
    }

    #[test]
    fn test_clones_share_gates() {
        let mut registry = GateRegistry::new();
        assert!(registry.is_empty());
        registry.insert("jobs", Arc::new(Gate::new(1, Duration::ZERO, Duration::from_secs(60))));

        let clone = registry.clone();
        assert!(registry.get("jobs").unwrap().allow("k"));
        assert!(!clone.get("jobs").unwrap().allow("k"));
        assert!(clone.get("missing").is_none());
    }
}
