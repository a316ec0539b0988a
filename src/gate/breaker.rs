//! Single-lock failure gate.
//!
//! Every check, for every key, runs under one mutex. Concurrent checks are
//! therefore linearized globally: no two callers ever observe or mutate
//! overlapping state. High call rates across many distinct keys serialize
//! through this lock; see [`ShardedGate`](super::ShardedGate) when that matters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::gate::clock::{Clock, SystemClock};
use crate::gate::state::{GatePolicy, KeyState, KeyStatus};
use crate::gate::{report, KeyGate, DEFAULT_GATE_NAME};
use crate::observability::metrics::GateMetrics;

/// Per-key failure gate.
///
/// Records are created on first check and replaced when a tripped key is
/// checked again after its cooldown. Nothing else removes them, so keys that
/// trip and are never checked again stay in memory.
#[derive(Debug)]
pub struct Gate<C = SystemClock> {
    name: String,
    policy: GatePolicy,
    clock: C,
    metrics: GateMetrics,
    entries: Mutex<HashMap<String, KeyState>>,
}

impl Gate<SystemClock> {
    /// Create a gate on the system clock.
    ///
    /// No argument is validated. `interval` is stored and has no effect.
    pub fn new(failure_threshold: i64, interval: Duration, cooldown: Duration) -> Self {
        Self::with_clock(failure_threshold, interval, cooldown, SystemClock)
    }
}

impl<C: Clock> Gate<C> {
    /// Create a gate reading time from `clock`.
    pub fn with_clock(
        failure_threshold: i64,
        interval: Duration,
        cooldown: Duration,
        clock: C,
    ) -> Self {
        Self {
            name: DEFAULT_GATE_NAME.to_string(),
            policy: GatePolicy::new(failure_threshold, interval, cooldown),
            clock,
            metrics: GateMetrics::register(DEFAULT_GATE_NAME),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a name used in logs and metric labels.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.metrics = GateMetrics::register(&self.name);
        self
    }

    /// Check `key` with weight 1.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_n(key, 1)
    }

    /// Check `key`, charging `weight` to its counter when allowed.
    ///
    /// Returns `true` if the caller may proceed.
    pub fn allow_n(&self, key: &str, weight: i64) -> bool {
        let (decision, created) = {
            let mut entries = self.lock();
            let now = self.clock.now();
            let existing = entries
                .get_mut(key)
                .map(|state| state.check(now, &self.policy, weight));
            match existing {
                Some(decision) => (decision, false),
                None => {
                    let mut state = KeyState::default();
                    let decision = state.check(now, &self.policy, weight);
                    entries.insert(key.to_owned(), state);
                    (decision, true)
                }
            }
        };

        report(&self.name, &self.metrics, key, decision, created);
        decision.allowed
    }

    /// Last recorded state of `key`. Does not apply the cooldown reset.
    pub fn status(&self, key: &str) -> KeyStatus {
        self.lock()
            .get(key)
            .map(KeyState::status)
            .unwrap_or(KeyStatus::Unseen)
    }

    /// Number of keys currently holding a record.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // The map is only mutated through `KeyState::check`, which cannot panic
    // midway, so a poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, KeyState>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock> KeyGate for Gate<C> {
    fn allow_n(&self, key: &str, weight: i64) -> bool {
        Gate::allow_n(self, key, weight)
    }

    fn status(&self, key: &str) -> KeyStatus {
        Gate::status(self, key)
    }

    fn tracked_keys(&self) -> usize {
        Gate::tracked_keys(self)
    }

    fn policy(&self) -> GatePolicy {
        self.policy
    }

    fn name(&self) -> &str {
        &self.name
    }
}
