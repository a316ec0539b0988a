//! Sharded failure gate.
//!
//! Same decisions as [`Gate`](super::Gate), but records live in a `DashMap`
//! so checks only serialize with other checks hashing to the same shard.
//! A check holds its key's shard write lock from the cooldown test through
//! the charge, which keeps every key linearizable.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::gate::clock::{Clock, SystemClock};
use crate::gate::state::{GatePolicy, KeyState, KeyStatus};
use crate::gate::{report, KeyGate, DEFAULT_GATE_NAME};
use crate::observability::metrics::GateMetrics;

const MAX_SHARDS: usize = 1 << 16;

/// Per-key failure gate with lock striping.
#[derive(Debug)]
pub struct ShardedGate<C = SystemClock> {
    name: String,
    policy: GatePolicy,
    clock: C,
    shards: usize,
    metrics: GateMetrics,
    entries: DashMap<String, KeyState>,
}

impl ShardedGate<SystemClock> {
    /// Create a sharded gate on the system clock.
    ///
    /// `shards` is rounded up to a power of two, at least 2.
    pub fn new(failure_threshold: i64, interval: Duration, cooldown: Duration, shards: usize) -> Self {
        Self::with_clock(failure_threshold, interval, cooldown, shards, SystemClock)
    }
}

impl<C: Clock> ShardedGate<C> {
    pub fn with_clock(
        failure_threshold: i64,
        interval: Duration,
        cooldown: Duration,
        shards: usize,
        clock: C,
    ) -> Self {
        let shards = shard_amount(shards);
        Self {
            name: DEFAULT_GATE_NAME.to_string(),
            policy: GatePolicy::new(failure_threshold, interval, cooldown),
            clock,
            shards,
            metrics: GateMetrics::register(DEFAULT_GATE_NAME),
            entries: DashMap::with_shard_amount(shards),
        }
    }

    /// Attach a name used in logs and metric labels.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.metrics = GateMetrics::register(&self.name);
        self
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_n(key, 1)
    }

    pub fn allow_n(&self, key: &str, weight: i64) -> bool {
        // Fast path avoids allocating the key once it has a record.
        let existing = self
            .entries
            .get_mut(key)
            .map(|mut state| state.check(self.clock.now(), &self.policy, weight));

        let (decision, created) = match existing {
            Some(decision) => (decision, false),
            None => match self.entries.entry(key.to_owned()) {
                Entry::Occupied(mut entry) => {
                    let decision = entry.get_mut().check(self.clock.now(), &self.policy, weight);
                    (decision, false)
                }
                Entry::Vacant(entry) => {
                    let mut state = KeyState::default();
                    let decision = state.check(self.clock.now(), &self.policy, weight);
                    entry.insert(state);
                    (decision, true)
                }
            },
        };

        report(&self.name, &self.metrics, key, decision, created);
        decision.allowed
    }

    /// Last recorded state of `key`. Does not apply the cooldown reset.
    pub fn status(&self, key: &str) -> KeyStatus {
        self.entries
            .get(key)
            .map(|state| state.status())
            .unwrap_or(KeyStatus::Unseen)
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Number of lock shards actually in use.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C: Clock> KeyGate for ShardedGate<C> {
    fn allow_n(&self, key: &str, weight: i64) -> bool {
        ShardedGate::allow_n(self, key, weight)
    }

    fn status(&self, key: &str) -> KeyStatus {
        ShardedGate::status(self, key)
    }

    fn tracked_keys(&self) -> usize {
        ShardedGate::tracked_keys(self)
    }

    fn policy(&self) -> GatePolicy {
        self.policy
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn shard_amount(requested: usize) -> usize {
    requested.clamp(2, MAX_SHARDS).next_power_of_two()
}
