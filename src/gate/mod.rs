//! Failure gating subsystem.
//!
//! # Data Flow
//! ```text
//! Caller, before a guarded operation:
//!     → KeyGate::allow / allow_n (key, weight)
//!     → lock the record for key (one mutex, or one dashmap shard)
//!     → state.rs: cooldown reset, threshold compare, charge or trip
//!     → unlock
//!     → logging + metrics for the decision
//!     → caller proceeds only on `true`
//! ```
//!
//! # Design Decisions
//! - Gates are constructed explicitly and shared via `Arc`; no globals
//! - Gates count charged attempts; callers decide what a failure is
//! - Checks are total: no input makes them fail or panic
//! - No background sweeping; stale keys are reset lazily on their next check

pub mod breaker;
pub mod clock;
pub mod registry;
pub mod sharded;
pub mod state;

pub use breaker::Gate;
pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::GateRegistry;
pub use sharded::ShardedGate;
pub use state::{GatePolicy, KeyStatus};

use crate::observability::metrics::GateMetrics;
use state::Decision;

/// Name given to gates built without one.
pub const DEFAULT_GATE_NAME: &str = "default";

/// Common interface of every gate implementation.
pub trait KeyGate: Send + Sync {
    /// Check `key`, charging `weight` when allowed.
    fn allow_n(&self, key: &str, weight: i64) -> bool;

    /// Check `key` with weight 1.
    fn allow(&self, key: &str) -> bool {
        self.allow_n(key, 1)
    }

    /// Last recorded state of `key`, without applying cooldown.
    fn status(&self, key: &str) -> KeyStatus;

    /// Number of keys holding a record.
    fn tracked_keys(&self) -> usize;

    fn policy(&self) -> GatePolicy;

    fn name(&self) -> &str;
}

/// Log and count one decision. Called after the lock is released.
pub(crate) fn report(
    gate: &str,
    metrics: &GateMetrics,
    key: &str,
    decision: Decision,
    created: bool,
) {
    if created {
        metrics.record_key_created();
    }
    if decision.reset {
        tracing::debug!(gate = %gate, key = %key, "Cooldown elapsed, key reset");
        metrics.record_reset();
    }
    if decision.tripped {
        tracing::debug!(gate = %gate, key = %key, "Threshold reached, key open");
        metrics.record_trip();
    }
    tracing::trace!(gate = %gate, key = %key, allowed = decision.allowed, "Gate check");
    metrics.record_check(decision.allowed);
}
