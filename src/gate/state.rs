//! Per-key gate state.
//!
//! # States
//! - Unseen: no record for the key
//! - Closed: counter below threshold, checks pass and charge the counter
//! - Open: counter reached threshold, checks rejected until cooldown elapses
//!
//! # State Transitions
//! ```text
//! Unseen → Closed: any check (allowed)
//! Closed → Closed: counter < threshold before charging (allowed)
//! Closed → Open: counter >= threshold (rejected, trip time recorded)
//! Open → Open: now - tripped_at <= cooldown (rejected, trip time unchanged)
//! Open → Closed: now - tripped_at > cooldown (record reset, then allowed)
//! ```
//!
//! # Design Decisions
//! - One record per key holds both counter and trip time so they never diverge
//! - No half-open probing; recovery is purely time based
//! - The first trip time is sticky

use std::time::{Duration, Instant};

/// Thresholds shared by every key of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    /// Highest cumulative counter value still treated as closed (exclusive).
    /// Zero or negative rejects every check.
    pub failure_threshold: i64,
    /// Accepted for compatibility. No decision reads it.
    pub interval: Duration,
    /// How long a key stays open after its first rejection.
    pub cooldown: Duration,
}

impl GatePolicy {
    pub fn new(failure_threshold: i64, interval: Duration, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            interval,
            cooldown,
        }
    }
}

/// Outcome of a single check, including the transitions it caused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Decision {
    pub allowed: bool,
    /// The record had cooled down and was reset before deciding.
    pub reset: bool,
    /// This check moved the key to open.
    pub tripped: bool,
}

/// Counter and trip time for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct KeyState {
    counter: i64,
    tripped_at: Option<Instant>,
}

impl KeyState {
    /// Run one check against this record. Callers hold the lock guarding it.
    pub(crate) fn check(&mut self, now: Instant, policy: &GatePolicy, weight: i64) -> Decision {
        let mut reset = false;
        if let Some(tripped_at) = self.tripped_at {
            if now.saturating_duration_since(tripped_at) > policy.cooldown {
                *self = KeyState::default();
                reset = true;
            }
        }

        // Compared before charging: one heavy check may overshoot.
        if self.counter < policy.failure_threshold {
            self.counter = self.counter.saturating_add(weight);
            return Decision {
                allowed: true,
                reset,
                tripped: false,
            };
        }

        let tripped = self.tripped_at.is_none();
        if tripped {
            self.tripped_at = Some(now);
        }
        Decision {
            allowed: false,
            reset,
            tripped,
        }
    }

    pub(crate) fn status(&self) -> KeyStatus {
        match self.tripped_at {
            Some(tripped_at) => KeyStatus::Open {
                counter: self.counter,
                tripped_at,
            },
            None => KeyStatus::Closed {
                counter: self.counter,
            },
        }
    }
}

/// Read-only view of a key, as last recorded.
///
/// Inspection never applies the cooldown reset, so a key whose cooldown has
/// already elapsed still reports `Open` until it is checked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Unseen,
    Closed { counter: i64 },
    Open { counter: i64, tripped_at: Instant },
}

impl KeyStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, KeyStatus::Open { .. })
    }

    /// Charged counter value; zero for unseen keys.
    pub fn counter(&self) -> i64 {
        match *self {
            KeyStatus::Unseen => 0,
            KeyStatus::Closed { counter } | KeyStatus::Open { counter, .. } => counter,
        }
    }

    /// Short label used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            KeyStatus::Unseen => "unseen",
            KeyStatus::Closed { .. } => "closed",
            KeyStatus::Open { .. } => "open",
        }
    }
}
