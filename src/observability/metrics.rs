//! Metrics collection and exposition.
//!
//! # Metrics
//! - `keygate_checks_total` (counter): checks by gate and outcome
//! - `keygate_trips_total` (counter): closed → open transitions by gate
//! - `keygate_resets_total` (counter): cooldown resets by gate
//! - `keygate_tracked_keys` (gauge): records currently held by a gate
//!
//! # Design Decisions
//! - Handles are registered once per gate; a check does no label allocation
//! - Records are never removed, so the tracked-keys gauge only increments
//! - Never called while a gate lock is held

use std::net::SocketAddr;

use metrics::{Counter, Gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime, and before gates are built:
/// gates register their handles with whichever recorder is installed at
/// construction time.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Metric handles owned by one gate.
#[derive(Clone)]
pub struct GateMetrics {
    allowed: Counter,
    rejected: Counter,
    trips: Counter,
    resets: Counter,
    tracked_keys: Gauge,
}

impl GateMetrics {
    /// Register every handle for the gate called `gate`.
    pub fn register(gate: &str) -> Self {
        let gate = gate.to_owned();
        Self {
            allowed: metrics::counter!("keygate_checks_total", "gate" => gate.clone(), "outcome" => "allowed"),
            rejected: metrics::counter!("keygate_checks_total", "gate" => gate.clone(), "outcome" => "rejected"),
            trips: metrics::counter!("keygate_trips_total", "gate" => gate.clone()),
            resets: metrics::counter!("keygate_resets_total", "gate" => gate.clone()),
            tracked_keys: metrics::gauge!("keygate_tracked_keys", "gate" => gate),
        }
    }

    /// Record the outcome of one check.
    pub fn record_check(&self, allowed: bool) {
        if allowed {
            self.allowed.increment(1);
        } else {
            self.rejected.increment(1);
        }
    }

    /// Record a key moving from closed to open.
    pub fn record_trip(&self) {
        self.trips.increment(1);
    }

    /// Record a key being reset after its cooldown.
    pub fn record_reset(&self) {
        self.resets.increment(1);
    }

    /// Record a new key getting a record.
    pub fn record_key_created(&self) {
        self.tracked_keys.increment(1.0);
    }
}

impl std::fmt::Debug for GateMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateMetrics").finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::capture::CapturingRecorder;
    use super::*;

    #[test]
    fn test_handles_record_under_gate_label() {
        let recorder = CapturingRecorder::default();
        let handles = metrics::with_local_recorder(&recorder, || GateMetrics::register("jobs"));

        handles.record_check(true);
        handles.record_check(true);
        handles.record_check(false);
        handles.record_trip();
        handles.record_reset();
        handles.record_key_created();
        handles.record_key_created();

        assert_eq!(recorder.value("keygate_checks_total{gate=jobs,outcome=allowed}"), Some(2.0));
        assert_eq!(recorder.value("keygate_checks_total{gate=jobs,outcome=rejected}"), Some(1.0));
        assert_eq!(recorder.value("keygate_trips_total{gate=jobs}"), Some(1.0));
        assert_eq!(recorder.value("keygate_resets_total{gate=jobs}"), Some(1.0));
        assert_eq!(recorder.value("keygate_tracked_keys{gate=jobs}"), Some(2.0));
    }

    #[test]
    fn test_handles_without_recorder_are_noops() {
        let handles = GateMetrics::register("unrecorded");
        handles.record_check(true);
        handles.record_key_created();
    }
}
