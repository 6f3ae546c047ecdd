//! Prometheus metrics for camera sessions.
//!
//! # Metrics Exposed
//!
//! - `camera_session_bound` - 1 while a pipeline is live, 0 otherwise
//! - `camera_session_recording_state` - 0=idle, 1=recording, 2=paused
//! - `camera_session_facing_front` - 1 while the front lens is selected
//! - `camera_session_binds_total` - Acknowledged binds
//! - `camera_session_bind_failures_total` - Binds the backend refused
//! - `camera_session_recordings_started_total` - Recordings started
//! - `camera_session_recordings_stopped_total` - Recordings that ended
//! - `camera_session_finalize_failures_total` - Recordings that finalized with an error
//! - `camera_session_recorded_bytes` - Bytes written by the active recording
//! - `camera_session_queued_commands` - Commands waiting on a bind acknowledgement

use crate::camera::LensFacing;
use crate::session::{RecordingState, SessionSnapshot};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus registry for one camera session.
pub struct MetricsRegistry {
    registry: Registry,

    bound: IntGauge,
    recording_state: IntGauge,
    facing_front: IntGauge,
    queued_commands: IntGauge,
    recorded_bytes: IntGauge,

    binds_total: IntCounter,
    bind_failures_total: IntCounter,
    recordings_started_total: IntCounter,
    recordings_stopped_total: IntCounter,
    finalize_failures_total: IntCounter,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, MetricsError> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Advances a counter to `target`; counters never go backwards.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        Ok(Self {
            bound: gauge(&registry, "camera_session_bound", "1 while a camera pipeline is bound")?,
            recording_state: gauge(
                &registry,
                "camera_session_recording_state",
                "Recording state (0=idle, 1=recording, 2=paused)",
            )?,
            facing_front: gauge(
                &registry,
                "camera_session_facing_front",
                "1 while the front lens is selected",
            )?,
            queued_commands: gauge(
                &registry,
                "camera_session_queued_commands",
                "Commands waiting on a bind acknowledgement",
            )?,
            recorded_bytes: gauge(
                &registry,
                "camera_session_recorded_bytes",
                "Bytes written by the active recording",
            )?,
            binds_total: counter(
                &registry,
                "camera_session_binds_total",
                "Total acknowledged camera binds",
            )?,
            bind_failures_total: counter(
                &registry,
                "camera_session_bind_failures_total",
                "Total camera binds refused by the backend",
            )?,
            recordings_started_total: counter(
                &registry,
                "camera_session_recordings_started_total",
                "Total recordings started",
            )?,
            recordings_stopped_total: counter(
                &registry,
                "camera_session_recordings_stopped_total",
                "Total recordings that ended",
            )?,
            finalize_failures_total: counter(
                &registry,
                "camera_session_finalize_failures_total",
                "Total recordings that finalized with an error",
            )?,
            registry,
        })
    }

    /// Updates all metrics from a session snapshot.
    pub fn update(&self, snapshot: &SessionSnapshot) {
        self.bound.set(i64::from(snapshot.state.is_bound()));
        self.recording_state.set(match snapshot.state.recording() {
            RecordingState::Idle => 0,
            RecordingState::Recording => 1,
            RecordingState::Paused => 2,
        });
        self.facing_front
            .set(i64::from(snapshot.facing == LensFacing::Front));
        self.queued_commands.set(snapshot.queued_commands as i64);
        self.recorded_bytes.set(
            snapshot
                .recording
                .as_ref()
                .map_or(0, |r| r.stats.recorded_bytes as i64),
        );

        let counters = &snapshot.counters;
        advance(&self.binds_total, counters.binds);
        advance(&self.bind_failures_total, counters.bind_failures);
        advance(&self.recordings_started_total, counters.recordings_started);
        advance(&self.recordings_stopped_total, counters.recordings_stopped);
        advance(&self.finalize_failures_total, counters.finalize_failures);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionCounters, SessionState};

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            facing: LensFacing::Front,
            state: SessionState::Bound(RecordingState::Recording),
            recording: None,
            queued_commands: 0,
            counters: SessionCounters {
                binds: 3,
                bind_failures: 1,
                recordings_started: 2,
                recordings_stopped: 1,
                finalize_failures: 0,
            },
            disposed: false,
        }
    }

    #[test]
    fn test_registry_creation() {
        let metrics = MetricsRegistry::new().unwrap();
        let families = metrics.registry().gather();
        assert_eq!(families.len(), 10);
        assert!(families
            .iter()
            .all(|family| family.get_name().starts_with("camera_session_")));
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&snapshot());

        let output = registry.encode().unwrap();
        assert!(output.contains("camera_session_bound 1"));
        assert!(output.contains("camera_session_recording_state 1"));
        assert!(output.contains("camera_session_facing_front 1"));
        assert!(output.contains("camera_session_binds_total 3"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&snapshot());

        let mut older = snapshot();
        older.counters.binds = 1;
        registry.update(&older);

        let output = registry.encode().unwrap();
        assert!(output.contains("camera_session_binds_total 3"));
    }
}
