//! Session state and snapshots.

use crate::camera::{LensFacing, RecordingId, RecordingStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recording sub-state of a bound session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress.
    #[default]
    Idle,
    /// Frames are being written.
    Recording,
    /// Recording is held across a rebind.
    Paused,
}

/// Observable lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "recording", rename_all = "lowercase")]
pub enum SessionState {
    /// No pipeline bound.
    Unbound,
    /// A bind was issued and the backend has not acknowledged it yet.
    Binding(RecordingState),
    /// A pipeline is live.
    Bound(RecordingState),
}

impl SessionState {
    /// True once a binding is live and acknowledged.
    pub fn is_bound(&self) -> bool {
        matches!(self, SessionState::Bound(_))
    }

    /// Recording state; `Idle` when unbound.
    pub fn recording(&self) -> RecordingState {
        match self {
            SessionState::Unbound => RecordingState::Idle,
            SessionState::Binding(r) | SessionState::Bound(r) => *r,
        }
    }
}

/// Running totals kept by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionCounters {
    /// Successful (acknowledged) binds.
    pub binds: u64,
    /// Binds the backend refused.
    pub bind_failures: u64,
    /// Recordings started.
    pub recordings_started: u64,
    /// Recordings that ended, by stop, dispose or backend finalize.
    pub recordings_stopped: u64,
    /// Recordings that finalized with an error.
    pub finalize_failures: u64,
}

/// Details of the recording currently held by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingInfo {
    /// Backend-assigned id.
    pub id: RecordingId,
    /// Where the recording is written.
    pub output: PathBuf,
    /// When the controller started it.
    pub started_at: DateTime<Utc>,
    /// Set once the backend has confirmed the recording started.
    pub confirmed: bool,
    /// Latest progress reported by the backend.
    pub stats: RecordingStats,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Lens of the current binding, or the lens last requested.
    pub facing: LensFacing,
    /// Binding and recording state.
    pub state: SessionState,
    /// Active recording, if any.
    pub recording: Option<RecordingInfo>,
    /// Commands waiting on a bind acknowledgement.
    pub queued_commands: usize,
    /// Running totals.
    pub counters: SessionCounters,
    /// True after dispose.
    pub disposed: bool,
}
