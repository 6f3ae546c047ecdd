//! Asynchronous notifications delivered by a camera backend.

use super::{BackendBindError, BindingId, RecordingId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Reasons a recording can finalize with an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalizeError {
    /// Failure with no more specific cause.
    #[error("unknown recording failure")]
    Unknown,
    /// The configured file size limit was reached.
    #[error("file size limit reached")]
    FileSizeLimitReached,
    /// The configured duration limit was reached.
    #[error("duration limit reached")]
    DurationLimitReached,
    /// The device ran out of storage.
    #[error("insufficient storage")]
    InsufficientStorage,
    /// The camera stopped producing frames.
    #[error("video source became inactive")]
    SourceInactive,
    /// The output options were invalid.
    #[error("invalid output options")]
    InvalidOutputOptions,
    /// The encoder failed; carries its message.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),
    /// Any other recorder failure; carries its message.
    #[error("recorder error: {0}")]
    RecorderError(String),
    /// Nothing usable was written.
    #[error("no valid data was recorded")]
    NoValidData,
    /// The recording was dropped without being stopped.
    #[error("recording was discarded before it was stopped")]
    GarbageCollected,
}

/// Progress of an in-flight recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordingStats {
    /// Bytes written to the output so far.
    pub recorded_bytes: u64,
    /// Recorded media duration (excludes paused time).
    pub duration: Duration,
}

/// Events a backend posts to the session's control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// A pending bind is now live.
    BindAcknowledged {
        /// The binding that is now ready.
        binding: BindingId,
    },
    /// A pending bind failed after `bind` returned.
    BindRejected {
        /// The pending binding.
        binding: BindingId,
        /// Why the backend gave up.
        error: BackendBindError,
    },
    /// The backend confirmed a recording is writing.
    RecordingStarted {
        /// The confirmed recording.
        recording: RecordingId,
    },
    /// Periodic progress of an active recording.
    RecordingStatus {
        /// Recording the stats belong to.
        recording: RecordingId,
        /// Progress so far.
        stats: RecordingStats,
    },
    /// The recording is complete; `error` is set if it failed.
    RecordingFinalized {
        /// Recording that completed.
        recording: RecordingId,
        /// Set if the recording failed.
        error: Option<FinalizeError>,
    },
}
