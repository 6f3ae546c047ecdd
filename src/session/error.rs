//! Session-level errors.

use crate::camera::{
    BackendBindError, FinalizeError, LensFacing, Permission, RecordingId, RecordingStartError,
};
use thiserror::Error;

/// Errors surfaced by the session controller.
///
/// None of these terminate the process; the caller decides what to do.
/// `PermissionDenied` should end the session flow, the others leave the
/// controller usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The user refused a required permission.
    #[error("{0} permission denied")]
    PermissionDenied(Permission),
    /// The backend could not bind a lens.
    #[error("failed to bind {facing} camera: {source}")]
    BackendBind {
        /// Lens the bind was for.
        facing: LensFacing,
        /// Backend reason.
        #[source]
        source: BackendBindError,
    },
    /// The backend could not start a recording.
    #[error("failed to start recording: {0}")]
    RecordingStart(#[from] RecordingStartError),
    /// A recording finalized with an error.
    #[error("{recording} finalized with error: {source}")]
    RecordingFinalize {
        /// Recording that failed.
        recording: RecordingId,
        /// Backend reason.
        #[source]
        source: FinalizeError,
    },
    /// The controller has been disposed.
    #[error("camera session has been disposed")]
    Disposed,
}

impl SessionError {
    /// Returns true if the caller should end the session flow.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::PermissionDenied(_) | SessionError::Disposed)
    }
}
