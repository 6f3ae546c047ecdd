//! Camera backend abstraction.
//!
//! The backend owns every camera mechanic (device access, encoding,
//! muxing). The session controller only asks it to bind, unbind and drive
//! recordings, and never issues two of those calls concurrently.

use super::{LensFacing, MirrorMode, OutputTarget};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier of a session binding, unique per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingId(pub u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding-{}", self.0)
    }
}

/// Identifier of a recording, unique per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordingId(pub u64);

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recording-{}", self.0)
    }
}

/// Errors a backend reports when asked to bind a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendBindError {
    /// The backend has no camera with this facing.
    #[error("no camera available for {0} lens")]
    UnsupportedLens(LensFacing),
    /// The camera provider could not be obtained.
    #[error("camera provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// The backend refused the use-case configuration.
    #[error("configuration rejected: {0}")]
    Rejected(String),
}

/// Errors a backend reports when asked to start recording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingStartError {
    /// No binding was supplied or it is no longer live.
    #[error("no session is bound")]
    NotBound,
    /// The backend cannot write to the requested output.
    #[error("output target rejected: {0}")]
    OutputRejected(String),
}

/// A bound preview+capture pipeline.
///
/// Handed out by [`CameraBackend::bind`] and owned by the session
/// controller until it is passed back to [`CameraBackend::unbind`].
#[derive(Debug, PartialEq, Eq)]
pub struct SessionBinding {
    id: BindingId,
    facing: LensFacing,
    ready: bool,
}

impl SessionBinding {
    /// A binding the backend has already acknowledged.
    pub fn ready(id: BindingId, facing: LensFacing) -> Self {
        Self {
            id,
            facing,
            ready: true,
        }
    }

    /// A binding the backend will acknowledge later with
    /// [`BackendEvent::BindAcknowledged`](super::BackendEvent::BindAcknowledged).
    pub fn pending(id: BindingId, facing: LensFacing) -> Self {
        Self {
            id,
            facing,
            ready: false,
        }
    }

    /// Backend-assigned id of this binding.
    #[inline]
    pub fn id(&self) -> BindingId {
        self.id
    }

    /// Lens this binding was made for.
    #[inline]
    pub fn facing(&self) -> LensFacing {
        self.facing
    }

    /// Returns true once the backend has acknowledged the bind.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn mark_ready(&mut self) {
        self.ready = true;
    }
}

/// Handle to an in-flight recording.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordingHandle {
    id: RecordingId,
    output: PathBuf,
}

impl RecordingHandle {
    /// Wraps a recording the backend started writing to `output`.
    pub fn new(id: RecordingId, output: impl Into<PathBuf>) -> Self {
        Self {
            id,
            output: output.into(),
        }
    }

    /// Backend-assigned id of the recording.
    #[inline]
    pub fn id(&self) -> RecordingId {
        self.id
    }

    /// File the recording is being written to.
    #[inline]
    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Surface the preview stream is rendered into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSink {
    surface: String,
}

impl PreviewSink {
    /// Creates a sink rendering into `surface`.
    pub fn new(surface: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
        }
    }

    /// Identifier of the target surface.
    pub fn surface(&self) -> &str {
        &self.surface
    }
}

impl Default for PreviewSink {
    fn default() -> Self {
        Self::new("preview")
    }
}

/// Per-recording capture options.
///
/// Recordings are persistent: they survive unbinding and rebinding of
/// the pipeline they were started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordingOptions {
    /// Mirroring applied to recorded frames.
    pub mirror_mode: MirrorMode,
    /// Whether an audio track is captured.
    pub with_audio: bool,
}

/// Trait for camera backends.
///
/// Implementations may acknowledge binds synchronously (return a ready
/// binding) or later through the session's event sink. Recording
/// lifecycle notifications are always delivered as events.
pub trait CameraBackend {
    /// Binds a preview+capture pipeline for `facing`.
    fn bind(
        &mut self,
        facing: LensFacing,
        preview: &PreviewSink,
    ) -> Result<SessionBinding, BackendBindError>;

    /// Releases a binding. Persistent recordings keep their handle.
    fn unbind(&mut self, binding: &SessionBinding);

    /// Starts a persistent recording on `binding`, consuming `output`.
    fn start_recording(
        &mut self,
        binding: &SessionBinding,
        output: OutputTarget,
        options: &RecordingOptions,
    ) -> Result<RecordingHandle, RecordingStartError>;

    /// Pauses a recording without finalizing it.
    fn pause(&mut self, handle: &RecordingHandle);

    /// Resumes a paused recording.
    fn resume(&mut self, handle: &RecordingHandle);

    /// Stops a recording. The backend finalizes it asynchronously.
    fn stop(&mut self, handle: &RecordingHandle);
}
