//! Camera collaborator boundary.
//!
//! This module defines what the session controller needs from the outside
//! world: a backend that binds preview+capture pipelines and drives
//! recordings, and a permission provider. Nothing here talks to real
//! hardware; platform integrations implement [`CameraBackend`] and
//! [`PermissionProvider`], and [`MockBackend`] stands in for tests and the
//! demo CLI.

mod backend;
mod events;
mod facing;
mod mock;
mod output;
mod permission;

pub use backend::{
    BackendBindError, BindingId, CameraBackend, PreviewSink, RecordingHandle, RecordingId,
    RecordingOptions, RecordingStartError, SessionBinding,
};
pub use events::{BackendEvent, FinalizeError, RecordingStats};
pub use facing::{LensFacing, MirrorMode, ParseFacingError};
pub use mock::{AckMode, BackendCall, CallLog, MockBackend};
pub use output::OutputTarget;
pub use permission::{Permission, PermissionProvider, StaticPermissions};
