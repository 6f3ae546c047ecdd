//! Camera Session Library
//!
//! A platform-independent controller for the lifecycle of a camera
//! session: lens selection, preview binding, and video recording with
//! pause/resume across lens switches. All camera mechanics are delegated
//! to an injected [`CameraBackend`].
//!
//! # Architecture
//!
//! ```text
//! SessionHandle ──commands──┐
//!                           ├──▶ control loop ──▶ CameraSessionController ──▶ CameraBackend
//! EventSink ─────events─────┘        (one task)                                    │
//!     ▲                                                                            │
//!     └──────────────────── bind acks, recording started/finalized ────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **One binding at a time**: the old pipeline is released before a new one is bound
//! - **Recordings survive lens switches**: paused before the rebind, resumed after
//! - **Issuance order**: commands issued before a bind is acknowledged are queued
//! - **Rollback**: a failed bind restores the previous lens
//!
//! # Example
//!
//! ```no_run
//! use camera_session::{
//!     camera::{LensFacing, MockBackend, OutputTarget, StaticPermissions},
//!     session::CameraSessionController,
//! };
//!
//! let mut session = CameraSessionController::new(MockBackend::new(), StaticPermissions::granted());
//!
//! session.request_permission().unwrap();
//! session.start_session(LensFacing::Back).unwrap();
//! session.toggle_recording(OutputTarget::file("video.mp4")).unwrap();
//! session.flip().unwrap();
//! session.toggle_recording(OutputTarget::file("unused.mp4")).unwrap();
//! session.dispose();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod config;
pub mod metrics;
pub mod session;

// Re-export commonly used types at crate root
pub use camera::{
    BackendEvent, CameraBackend, LensFacing, MockBackend, OutputTarget, PermissionProvider,
};
pub use config::{FileConfig, SessionConfig};
pub use metrics::MetricsRegistry;
pub use session::{
    CameraSessionController, Outcome, RecordingState, SessionError, SessionHandle,
    SessionSnapshot, SessionState,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
