//! Camera session lifecycle.
//!
//! [`CameraSessionController`] is the state machine: it tracks lens
//! facing, the single active binding and the recording state, and drives
//! the backend. [`control`] runs a controller on one tokio task so user
//! commands and backend events are applied in the order they were issued.

mod command;
pub mod control;
mod controller;
mod error;
mod state;

pub use command::{Command, Completion, Dispatch, Outcome, Ticket};
pub use control::{EventSink, SessionHandle, SessionNotice};
pub use controller::CameraSessionController;
pub use error::SessionError;
pub use state::{RecordingInfo, RecordingState, SessionCounters, SessionSnapshot, SessionState};
