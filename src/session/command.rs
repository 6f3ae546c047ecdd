//! Commands and their results.

use super::SessionError;
use crate::camera::{LensFacing, OutputTarget, RecordingId};
use std::fmt;

/// A user-level command accepted by the controller.
#[derive(Debug)]
pub enum Command {
    /// Binds the given lens, replacing any current binding.
    StartSession(LensFacing),
    /// Rebinds with the opposite lens.
    Flip,
    /// Starts a recording to the target, or stops the active one.
    ToggleRecording(OutputTarget),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::StartSession(_) => "start_session",
            Command::Flip => "flip",
            Command::ToggleRecording(_) => "toggle_recording",
        }
    }
}

/// Identifies a command whose result is delivered later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an applied command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The session is bound to this lens.
    Bound(LensFacing),
    /// A recording started.
    RecordingStarted(RecordingId),
    /// The active recording was stopped.
    RecordingStopped(RecordingId),
}

/// Immediate result of issuing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Applied synchronously.
    Done(Outcome),
    /// Waiting on a bind acknowledgement; the result arrives as a
    /// [`Completion`] carrying this ticket.
    Pending(Ticket),
}

impl Dispatch {
    /// The outcome, if the command was applied synchronously.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Dispatch::Done(outcome) => Some(*outcome),
            Dispatch::Pending(_) => None,
        }
    }

    /// The ticket, if the command is waiting.
    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            Dispatch::Done(_) => None,
            Dispatch::Pending(ticket) => Some(*ticket),
        }
    }
}

/// Deferred result of a pending command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Ticket returned when the command was issued.
    pub ticket: Ticket,
    /// What the command produced once applied.
    pub result: Result<Outcome, SessionError>,
}
