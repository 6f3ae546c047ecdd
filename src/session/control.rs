//! Control loop for a camera session.
//!
//! The controller is owned by a single tokio task. User commands (from a
//! [`SessionHandle`]) and backend events (from an [`EventSink`]) travel
//! over the same channel, so they are applied strictly in the order they
//! were sent. Commands that wait on a bind acknowledgement get their reply
//! once the controller completes them.
//!
//! ```no_run
//! use camera_session::camera::{AckMode, LensFacing, MockBackend, OutputTarget, StaticPermissions};
//! use camera_session::session::{control, CameraSessionController};
//!
//! # async fn demo() -> Result<(), camera_session::SessionError> {
//! let (sink, inbox) = control::channel();
//! let backend = MockBackend::new()
//!     .with_ack_mode(AckMode::Posted)
//!     .with_event_sink(sink);
//! let controller = CameraSessionController::new(backend, StaticPermissions::granted());
//! let (session, _task) = inbox.spawn(controller);
//!
//! session.request_permission().await?;
//! session.start_session(LensFacing::Back).await?;
//! session.toggle_recording(OutputTarget::file("video.mp4")).await?;
//! session.flip().await?;
//! session.dispose().await?;
//! # Ok(())
//! # }
//! ```

use super::{
    CameraSessionController, Command, Completion, Dispatch, Outcome, SessionError,
    SessionSnapshot, Ticket,
};
use crate::camera::{
    BackendEvent, CameraBackend, LensFacing, OutputTarget, PermissionProvider, RecordingId,
};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Capacity of the notice broadcast; slow subscribers see `Lagged`.
const NOTICE_CAPACITY: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Message {
    Command {
        command: Command,
        reply: Reply<Outcome>,
    },
    Permission {
        reply: Reply<()>,
    },
    Backend(BackendEvent),
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Dispose {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The backend confirmed a recording is writing.
    RecordingStarted(RecordingId),
    /// A recording finalized successfully.
    RecordingFinalized(RecordingId),
    /// An error not tied to any caller's request, such as a finalize
    /// failure.
    Error(SessionError),
}

/// Posts backend events onto a session's control loop.
///
/// Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl EventSink {
    /// Queues `event` for the control loop. Dropped if the loop has stopped.
    pub fn post(&self, event: BackendEvent) {
        if self.tx.send(Message::Backend(event)).is_err() {
            tracing::debug!("Control loop stopped; dropping backend event");
        }
    }
}

/// Receiving end of a control channel, not yet attached to a controller.
pub struct ControlInbox {
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

/// Creates a control channel.
///
/// The sink is handed to the backend before the controller exists; the
/// inbox is then attached with [`ControlInbox::spawn`].
pub fn channel() -> (EventSink, ControlInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx: tx.clone() }, ControlInbox { tx, rx })
}

impl ControlInbox {
    /// Runs `controller` on a new tokio task.
    ///
    /// The task exits after [`SessionHandle::dispose`]. Must be called
    /// from within a tokio runtime.
    pub fn spawn<B, P>(
        self,
        controller: CameraSessionController<B, P>,
    ) -> (SessionHandle, JoinHandle<()>)
    where
        B: CameraBackend + Send + 'static,
        P: PermissionProvider + Send + 'static,
    {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let handle = SessionHandle {
            tx: self.tx,
            notices: notices.clone(),
        };
        let control = ControlLoop {
            controller,
            rx: self.rx,
            replies: HashMap::new(),
            notices,
        };
        (handle, tokio::spawn(control.run()))
    }
}

/// Client handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Message>,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionHandle {
    /// Sends `command` without waiting for its result.
    pub fn submit(
        &self,
        command: Command,
    ) -> Result<oneshot::Receiver<Result<Outcome, SessionError>>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Command { command, reply })?;
        Ok(rx)
    }

    /// Sends `command` and waits until it has been applied.
    pub async fn issue(&self, command: Command) -> Result<Outcome, SessionError> {
        let rx = self.submit(command)?;
        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Requests the permissions the session needs.
    pub async fn request_permission(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Permission { reply })?;
        rx.await.map_err(|_| SessionError::Disposed)?
    }

    /// Binds `facing`; see [`CameraSessionController::start_session`].
    pub async fn start_session(&self, facing: LensFacing) -> Result<Outcome, SessionError> {
        self.issue(Command::StartSession(facing)).await
    }

    /// Switches to the opposite lens.
    pub async fn flip(&self) -> Result<Outcome, SessionError> {
        self.issue(Command::Flip).await
    }

    /// Starts or stops a recording.
    pub async fn toggle_recording(&self, output: OutputTarget) -> Result<Outcome, SessionError> {
        self.issue(Command::ToggleRecording(output)).await
    }

    /// Current state of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Snapshot { reply })?;
        rx.await.map_err(|_| SessionError::Disposed)
    }

    /// Disposes the controller and stops the control loop.
    ///
    /// Returns the final snapshot once the recording is stopped and the
    /// binding released.
    pub async fn dispose(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Dispose { reply })?;
        rx.await.map_err(|_| SessionError::Disposed)
    }

    /// Subscribes to session notices sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// A sink posting into this session's control loop.
    pub fn event_sink(&self) -> EventSink {
        EventSink {
            tx: self.tx.clone(),
        }
    }

    fn send(&self, message: Message) -> Result<(), SessionError> {
        self.tx.send(message).map_err(|_| SessionError::Disposed)
    }
}

struct ControlLoop<B: CameraBackend, P: PermissionProvider> {
    controller: CameraSessionController<B, P>,
    rx: mpsc::UnboundedReceiver<Message>,
    replies: HashMap<Ticket, Reply<Outcome>>,
    notices: broadcast::Sender<SessionNotice>,
}

impl<B: CameraBackend, P: PermissionProvider> ControlLoop<B, P> {
    async fn run(mut self) {
        tracing::debug!("Control loop started");

        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Command { command, reply } => match self.controller.issue(command) {
                    Ok(Dispatch::Done(outcome)) => {
                        let _ = reply.send(Ok(outcome));
                    }
                    Ok(Dispatch::Pending(ticket)) => {
                        self.replies.insert(ticket, reply);
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                },
                Message::Permission { reply } => {
                    let _ = reply.send(self.controller.request_permission());
                }
                Message::Backend(event) => self.handle_event(event),
                Message::Snapshot { reply } => {
                    let _ = reply.send(self.controller.snapshot());
                }
                Message::Dispose { reply } => {
                    let abandoned = self.controller.dispose();
                    self.complete(abandoned);
                    self.drain_after_dispose();
                    let _ = reply.send(self.controller.snapshot());
                    break;
                }
            }
        }

        tracing::debug!("Control loop stopped");
    }

    /// Applies backend events already posted (the finalize of the recording
    /// stopped by dispose among them) and refuses everything else.
    fn drain_after_dispose(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            match message {
                Message::Backend(event) => self.handle_event(event),
                Message::Command { reply, .. } => {
                    let _ = reply.send(Err(SessionError::Disposed));
                }
                Message::Permission { reply } => {
                    let _ = reply.send(Err(SessionError::Disposed));
                }
                Message::Snapshot { reply } | Message::Dispose { reply } => {
                    let _ = reply.send(self.controller.snapshot());
                }
            }
        }
    }

    fn handle_event(&mut self, event: BackendEvent) {
        let notice = match &event {
            BackendEvent::RecordingStarted { recording } => {
                Some(SessionNotice::RecordingStarted(*recording))
            }
            BackendEvent::RecordingFinalized {
                recording,
                error: None,
            } => Some(SessionNotice::RecordingFinalized(*recording)),
            _ => None,
        };

        match self.controller.on_backend_event(event) {
            Ok(completions) => {
                self.complete(completions);
                if let Some(notice) = notice {
                    self.notify(notice);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Backend reported a session error");
                self.notify(SessionNotice::Error(e));
            }
        }
    }

    /// Delivers completions to waiting callers.
    ///
    /// Failures with nobody waiting (the caller dropped its receiver, or
    /// the command was an internal restore) are broadcast instead.
    fn complete(&mut self, completions: Vec<Completion>) {
        for Completion { ticket, result } in completions {
            let undelivered = match self.replies.remove(&ticket) {
                Some(reply) => reply.send(result).err(),
                None => Some(result),
            };
            if let Some(Err(e)) = undelivered {
                tracing::debug!(%ticket, error = %e, "Command failed with no receiver");
                self.notify(SessionNotice::Error(e));
            }
        }
    }

    fn notify(&self, notice: SessionNotice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}
