//! Camera session lifecycle controller.
//!
//! Sequences backend operations so the backend never sees incompatible
//! requests: any active recording is paused before the pipeline is torn
//! down and resumed only once the new pipeline is live, and commands
//! issued while a bind is unacknowledged are queued and replayed in
//! issuance order.
//!
//! # State machine
//!
//! ```text
//! Unbound ──start_session──▶ Bound/Idle ◀──toggle (stop) / finalize──┐
//!                               │                                    │
//!                          toggle (start)                            │
//!                               ▼                                    │
//!        rebind ack ──▶ Bound/Recording ─────────────────────────────┘
//!             ▲                 │
//!             └── Bound/Paused ◀┘ flip / start_session
//! ```

use super::command::{Command, Completion, Dispatch, Outcome, Ticket};
use super::state::{
    RecordingInfo, RecordingState, SessionCounters, SessionSnapshot, SessionState,
};
use super::SessionError;
use crate::camera::{
    BackendBindError, BackendEvent, BindingId, CameraBackend, FinalizeError, LensFacing,
    OutputTarget, Permission, PermissionProvider, PreviewSink, RecordingHandle, RecordingId,
    RecordingOptions, RecordingStartError, RecordingStats, SessionBinding,
};
use crate::config::SessionConfig;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A recording owned by the controller.
#[derive(Debug)]
struct ActiveRecording {
    handle: RecordingHandle,
    state: RecordingState,
    started_at: DateTime<Utc>,
    confirmed: bool,
    stats: RecordingStats,
}

/// A bind waiting for backend acknowledgement.
#[derive(Debug)]
struct PendingBind {
    /// `None` when this bind restores the previous lens after a failure.
    ticket: Option<Ticket>,
    facing: LensFacing,
    prior_facing: LensFacing,
    /// Whether a binding existed before this bind started.
    had_binding: bool,
    /// Whether the recording must be resumed once the bind is live.
    resume: bool,
}

/// Owns the camera session lifecycle.
///
/// All methods must be called from a single control thread or task; see
/// [`control`](super::control) for the actor that enforces this.
pub struct CameraSessionController<B: CameraBackend, P: PermissionProvider> {
    backend: B,
    permissions: P,
    preview: PreviewSink,
    options: RecordingOptions,
    /// Lens of the current (or pending) binding, or the lens the next
    /// `flip` toggles from.
    facing: LensFacing,
    binding: Option<SessionBinding>,
    pending: Option<PendingBind>,
    recording: Option<ActiveRecording>,
    queue: VecDeque<(Ticket, Command)>,
    next_ticket: u64,
    counters: SessionCounters,
    disposed: bool,
}

impl<B: CameraBackend, P: PermissionProvider> CameraSessionController<B, P> {
    /// Creates an unbound controller with default settings.
    pub fn new(backend: B, permissions: P) -> Self {
        Self::with_config(backend, permissions, &SessionConfig::default())
    }

    /// Creates an unbound controller from session configuration.
    pub fn with_config(backend: B, permissions: P, config: &SessionConfig) -> Self {
        Self {
            backend,
            permissions,
            preview: PreviewSink::new(config.preview_surface.clone()),
            options: RecordingOptions {
                mirror_mode: config.mirror_mode,
                with_audio: config.record_audio,
            },
            facing: config.initial_facing,
            binding: None,
            pending: None,
            recording: None,
            queue: VecDeque::new(),
            next_ticket: 0,
            counters: SessionCounters::default(),
            disposed: false,
        }
    }

    /// Requests the permissions the session needs.
    pub fn request_permission(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;

        let mut required = vec![Permission::Camera];
        if self.options.with_audio {
            required.push(Permission::Microphone);
        }

        for permission in required {
            if !self.permissions.request(permission) {
                tracing::warn!(%permission, "Permission denied");
                return Err(SessionError::PermissionDenied(permission));
            }
        }

        tracing::info!("Camera permissions granted");
        Ok(())
    }

    /// Binds a pipeline for `facing`, replacing any existing one.
    pub fn start_session(&mut self, facing: LensFacing) -> Result<Dispatch, SessionError> {
        self.issue(Command::StartSession(facing))
    }

    /// Switches to the other lens.
    pub fn flip(&mut self) -> Result<Dispatch, SessionError> {
        self.issue(Command::Flip)
    }

    /// Starts a recording into `output`, or stops the active one.
    pub fn toggle_recording(&mut self, output: OutputTarget) -> Result<Dispatch, SessionError> {
        self.issue(Command::ToggleRecording(output))
    }

    /// Issues `command`, queueing it if a bind is still unacknowledged.
    pub fn issue(&mut self, command: Command) -> Result<Dispatch, SessionError> {
        self.ensure_live()?;

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);

        if self.pending.is_some() {
            tracing::debug!(
                %ticket,
                command = command.name(),
                queued = self.queue.len() + 1,
                "Command queued behind pending bind"
            );
            self.queue.push_back((ticket, command));
            return Ok(Dispatch::Pending(ticket));
        }

        self.apply(ticket, command)
    }

    /// Applies a backend notification.
    ///
    /// Returns the completions of any commands that were waiting on a bind
    /// acknowledgement. A recording that finalized with an error is
    /// reported as `Err` after the controller has returned to idle.
    pub fn on_backend_event(
        &mut self,
        event: BackendEvent,
    ) -> Result<Vec<Completion>, SessionError> {
        if let BackendEvent::RecordingFinalized { recording, error } = event {
            return self.finalize(recording, error).map(|()| Vec::new());
        }

        if self.disposed {
            tracing::debug!(?event, "Ignoring backend event after dispose");
            return Ok(Vec::new());
        }

        let completions = match event {
            BackendEvent::BindAcknowledged { binding } => self.acknowledge(binding),
            BackendEvent::BindRejected { binding, error } => self.reject(binding, error),
            BackendEvent::RecordingStarted { recording } => {
                match self.recording_mut(recording) {
                    Some(active) => {
                        active.confirmed = true;
                        tracing::info!(%recording, "Recording started");
                    }
                    None => tracing::debug!(%recording, "Start event for inactive recording"),
                }
                Vec::new()
            }
            BackendEvent::RecordingStatus { recording, stats } => {
                if let Some(active) = self.recording_mut(recording) {
                    active.stats = stats;
                    tracing::trace!(
                        %recording,
                        bytes = stats.recorded_bytes,
                        duration_ms = stats.duration.as_millis() as u64,
                        "Recording status"
                    );
                }
                Vec::new()
            }
            BackendEvent::RecordingFinalized { .. } => Vec::new(),
        };

        Ok(completions)
    }

    /// Stops any active recording and releases the binding.
    ///
    /// Queued and pending commands complete with [`SessionError::Disposed`].
    /// Calling this more than once is a no-op.
    pub fn dispose(&mut self) -> Vec<Completion> {
        if self.disposed {
            return Vec::new();
        }
        self.disposed = true;

        if let Some(active) = self.recording.take() {
            self.backend.stop(&active.handle);
            self.counters.recordings_stopped += 1;
            tracing::info!(recording = %active.handle.id(), "Recording stopped on dispose");
        }
        if let Some(binding) = self.binding.take() {
            self.backend.unbind(&binding);
        }

        let mut completions = Vec::new();
        if let Some(PendingBind {
            ticket: Some(ticket),
            ..
        }) = self.pending.take()
        {
            completions.push(Completion {
                ticket,
                result: Err(SessionError::Disposed),
            });
        }
        completions.extend(self.queue.drain(..).map(|(ticket, _)| Completion {
            ticket,
            result: Err(SessionError::Disposed),
        }));

        tracing::info!(abandoned = completions.len(), "Camera session disposed");
        completions
    }

    /// Lens of the current binding, or the lens last requested.
    pub fn facing(&self) -> LensFacing {
        self.facing
    }

    /// Binding and recording state.
    pub fn state(&self) -> SessionState {
        let recording = self.recording_state();
        match (&self.binding, &self.pending) {
            (None, _) => SessionState::Unbound,
            (Some(_), Some(_)) => SessionState::Binding(recording),
            (Some(_), None) => SessionState::Bound(recording),
        }
    }

    /// State of the active recording, `Idle` if there is none.
    pub fn recording_state(&self) -> RecordingState {
        self.recording
            .as_ref()
            .map_or(RecordingState::Idle, |active| active.state)
    }

    /// The current binding, if any.
    pub fn binding(&self) -> Option<&SessionBinding> {
        self.binding.as_ref()
    }

    /// Commands waiting on a bind acknowledgement.
    pub fn queued_commands(&self) -> usize {
        self.queue.len()
    }

    /// Running totals since creation.
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// True once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The backend, for inspection.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Point-in-time view for the UI or metrics.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            facing: self.facing,
            state: self.state(),
            recording: self.recording.as_ref().map(|active| RecordingInfo {
                id: active.handle.id(),
                output: active.handle.output().to_path_buf(),
                started_at: active.started_at,
                confirmed: active.confirmed,
                stats: active.stats,
            }),
            queued_commands: self.queue.len(),
            counters: self.counters,
            disposed: self.disposed,
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        Ok(())
    }

    fn apply(&mut self, ticket: Ticket, command: Command) -> Result<Dispatch, SessionError> {
        match command {
            Command::StartSession(facing) => self.rebind(ticket, facing),
            Command::Flip => {
                let next = self.facing.flipped();
                tracing::debug!(from = %self.facing, to = %next, "Flipping lens");
                self.rebind(ticket, next)
            }
            Command::ToggleRecording(output) => self.toggle(output).map(Dispatch::Done),
        }
    }

    /// Pause, unbind, bind, resume.
    fn rebind(&mut self, ticket: Ticket, facing: LensFacing) -> Result<Dispatch, SessionError> {
        let resume = self.pause_recording();
        let prior_facing = self.facing;
        let had_binding = self.release_binding();

        match self.backend.bind(facing, &self.preview) {
            Ok(binding) => {
                self.facing = facing;
                if binding.is_ready() {
                    self.binding = Some(binding);
                    self.complete_bind(resume);
                    return Ok(Dispatch::Done(Outcome::Bound(facing)));
                }

                tracing::debug!(%ticket, %facing, id = %binding.id(), "Awaiting bind acknowledgement");
                self.binding = Some(binding);
                self.pending = Some(PendingBind {
                    ticket: Some(ticket),
                    facing,
                    prior_facing,
                    had_binding,
                    resume,
                });
                Ok(Dispatch::Pending(ticket))
            }
            Err(source) => {
                self.counters.bind_failures += 1;
                tracing::warn!(%facing, error = %source, "Bind failed, restoring previous lens");
                self.restore(prior_facing, had_binding, resume);
                Err(SessionError::BackendBind { facing, source })
            }
        }
    }

    /// Pauses the active recording. Returns true if one exists.
    fn pause_recording(&mut self) -> bool {
        match self.recording.as_mut() {
            Some(active) => {
                self.backend.pause(&active.handle);
                active.state = RecordingState::Paused;
                tracing::debug!(recording = %active.handle.id(), "Recording paused for rebind");
                true
            }
            None => false,
        }
    }

    /// Unbinds the current pipeline. Returns true if one existed.
    fn release_binding(&mut self) -> bool {
        match self.binding.take() {
            Some(binding) => {
                self.backend.unbind(&binding);
                true
            }
            None => false,
        }
    }

    fn complete_bind(&mut self, resume: bool) {
        self.counters.binds += 1;
        if resume {
            if let Some(active) = self.recording.as_mut() {
                self.backend.resume(&active.handle);
                active.state = RecordingState::Recording;
                tracing::debug!(recording = %active.handle.id(), "Recording resumed after rebind");
            }
        }
        tracing::info!(facing = %self.facing, "Camera session bound");
    }

    /// Rebinds `prior_facing` after a failed bind.
    ///
    /// If nothing was bound before, or the restore itself fails, the
    /// session ends up unbound and any recording is stopped.
    fn restore(&mut self, prior_facing: LensFacing, had_binding: bool, resume: bool) {
        self.facing = prior_facing;
        if !had_binding {
            self.abandon_recording();
            return;
        }

        match self.backend.bind(prior_facing, &self.preview) {
            Ok(binding) if binding.is_ready() => {
                self.binding = Some(binding);
                self.complete_bind(resume);
            }
            Ok(binding) => {
                self.binding = Some(binding);
                self.pending = Some(PendingBind {
                    ticket: None,
                    facing: prior_facing,
                    prior_facing,
                    had_binding: false,
                    resume,
                });
            }
            Err(e) => {
                self.counters.bind_failures += 1;
                tracing::error!(facing = %prior_facing, error = %e, "Failed to restore previous lens");
                self.abandon_recording();
            }
        }
    }

    fn abandon_recording(&mut self) {
        if let Some(active) = self.recording.take() {
            self.backend.stop(&active.handle);
            self.counters.recordings_stopped += 1;
            tracing::warn!(recording = %active.handle.id(), "Recording stopped: no camera bound");
        }
    }

    fn toggle(&mut self, output: OutputTarget) -> Result<Outcome, SessionError> {
        if let Some(active) = self.recording.take() {
            self.backend.stop(&active.handle);
            self.counters.recordings_stopped += 1;
            tracing::info!(recording = %active.handle.id(), "Recording stopped");
            return Ok(Outcome::RecordingStopped(active.handle.id()));
        }

        let binding = self
            .binding
            .as_ref()
            .filter(|binding| binding.is_ready())
            .ok_or(RecordingStartError::NotBound)?;

        let handle = self
            .backend
            .start_recording(binding, output, &self.options)
            .map_err(|e| {
                tracing::warn!(error = %e, "Recording start rejected");
                e
            })?;

        let id = handle.id();
        tracing::info!(recording = %id, output = %handle.output().display(), "Recording requested");
        self.recording = Some(ActiveRecording {
            handle,
            state: RecordingState::Recording,
            started_at: Utc::now(),
            confirmed: false,
            stats: RecordingStats::default(),
        });
        self.counters.recordings_started += 1;
        Ok(Outcome::RecordingStarted(id))
    }

    fn acknowledge(&mut self, id: BindingId) -> Vec<Completion> {
        if !self.is_pending(id) {
            tracing::warn!(%id, "Acknowledgement for unknown binding");
            return Vec::new();
        }
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };

        if let Some(binding) = self.binding.as_mut() {
            binding.mark_ready();
        }
        self.complete_bind(pending.resume);

        let mut completions = Vec::new();
        if let Some(ticket) = pending.ticket {
            completions.push(Completion {
                ticket,
                result: Ok(Outcome::Bound(pending.facing)),
            });
        }
        self.drain_queue(&mut completions);
        completions
    }

    fn reject(&mut self, id: BindingId, error: BackendBindError) -> Vec<Completion> {
        if !self.is_pending(id) {
            tracing::warn!(%id, error = %error, "Rejection for unknown binding");
            return Vec::new();
        }
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };

        self.release_binding();
        self.counters.bind_failures += 1;
        tracing::warn!(facing = %pending.facing, error = %error, "Bind rejected");
        self.restore(pending.prior_facing, pending.had_binding, pending.resume);

        let mut completions = Vec::new();
        if let Some(ticket) = pending.ticket {
            completions.push(Completion {
                ticket,
                result: Err(SessionError::BackendBind {
                    facing: pending.facing,
                    source: error,
                }),
            });
        }
        self.drain_queue(&mut completions);
        completions
    }

    fn is_pending(&self, id: BindingId) -> bool {
        self.pending.is_some() && self.binding.as_ref().map(SessionBinding::id) == Some(id)
    }

    /// Replays queued commands until one has to wait on a bind again.
    fn drain_queue(&mut self, completions: &mut Vec<Completion>) {
        while self.pending.is_none() {
            let Some((ticket, command)) = self.queue.pop_front() else {
                break;
            };
            let result = match self.apply(ticket, command) {
                Ok(Dispatch::Done(outcome)) => Ok(outcome),
                Ok(Dispatch::Pending(_)) => continue,
                Err(e) => Err(e),
            };
            completions.push(Completion { ticket, result });
        }
    }

    fn finalize(
        &mut self,
        recording: RecordingId,
        error: Option<FinalizeError>,
    ) -> Result<(), SessionError> {
        if self.recording_mut(recording).is_some() {
            self.recording = None;
            self.counters.recordings_stopped += 1;
            tracing::info!(%recording, "Recording finalized by backend");
        }

        match error {
            Some(source) => {
                self.counters.finalize_failures += 1;
                tracing::warn!(%recording, error = %source, "Recording finalized with error");
                Err(SessionError::RecordingFinalize { recording, source })
            }
            None => {
                tracing::debug!(%recording, "Recording finalized");
                Ok(())
            }
        }
    }

    fn recording_mut(&mut self, id: RecordingId) -> Option<&mut ActiveRecording> {
        self.recording
            .as_mut()
            .filter(|active| active.handle.id() == id)
    }
}

impl<B: CameraBackend, P: PermissionProvider> Drop for CameraSessionController<B, P> {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{AckMode, BackendCall, CallLog, MockBackend, StaticPermissions};
    use proptest::prelude::*;

    type Controller = CameraSessionController<MockBackend, StaticPermissions>;

    fn controller(backend: MockBackend) -> (Controller, CallLog) {
        let log = backend.log();
        (
            CameraSessionController::new(backend, StaticPermissions::granted()),
            log,
        )
    }

    fn output() -> OutputTarget {
        OutputTarget::file("/tmp/video.mp4")
    }

    fn started_recording(dispatch: Dispatch) -> RecordingId {
        match dispatch {
            Dispatch::Done(Outcome::RecordingStarted(id)) => id,
            other => panic!("expected a started recording, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_record_flip_scenario() {
        let (mut session, log) = controller(MockBackend::new());
        assert_eq!(session.state(), SessionState::Unbound);

        let dispatch = session.start_session(LensFacing::Back).unwrap();
        assert_eq!(dispatch.outcome(), Some(Outcome::Bound(LensFacing::Back)));
        assert_eq!(dispatch.ticket(), None);
        assert_eq!(session.state(), SessionState::Bound(RecordingState::Idle));
        let back = log.last_binding().unwrap();

        let recording = started_recording(session.toggle_recording(output()).unwrap());
        assert_eq!(
            session.state(),
            SessionState::Bound(RecordingState::Recording)
        );

        let before = log.len();
        session.flip().unwrap();
        let front = log.last_binding().unwrap();

        assert_eq!(
            log.calls_since(before),
            vec![
                BackendCall::Pause(recording),
                BackendCall::Unbind {
                    binding: back,
                    facing: LensFacing::Back
                },
                BackendCall::Bind {
                    facing: LensFacing::Front,
                    binding: Some(front)
                },
                BackendCall::Resume(recording),
            ]
        );
        assert_eq!(
            session.state(),
            SessionState::Bound(RecordingState::Recording)
        );
        assert_eq!(session.facing(), LensFacing::Front);
    }

    #[test]
    fn test_toggle_twice_issues_one_start_and_one_stop() {
        let (mut session, log) = controller(MockBackend::new());
        session.start_session(LensFacing::Back).unwrap();

        session.toggle_recording(output()).unwrap();
        let stopped = session.toggle_recording(output()).unwrap();

        assert!(matches!(
            stopped,
            Dispatch::Done(Outcome::RecordingStopped(_))
        ));
        assert_eq!(session.recording_state(), RecordingState::Idle);
        assert_eq!(
            log.count(|c| matches!(c, BackendCall::StartRecording { .. })),
            1
        );
        assert_eq!(log.count(|c| matches!(c, BackendCall::Stop(_))), 1);
    }

    #[test]
    fn test_flip_bind_failure_rolls_back() {
        let (mut session, log) = controller(MockBackend::new().without_lens(LensFacing::Front));
        session.start_session(LensFacing::Back).unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        let err = session.flip().unwrap_err();
        assert_eq!(
            err,
            SessionError::BackendBind {
                facing: LensFacing::Front,
                source: BackendBindError::UnsupportedLens(LensFacing::Front),
            }
        );

        assert_eq!(session.facing(), LensFacing::Back);
        assert_eq!(
            session.state(),
            SessionState::Bound(RecordingState::Recording)
        );
        assert_eq!(session.snapshot().recording.unwrap().id, recording);
        assert_eq!(session.binding().unwrap().facing(), LensFacing::Back);
        assert_eq!(log.count(|c| matches!(c, BackendCall::Stop(_))), 0);
        assert_eq!(log.live_bindings().len(), 1);
    }

    #[test]
    fn test_initial_bind_failure_stays_unbound() {
        let (mut session, log) = controller(MockBackend::new().without_lens(LensFacing::Back));

        let err = session.start_session(LensFacing::Back).unwrap_err();
        assert!(matches!(err, SessionError::BackendBind { .. }));
        assert_eq!(session.state(), SessionState::Unbound);
        assert!(log.live_bindings().is_empty());

        // Caller retries with the other lens.
        session.start_session(LensFacing::Front).unwrap();
        assert_eq!(session.state(), SessionState::Bound(RecordingState::Idle));
    }

    #[test]
    fn test_failed_restore_stops_recording() {
        let (mut session, log) = controller(MockBackend::new().failing_after(1));
        session.start_session(LensFacing::Back).unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        assert!(session.flip().is_err());
        assert_eq!(session.state(), SessionState::Unbound);
        assert_eq!(session.recording_state(), RecordingState::Idle);
        assert_eq!(log.count(|c| *c == BackendCall::Stop(recording)), 1);
    }

    #[test]
    fn test_record_without_binding_fails() {
        let (mut session, log) = controller(MockBackend::new());
        let err = session.toggle_recording(output()).unwrap_err();
        assert_eq!(
            err,
            SessionError::RecordingStart(RecordingStartError::NotBound)
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_rejected_output_keeps_session_bound() {
        let (mut session, _log) = controller(MockBackend::new().rejecting_outputs());
        session.start_session(LensFacing::Back).unwrap();

        let err = session.toggle_recording(output()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::RecordingStart(RecordingStartError::OutputRejected(_))
        ));
        assert_eq!(session.state(), SessionState::Bound(RecordingState::Idle));
    }

    #[test]
    fn test_rebind_same_facing_still_pauses() {
        let (mut session, log) = controller(MockBackend::new());
        session.start_session(LensFacing::Back).unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        session.start_session(LensFacing::Back).unwrap();
        assert_eq!(log.count(|c| *c == BackendCall::Pause(recording)), 1);
        assert_eq!(log.count(|c| *c == BackendCall::Resume(recording)), 1);
    }

    #[test]
    fn test_finalize_events() {
        let (mut session, _log) = controller(MockBackend::new());
        session.start_session(LensFacing::Back).unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        session
            .on_backend_event(BackendEvent::RecordingStarted { recording })
            .unwrap();
        assert!(session.snapshot().recording.unwrap().confirmed);

        let err = session
            .on_backend_event(BackendEvent::RecordingFinalized {
                recording,
                error: Some(FinalizeError::InsufficientStorage),
            })
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::RecordingFinalize {
                recording,
                source: FinalizeError::InsufficientStorage,
            }
        );
        assert_eq!(session.state(), SessionState::Bound(RecordingState::Idle));
        assert_eq!(session.counters().finalize_failures, 1);

        // Session stays usable after a finalize failure.
        let next = started_recording(session.toggle_recording(output()).unwrap());
        session
            .on_backend_event(BackendEvent::RecordingFinalized {
                recording: next,
                error: None,
            })
            .unwrap();
        assert_eq!(session.recording_state(), RecordingState::Idle);
    }

    #[test]
    fn test_status_updates_stats() {
        let (mut session, _log) = controller(MockBackend::new());
        session.start_session(LensFacing::Back).unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        let stats = RecordingStats {
            recorded_bytes: 4096,
            duration: std::time::Duration::from_millis(1500),
        };
        session
            .on_backend_event(BackendEvent::RecordingStatus { recording, stats })
            .unwrap();
        assert_eq!(session.snapshot().recording.unwrap().stats, stats);
    }

    #[test]
    fn test_commands_queue_until_bind_acknowledged() {
        let (mut session, log) = controller(MockBackend::new().with_ack_mode(AckMode::Manual));

        let start = session.start_session(LensFacing::Back).unwrap();
        let flip = session.flip().unwrap();
        let record = session.toggle_recording(output()).unwrap();
        assert!(start.ticket().is_some() && flip.ticket().is_some() && record.ticket().is_some());
        assert_eq!(start.outcome(), None);
        assert_eq!(session.state(), SessionState::Binding(RecordingState::Idle));
        assert_eq!(session.queued_commands(), 2);
        assert_eq!(log.len(), 1);

        let back = log.last_binding().unwrap();
        let done = session
            .on_backend_event(BackendEvent::BindAcknowledged { binding: back })
            .unwrap();
        assert_eq!(
            done,
            vec![Completion {
                ticket: start.ticket().unwrap(),
                result: Ok(Outcome::Bound(LensFacing::Back)),
            }]
        );
        // The flip is now in flight; the recording is still queued.
        assert_eq!(session.queued_commands(), 1);

        let front = log.last_binding().unwrap();
        let done = session
            .on_backend_event(BackendEvent::BindAcknowledged { binding: front })
            .unwrap();
        assert_eq!(done.len(), 2);
        assert_eq!(done[0].ticket, flip.ticket().unwrap());
        assert_eq!(done[0].result, Ok(Outcome::Bound(LensFacing::Front)));
        assert_eq!(done[1].ticket, record.ticket().unwrap());
        assert!(matches!(done[1].result, Ok(Outcome::RecordingStarted(_))));

        assert_eq!(session.facing(), LensFacing::Front);
        assert_eq!(
            session.state(),
            SessionState::Bound(RecordingState::Recording)
        );
    }

    #[test]
    fn test_pending_flip_keeps_recording_paused() {
        let (mut session, log) = controller(MockBackend::new().with_ack_mode(AckMode::Manual));
        session.start_session(LensFacing::Back).unwrap();
        session
            .on_backend_event(BackendEvent::BindAcknowledged {
                binding: log.last_binding().unwrap(),
            })
            .unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        session.flip().unwrap();
        assert_eq!(session.state(), SessionState::Binding(RecordingState::Paused));
        assert_eq!(log.count(|c| *c == BackendCall::Resume(recording)), 0);

        session
            .on_backend_event(BackendEvent::BindAcknowledged {
                binding: log.last_binding().unwrap(),
            })
            .unwrap();
        assert_eq!(
            session.state(),
            SessionState::Bound(RecordingState::Recording)
        );
        assert_eq!(log.count(|c| *c == BackendCall::Resume(recording)), 1);
    }

    #[test]
    fn test_rejected_pending_flip_restores_previous_lens() {
        let (mut session, log) = controller(MockBackend::new().with_ack_mode(AckMode::Manual));
        session.start_session(LensFacing::Back).unwrap();
        session
            .on_backend_event(BackendEvent::BindAcknowledged {
                binding: log.last_binding().unwrap(),
            })
            .unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        let flip = session.flip().unwrap();
        let front = log.last_binding().unwrap();
        let done = session
            .on_backend_event(BackendEvent::BindRejected {
                binding: front,
                error: BackendBindError::Rejected("stream config".into()),
            })
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].ticket, flip.ticket().unwrap());
        assert!(matches!(
            done[0].result,
            Err(SessionError::BackendBind {
                facing: LensFacing::Front,
                ..
            })
        ));

        // The restore bind is itself pending.
        assert_eq!(session.facing(), LensFacing::Back);
        session
            .on_backend_event(BackendEvent::BindAcknowledged {
                binding: log.last_binding().unwrap(),
            })
            .unwrap();
        assert_eq!(
            session.state(),
            SessionState::Bound(RecordingState::Recording)
        );
        assert_eq!(log.count(|c| *c == BackendCall::Stop(recording)), 0);
        assert_eq!(log.peak_bindings(), 1);
    }

    #[test]
    fn test_stale_acknowledgement_ignored() {
        let (mut session, _log) = controller(MockBackend::new());
        session.start_session(LensFacing::Back).unwrap();
        let done = session
            .on_backend_event(BackendEvent::BindAcknowledged {
                binding: BindingId(99),
            })
            .unwrap();
        assert!(done.is_empty());
        assert_eq!(session.state(), SessionState::Bound(RecordingState::Idle));
    }

    #[test]
    fn test_dispose_releases_everything() {
        let (mut session, log) = controller(MockBackend::new());
        session.start_session(LensFacing::Back).unwrap();
        let recording = started_recording(session.toggle_recording(output()).unwrap());

        session.dispose();
        assert_eq!(log.count(|c| *c == BackendCall::Stop(recording)), 1);
        assert!(log.live_bindings().is_empty());
        assert_eq!(session.state(), SessionState::Unbound);
        assert_eq!(session.flip(), Err(SessionError::Disposed));
    }

    #[test]
    fn test_dispose_fails_queued_commands() {
        let (mut session, _log) = controller(MockBackend::new().with_ack_mode(AckMode::Manual));
        session.start_session(LensFacing::Back).unwrap();
        session.flip().unwrap();

        let abandoned = session.dispose();
        assert_eq!(abandoned.len(), 2);
        assert!(abandoned
            .iter()
            .all(|c| c.result == Err(SessionError::Disposed)));
    }

    #[test]
    fn test_drop_disposes() {
        let backend = MockBackend::new();
        let log = backend.log();
        {
            let mut session = CameraSessionController::new(backend, StaticPermissions::granted());
            session.start_session(LensFacing::Front).unwrap();
        }
        assert!(log.live_bindings().is_empty());
    }

    #[test]
    fn test_permission_denied() {
        let mut session =
            CameraSessionController::new(MockBackend::new(), StaticPermissions::denied());
        assert_eq!(
            session.request_permission(),
            Err(SessionError::PermissionDenied(Permission::Camera))
        );
    }

    #[test]
    fn test_microphone_requested_when_recording_audio() {
        let config = SessionConfig {
            record_audio: true,
            ..Default::default()
        };
        let mut session = CameraSessionController::with_config(
            MockBackend::new(),
            StaticPermissions::denying(Permission::Microphone),
            &config,
        );
        assert_eq!(
            session.request_permission(),
            Err(SessionError::PermissionDenied(Permission::Microphone))
        );
    }

    proptest! {
        #[test]
        fn prop_flips_end_on_last_requested_lens(
            initial_front in any::<bool>(),
            flips in 0usize..12,
            record in any::<bool>(),
        ) {
            let (mut session, log) = controller(MockBackend::new());
            let initial = if initial_front { LensFacing::Front } else { LensFacing::Back };
            session.start_session(initial).unwrap();
            if record {
                session.toggle_recording(output()).unwrap();
            }

            let mut expected = initial;
            for _ in 0..flips {
                expected = expected.flipped();
                session.flip().unwrap();
                prop_assert!(log.live_bindings().len() <= 1);
            }

            prop_assert_eq!(session.facing(), expected);
            prop_assert!(session.state().is_bound());
            prop_assert_eq!(log.peak_bindings(), 1);
            prop_assert_eq!(log.count(|c| matches!(c, BackendCall::Stop(_))), 0);
            if record {
                prop_assert_eq!(session.recording_state(), RecordingState::Recording);
            }
        }
    }
}
