//! Scripted camera backend for tests and the demo CLI.
//!
//! Records every call it receives in a shared [`CallLog`] so callers can
//! assert on the exact command sequence the controller issued.

use super::{
    BackendBindError, BackendEvent, BindingId, CameraBackend, FinalizeError, LensFacing,
    OutputTarget, PreviewSink, RecordingHandle, RecordingId, RecordingOptions,
    RecordingStartError, SessionBinding,
};
use crate::session::EventSink;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A backend call as observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `binding` is `None` when the bind was refused.
    Bind {
        /// Requested lens.
        facing: LensFacing,
        /// Handed-out binding.
        binding: Option<BindingId>,
    },
    /// `unbind` for a binding.
    Unbind {
        /// Released binding.
        binding: BindingId,
        /// Lens the binding was made for.
        facing: LensFacing,
    },
    /// `recording` is `None` when the start was refused.
    StartRecording {
        /// Binding the recording was started on.
        binding: BindingId,
        /// `None` when the output was rejected.
        recording: Option<RecordingId>,
        /// Requested output path.
        output: PathBuf,
    },
    /// `pause` for a recording.
    Pause(RecordingId),
    /// `resume` for a recording.
    Resume(RecordingId),
    /// `stop` for a recording.
    Stop(RecordingId),
}

#[derive(Debug, Default)]
struct LogInner {
    calls: Vec<BackendCall>,
    live_bindings: Vec<BindingId>,
    peak_bindings: usize,
}

/// Shared, cloneable record of backend calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<LogInner>>,
}

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, call: BackendCall) {
        let mut inner = self.lock();
        match &call {
            BackendCall::Bind {
                binding: Some(id), ..
            } => {
                inner.live_bindings.push(*id);
                inner.peak_bindings = inner.peak_bindings.max(inner.live_bindings.len());
            }
            BackendCall::Unbind { binding, .. } => {
                inner.live_bindings.retain(|live| live != binding);
            }
            _ => {}
        }
        inner.calls.push(call);
    }

    /// Returns a copy of all calls so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Returns the calls recorded after the first `skip`.
    pub fn calls_since(&self, skip: usize) -> Vec<BackendCall> {
        self.lock().calls.iter().skip(skip).cloned().collect()
    }

    /// Number of calls so far.
    pub fn len(&self) -> usize {
        self.lock().calls.len()
    }

    /// True if no call has been made.
    pub fn is_empty(&self) -> bool {
        self.lock().calls.is_empty()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Bindings handed out and not yet released.
    pub fn live_bindings(&self) -> Vec<BindingId> {
        self.lock().live_bindings.clone()
    }

    /// Highest number of simultaneously live bindings ever observed.
    pub fn peak_bindings(&self) -> usize {
        self.lock().peak_bindings
    }

    /// Id of the most recent successful bind.
    pub fn last_binding(&self) -> Option<BindingId> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            BackendCall::Bind {
                binding: Some(id), ..
            } => Some(*id),
            _ => None,
        })
    }
}

/// How [`MockBackend`] acknowledges binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    /// `bind` returns a ready binding.
    #[default]
    Immediate,
    /// `bind` returns a pending binding and posts the acknowledgement to the
    /// event sink right away.
    Posted,
    /// `bind` returns a pending binding; the caller delivers the
    /// acknowledgement.
    Manual,
}

/// In-memory camera backend.
#[derive(Debug, Default)]
pub struct MockBackend {
    log: CallLog,
    ack_mode: AckMode,
    unsupported: Vec<LensFacing>,
    binds_before_failure: Option<usize>,
    reject_outputs: bool,
    finalize_error: Option<FinalizeError>,
    sink: Option<EventSink>,
    next_binding: u64,
    next_recording: u64,
}

impl MockBackend {
    /// Creates a backend that binds every lens immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how binds are acknowledged.
    pub fn with_ack_mode(mut self, mode: AckMode) -> Self {
        self.ack_mode = mode;
        self
    }

    /// Refuses to bind `facing`.
    pub fn without_lens(mut self, facing: LensFacing) -> Self {
        self.unsupported.push(facing);
        self
    }

    /// Refuses every bind after the first `count` successful ones.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.binds_before_failure = Some(count);
        self
    }

    /// Refuses every output target.
    pub fn rejecting_outputs(mut self) -> Self {
        self.reject_outputs = true;
        self
    }

    /// Reports `error` when a recording finalizes.
    pub fn finalizing_with(mut self, error: FinalizeError) -> Self {
        self.finalize_error = Some(error);
        self
    }

    /// Posts recording lifecycle events to `sink`.
    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Handle to the call log, valid after the backend is moved.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn post(&self, event: BackendEvent) {
        if let Some(sink) = &self.sink {
            sink.post(event);
        }
    }

    fn check_bind(&self, facing: LensFacing) -> Result<(), BackendBindError> {
        if self.unsupported.contains(&facing) {
            return Err(BackendBindError::UnsupportedLens(facing));
        }
        if let Some(limit) = self.binds_before_failure {
            if self.next_binding as usize >= limit {
                return Err(BackendBindError::ProviderUnavailable(
                    "camera provider disconnected".into(),
                ));
            }
        }
        Ok(())
    }
}

impl CameraBackend for MockBackend {
    fn bind(
        &mut self,
        facing: LensFacing,
        preview: &PreviewSink,
    ) -> Result<SessionBinding, BackendBindError> {
        if let Err(e) = self.check_bind(facing) {
            self.log.push(BackendCall::Bind {
                facing,
                binding: None,
            });
            tracing::debug!(%facing, error = %e, "MockBackend refused bind");
            return Err(e);
        }

        self.next_binding += 1;
        let id = BindingId(self.next_binding);
        self.log.push(BackendCall::Bind {
            facing,
            binding: Some(id),
        });
        tracing::debug!(%facing, %id, surface = preview.surface(), "MockBackend bound");

        match self.ack_mode {
            AckMode::Immediate => Ok(SessionBinding::ready(id, facing)),
            AckMode::Posted => {
                self.post(BackendEvent::BindAcknowledged { binding: id });
                Ok(SessionBinding::pending(id, facing))
            }
            AckMode::Manual => Ok(SessionBinding::pending(id, facing)),
        }
    }

    fn unbind(&mut self, binding: &SessionBinding) {
        self.log.push(BackendCall::Unbind {
            binding: binding.id(),
            facing: binding.facing(),
        });
        tracing::debug!(id = %binding.id(), "MockBackend unbound");
    }

    fn start_recording(
        &mut self,
        binding: &SessionBinding,
        output: OutputTarget,
        options: &RecordingOptions,
    ) -> Result<RecordingHandle, RecordingStartError> {
        let path = output.into_path();
        if self.reject_outputs {
            self.log.push(BackendCall::StartRecording {
                binding: binding.id(),
                recording: None,
                output: path.clone(),
            });
            return Err(RecordingStartError::OutputRejected(
                path.display().to_string(),
            ));
        }

        self.next_recording += 1;
        let id = RecordingId(self.next_recording);
        self.log.push(BackendCall::StartRecording {
            binding: binding.id(),
            recording: Some(id),
            output: path.clone(),
        });
        tracing::debug!(
            %id,
            output = %path.display(),
            mirrored = options.mirror_mode.applies_to(binding.facing()),
            audio = options.with_audio,
            "MockBackend started recording"
        );

        self.post(BackendEvent::RecordingStarted { recording: id });
        Ok(RecordingHandle::new(id, path))
    }

    fn pause(&mut self, handle: &RecordingHandle) {
        self.log.push(BackendCall::Pause(handle.id()));
    }

    fn resume(&mut self, handle: &RecordingHandle) {
        self.log.push(BackendCall::Resume(handle.id()));
    }

    fn stop(&mut self, handle: &RecordingHandle) {
        self.log.push(BackendCall::Stop(handle.id()));
        self.post(BackendEvent::RecordingFinalized {
            recording: handle.id(),
            error: self.finalize_error.clone(),
        });
    }
}
