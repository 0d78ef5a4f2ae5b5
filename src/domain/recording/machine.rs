//! Recording state machine
//!
//! The single place where recorder state changes. Every user command,
//! countdown tick and device callback is fed through [`RecordingMachine::apply`],
//! which updates the state and returns the side effects the caller must carry
//! out. The machine itself never touches a device or a timer.
//!
//! State machine:
//!   IDLE -> (device granted) -> COUNTING_DOWN(n)
//!   COUNTING_DOWN(n) -> COUNTING_DOWN(n-1) (tick, n > 1)
//!   COUNTING_DOWN(1) -> RECORDING (tick)
//!   RECORDING -> STOPPED (capture ended / device lost)
//!   STOPPED -> (device granted) -> RECORDING (resume)
//!   any -> IDLE (delete, teardown)

use std::fmt;
use std::mem;

use super::asset::{AudioAsset, Fragment, PcmFormat};
use super::buffer::ChunkBuffer;
use super::state::{RecorderError, RecordingState, RecordingStatus};

/// Number of countdown ticks before capture starts
pub const DEFAULT_COUNTDOWN: u32 = 3;

/// Identifies one device-access request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessId(u64);

impl fmt::Display for AccessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "access#{}", self.0)
    }
}

/// Identifies one capture session; device events carry it so that events
/// from a closed session can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Audible feedback the recorder asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Short beep for every countdown number
    CountdownTick,
    /// Capture has begun
    RecordingStart,
    /// Capture finished and the asset is ready
    RecordingStop,
    /// Recording was thrown away
    RecordingDiscard,
}

/// Everything that can happen to the recorder
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Start,
    Stop,
    Resume,
    Delete,
    Tick,
    AccessGranted { access: AccessId, format: PcmFormat },
    AccessFailed { access: AccessId, error: RecorderError },
    Fragment { session: SessionId, fragment: Fragment },
    CaptureEnded { session: SessionId },
    CaptureFailed { session: SessionId, error: RecorderError },
    DeviceLost { session: SessionId, reason: String },
    Teardown,
}

/// Side effects requested by a transition, in the order they must run
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the capture port for a device
    RequestAccess(AccessId),
    /// Keep the device handle that was just granted
    RetainDevice,
    /// The granted handle is no longer wanted: close it at once
    DiscardDevice,
    StartCountdown,
    StopCountdown,
    /// Start delivering fragments for this session
    BeginCapture(SessionId),
    /// Flush outstanding fragments, then report the end of the session
    EndCapture(SessionId),
    /// Close and drop the held device
    ReleaseDevice,
    Cue(Cue),
    ReportError(RecorderError),
}

#[derive(Debug)]
enum Phase {
    Idle,
    CountingDown {
        remaining: u32,
    },
    Recording {
        session: SessionId,
        buffer: ChunkBuffer,
        stopping: bool,
    },
    Stopped {
        asset: AudioAsset,
    },
}

/// Recorder state plus the bookkeeping needed to reject stale events
#[derive(Debug)]
pub struct RecordingMachine {
    phase: Phase,
    countdown_from: u32,
    /// Outstanding device request (only while idle or stopped)
    pending_access: Option<AccessId>,
    /// A device handle is held (only while counting down or recording)
    device_held: bool,
    format: PcmFormat,
    error: Option<RecorderError>,
    /// Resume was asked for while the last session was still flushing
    resume_queued: bool,
    next_id: u64,
}

impl Default for RecordingMachine {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN)
    }
}

impl RecordingMachine {
    /// Create an idle machine; a countdown of zero is treated as one
    pub fn new(countdown_from: u32) -> Self {
        Self {
            phase: Phase::Idle,
            countdown_from: countdown_from.max(1),
            pending_access: None,
            device_held: false,
            format: PcmFormat::default(),
            error: None,
            resume_queued: false,
            next_id: 1,
        }
    }

    pub fn status(&self) -> RecordingStatus {
        match self.phase {
            Phase::Idle => RecordingStatus::Idle,
            Phase::CountingDown { .. } => RecordingStatus::CountingDown,
            Phase::Recording { .. } => RecordingStatus::Recording,
            Phase::Stopped { .. } => RecordingStatus::Stopped,
        }
    }

    pub fn countdown_from(&self) -> u32 {
        self.countdown_from
    }

    pub fn pending_access(&self) -> Option<AccessId> {
        self.pending_access
    }

    /// Session currently accepting fragments
    pub fn session(&self) -> Option<SessionId> {
        match self.phase {
            Phase::Recording { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn device_held(&self) -> bool {
        self.device_held
    }

    /// Build the read-only snapshot for the presentation layer
    pub fn snapshot(&self) -> RecordingState {
        let (countdown_remaining, captured_asset) = match &self.phase {
            Phase::CountingDown { remaining } => (Some(*remaining), None),
            Phase::Stopped { asset } => (None, Some(asset.clone())),
            Phase::Idle | Phase::Recording { .. } => (None, None),
        };

        RecordingState {
            status: self.status(),
            countdown_remaining,
            captured_asset,
            awaiting_device: self.pending_access.is_some(),
            error: self.error.clone(),
        }
    }

    /// Apply one input and return the effects to execute.
    /// Inputs that make no sense in the current state are ignored.
    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Start => self.start(),
            Input::Stop => self.stop(),
            Input::Resume => self.resume(),
            Input::Delete => self.delete(),
            Input::Tick => self.tick(),
            Input::AccessGranted { access, format } => self.access_granted(access, format),
            Input::AccessFailed { access, error } => self.access_failed(access, error),
            Input::Fragment { session, fragment } => {
                self.fragment(session, fragment);
                Vec::new()
            }
            Input::CaptureEnded { session } => self.capture_ended(session),
            Input::CaptureFailed { session, error } => self.capture_failed(session, error),
            Input::DeviceLost { session, reason } => self.device_lost(session, reason),
            Input::Teardown => self.teardown(),
        }
    }

    fn next_access(&mut self) -> AccessId {
        let id = AccessId(self.next_id);
        self.next_id += 1;
        id
    }

    fn next_session(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        id
    }

    fn start(&mut self) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Idle) || self.pending_access.is_some() {
            return Vec::new();
        }
        let access = self.next_access();
        self.pending_access = Some(access);
        self.error = None;
        vec![Effect::RequestAccess(access)]
    }

    fn resume(&mut self) -> Vec<Effect> {
        if matches!(self.phase, Phase::Recording { stopping: true, .. }) {
            self.resume_queued = true;
            return Vec::new();
        }
        if !matches!(self.phase, Phase::Stopped { .. }) || self.pending_access.is_some() {
            return Vec::new();
        }
        let access = self.next_access();
        self.pending_access = Some(access);
        self.error = None;
        vec![Effect::RequestAccess(access)]
    }

    fn access_granted(&mut self, access: AccessId, format: PcmFormat) -> Vec<Effect> {
        if self.pending_access != Some(access) {
            return vec![Effect::DiscardDevice];
        }
        self.pending_access = None;

        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                self.device_held = true;
                self.format = format;
                self.phase = Phase::CountingDown {
                    remaining: self.countdown_from,
                };
                vec![
                    Effect::RetainDevice,
                    Effect::StartCountdown,
                    Effect::Cue(Cue::CountdownTick),
                ]
            }
            Phase::Stopped { asset } => {
                let mut effects = vec![Effect::RetainDevice];
                // A device that comes back with a different layout cannot be
                // appended to the old bytes; that recording starts over.
                let buffer = if asset.format() == format || asset.is_empty() {
                    ChunkBuffer::continuing(&asset)
                } else {
                    let error = RecorderError::FormatChanged {
                        previous: asset.format(),
                        current: format,
                    };
                    self.error = Some(error.clone());
                    effects.push(Effect::ReportError(error));
                    ChunkBuffer::new()
                };
                self.device_held = true;
                self.format = format;
                let session = self.next_session();
                self.phase = Phase::Recording {
                    session,
                    buffer,
                    stopping: false,
                };
                effects.push(Effect::BeginCapture(session));
                effects.push(Effect::Cue(Cue::RecordingStart));
                effects
            }
            other => {
                self.phase = other;
                vec![Effect::DiscardDevice]
            }
        }
    }

    fn access_failed(&mut self, access: AccessId, error: RecorderError) -> Vec<Effect> {
        if self.pending_access != Some(access) {
            return Vec::new();
        }
        self.pending_access = None;
        self.error = Some(error.clone());
        vec![Effect::ReportError(error)]
    }

    fn tick(&mut self) -> Vec<Effect> {
        let remaining = match self.phase {
            Phase::CountingDown { remaining } => remaining,
            _ => return Vec::new(),
        };

        if remaining > 1 {
            self.phase = Phase::CountingDown {
                remaining: remaining - 1,
            };
            return vec![Effect::Cue(Cue::CountdownTick)];
        }

        let session = self.next_session();
        self.phase = Phase::Recording {
            session,
            buffer: ChunkBuffer::new(),
            stopping: false,
        };
        vec![
            Effect::StopCountdown,
            Effect::BeginCapture(session),
            Effect::Cue(Cue::RecordingStart),
        ]
    }

    fn fragment(&mut self, from: SessionId, fragment: Fragment) {
        if let Phase::Recording {
            session, buffer, ..
        } = &mut self.phase
        {
            if *session == from {
                buffer.push(fragment);
            }
        }
    }

    fn stop(&mut self) -> Vec<Effect> {
        match &mut self.phase {
            Phase::Recording {
                session, stopping, ..
            } if !*stopping => {
                *stopping = true;
                vec![Effect::EndCapture(*session)]
            }
            _ => Vec::new(),
        }
    }

    /// Move the current session's buffer into the stopped state.
    /// Returns false when `from` is not the active session.
    fn finalize(&mut self, from: SessionId) -> bool {
        if self.session() != Some(from) {
            return false;
        }
        if let Phase::Recording { buffer, .. } = mem::replace(&mut self.phase, Phase::Idle) {
            self.phase = Phase::Stopped {
                asset: buffer.finalize(self.format),
            };
        }
        self.device_held = false;
        true
    }

    fn finalize_without_resume(&mut self, from: SessionId) -> bool {
        let finalized = self.finalize(from);
        if finalized {
            self.resume_queued = false;
        }
        finalized
    }

    fn capture_ended(&mut self, session: SessionId) -> Vec<Effect> {
        if !self.finalize(session) {
            return Vec::new();
        }
        let mut effects = vec![Effect::ReleaseDevice, Effect::Cue(Cue::RecordingStop)];
        if mem::take(&mut self.resume_queued) {
            effects.extend(self.resume());
        }
        effects
    }

    fn device_lost(&mut self, session: SessionId, reason: String) -> Vec<Effect> {
        if !self.finalize_without_resume(session) {
            return Vec::new();
        }
        let error = RecorderError::DeviceDisconnected(reason);
        self.error = Some(error.clone());
        vec![Effect::ReleaseDevice, Effect::ReportError(error)]
    }

    fn capture_failed(&mut self, session: SessionId, error: RecorderError) -> Vec<Effect> {
        if !self.finalize_without_resume(session) {
            return Vec::new();
        }
        // Nothing was captured and nothing was carried over: back to idle.
        if matches!(&self.phase, Phase::Stopped { asset } if asset.is_empty()) {
            self.phase = Phase::Idle;
        }
        self.error = Some(error.clone());
        vec![Effect::ReleaseDevice, Effect::ReportError(error)]
    }

    /// Effects that unwind whatever is currently held
    fn release_all(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if matches!(self.phase, Phase::CountingDown { .. }) {
            effects.push(Effect::StopCountdown);
        }
        if self.device_held {
            effects.push(Effect::ReleaseDevice);
        }
        self.phase = Phase::Idle;
        self.pending_access = None;
        self.device_held = false;
        self.resume_queued = false;
        effects
    }

    fn delete(&mut self) -> Vec<Effect> {
        if matches!(self.phase, Phase::Idle) {
            // Cancels an in-flight start; the late grant gets discarded.
            self.pending_access = None;
            return Vec::new();
        }
        let mut effects = self.release_all();
        effects.push(Effect::Cue(Cue::RecordingDiscard));
        effects
    }

    fn teardown(&mut self) -> Vec<Effect> {
        self.release_all()
    }
}
