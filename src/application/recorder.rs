//! Recording session controller
//!
//! Runs the recording machine on a single task. User commands, countdown
//! ticks, device-access results and device callbacks all arrive over
//! channels and are applied one at a time, so the machine has exactly one
//! writer. Snapshots are published on a watch channel for the presentation
//! layer.

use std::collections::VecDeque;
use std::future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::domain::recording::{
    AccessId, Duration, Effect, Input, RecorderError, RecordingMachine, RecordingState,
    DEFAULT_COUNTDOWN,
};

use super::ports::{
    AudioCue, CaptureDevice, CaptureError, CaptureEvent, CaptureHandle, CaptureSink,
    DeviceEvent, DeviceLease,
};

/// Controller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Countdown ticks before capture starts
    pub countdown_from: u32,
    /// Time between countdown ticks
    pub tick: Duration,
    /// Stop a capture session automatically after this long
    pub max_duration: Option<Duration>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            countdown_from: DEFAULT_COUNTDOWN,
            tick: Duration::default_tick(),
            max_duration: Some(Duration::default_max_duration()),
        }
    }
}

/// Requests the presentation layer can make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    Start,
    Stop,
    Resume,
    Delete,
    /// Tear the controller down, releasing any device
    Shutdown,
}

/// The controller task has exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Recorder is no longer running")]
pub struct RecorderClosed;

/// Cloneable front door to a running controller
#[derive(Debug, Clone)]
pub struct RecorderHandle {
    commands: mpsc::UnboundedSender<RecorderCommand>,
    state: watch::Receiver<RecordingState>,
}

impl RecorderHandle {
    pub fn start(&self) -> Result<(), RecorderClosed> {
        self.send(RecorderCommand::Start)
    }

    pub fn stop(&self) -> Result<(), RecorderClosed> {
        self.send(RecorderCommand::Stop)
    }

    pub fn resume(&self) -> Result<(), RecorderClosed> {
        self.send(RecorderCommand::Resume)
    }

    pub fn delete(&self) -> Result<(), RecorderClosed> {
        self.send(RecorderCommand::Delete)
    }

    pub fn shutdown(&self) -> Result<(), RecorderClosed> {
        self.send(RecorderCommand::Shutdown)
    }

    pub fn send(&self, command: RecorderCommand) -> Result<(), RecorderClosed> {
        self.commands.send(command).map_err(|_| RecorderClosed)
    }

    /// Latest published snapshot
    pub fn state(&self) -> RecordingState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.state.clone()
    }

    /// Wait until the state satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&RecordingState) -> bool,
    ) -> Result<RecordingState, RecorderClosed> {
        let mut rx = self.state.clone();
        let state = rx.wait_for(predicate).await.map_err(|_| RecorderClosed)?;
        Ok(state.clone())
    }
}

type AccessOutcome = Result<Box<dyn CaptureHandle>, CaptureError>;
type AccessResult = (AccessId, AccessOutcome);

/// Owns the recording machine, the countdown timer and the device lease
pub struct RecordingController<D, A>
where
    D: CaptureDevice + 'static,
    A: AudioCue + 'static,
{
    device: Arc<D>,
    cue: Arc<A>,
    config: RecorderConfig,
    machine: RecordingMachine,
    lease: Option<DeviceLease>,
    /// Handle granted by the device, waiting for the machine's verdict
    granted: Option<Box<dyn CaptureHandle>>,
    countdown: Option<Interval>,
    capture_deadline: Option<Instant>,
    commands: mpsc::UnboundedReceiver<RecorderCommand>,
    access_tx: mpsc::UnboundedSender<AccessResult>,
    access_rx: mpsc::UnboundedReceiver<AccessResult>,
    device_tx: mpsc::UnboundedSender<DeviceEvent>,
    device_rx: mpsc::UnboundedReceiver<DeviceEvent>,
    state_tx: watch::Sender<RecordingState>,
}

impl<D, A> RecordingController<D, A>
where
    D: CaptureDevice + 'static,
    A: AudioCue + 'static,
{
    /// Create a controller and the handle used to drive it.
    /// Nothing happens until [`run`](Self::run) is polled.
    pub fn new(device: D, cue: A, config: RecorderConfig) -> (Self, RecorderHandle) {
        let machine = RecordingMachine::new(config.countdown_from);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (access_tx, access_rx) = mpsc::unbounded_channel();
        let (device_tx, device_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(machine.snapshot());

        let controller = Self {
            device: Arc::new(device),
            cue: Arc::new(cue),
            config,
            machine,
            lease: None,
            granted: None,
            countdown: None,
            capture_deadline: None,
            commands,
            access_tx,
            access_rx,
            device_tx,
            device_rx,
            state_tx,
        };
        let handle = RecorderHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (controller, handle)
    }

    /// Process events until shutdown is requested or every handle is dropped.
    /// Any held device is released before this returns.
    pub async fn run(mut self) {
        info!(
            countdown = self.config.countdown_from,
            tick = %self.config.tick,
            "recorder ready"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(RecorderCommand::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
                Some((access, result)) = self.access_rx.recv() => self.on_access(access, result),
                Some(event) = self.device_rx.recv() => self.on_device_event(event),
                _ = next_tick(&mut self.countdown) => self.dispatch(Input::Tick),
                _ = wait_until(self.capture_deadline) => {
                    self.capture_deadline = None;
                    warn!("maximum recording duration reached, stopping");
                    self.dispatch(Input::Stop);
                }
            }
        }

        self.teardown();
    }

    fn on_command(&mut self, command: RecorderCommand) {
        debug!(?command, status = %self.machine.status(), "command");
        let input = match command {
            RecorderCommand::Start => Input::Start,
            RecorderCommand::Stop => Input::Stop,
            RecorderCommand::Resume => Input::Resume,
            RecorderCommand::Delete => Input::Delete,
            RecorderCommand::Shutdown => Input::Teardown,
        };
        self.dispatch(input);
    }

    fn on_access(&mut self, access: AccessId, result: AccessOutcome) {
        match result {
            Ok(handle) => {
                let format = handle.format();
                debug!(%access, %format, "device granted");
                self.granted = Some(handle);
                self.dispatch(Input::AccessGranted { access, format });
                // Not retained by the machine: close it now
                if let Some(handle) = self.granted.take() {
                    drop(DeviceLease::new(handle));
                }
            }
            Err(err) => {
                debug!(%access, error = %err, "device access failed");
                self.dispatch(Input::AccessFailed {
                    access,
                    error: err.into(),
                });
            }
        }
    }

    fn on_device_event(&mut self, DeviceEvent { session, event }: DeviceEvent) {
        let input = match event {
            CaptureEvent::Data(fragment) => {
                if self.machine.session() != Some(session) {
                    trace!(%session, "dropping fragment from closed session");
                    return;
                }
                Input::Fragment { session, fragment }
            }
            CaptureEvent::Finished => Input::CaptureEnded { session },
            CaptureEvent::Lost(reason) => Input::DeviceLost { session, reason },
        };
        self.dispatch(input);
    }

    /// Apply an input and every follow-up input its effects produce
    fn dispatch(&mut self, input: Input) {
        let before = self.machine.status();
        let mut queue = VecDeque::from([input]);

        while let Some(input) = queue.pop_front() {
            for effect in self.machine.apply(input) {
                if let Some(follow_up) = self.execute(effect) {
                    queue.push_back(follow_up);
                }
            }
        }

        let after = self.machine.status();
        if before != after {
            debug!(from = %before, to = %after, "transition");
        }
        self.publish();
    }

    fn execute(&mut self, effect: Effect) -> Option<Input> {
        match effect {
            Effect::RequestAccess(access) => {
                let device = Arc::clone(&self.device);
                let tx = self.access_tx.clone();
                tokio::spawn(async move {
                    let result = device.open().await;
                    // The controller may be gone; a dropped handle closes itself
                    let _ = tx.send((access, result));
                });
            }
            Effect::RetainDevice => {
                if let Some(handle) = self.granted.take() {
                    self.lease = Some(DeviceLease::new(handle));
                }
            }
            Effect::DiscardDevice => {
                if let Some(handle) = self.granted.take() {
                    debug!("closing device granted after cancellation");
                    drop(DeviceLease::new(handle));
                }
            }
            Effect::StartCountdown => {
                let period = self.config.tick.as_std();
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.countdown = Some(ticker);
            }
            Effect::StopCountdown => self.countdown = None,
            Effect::BeginCapture(session) => {
                let Some(lease) = self.lease.as_mut() else {
                    return Some(Input::CaptureFailed {
                        session,
                        error: RecorderError::CaptureFailed("no device held".to_string()),
                    });
                };
                let sink = CaptureSink::new(session, self.device_tx.clone());
                if let Err(err) = lease.start(sink) {
                    return Some(Input::CaptureFailed {
                        session,
                        error: err.into(),
                    });
                }
                self.capture_deadline = self
                    .config
                    .max_duration
                    .map(|limit| Instant::now() + limit.as_std());
                debug!(%session, "capture started");
            }
            Effect::EndCapture(session) => {
                self.capture_deadline = None;
                if let Some(lease) = self.lease.as_mut() {
                    debug!(%session, "stopping capture");
                    lease.stop();
                }
            }
            Effect::ReleaseDevice => {
                self.capture_deadline = None;
                if self.lease.take().is_some() {
                    debug!("device released");
                }
            }
            Effect::Cue(cue) => {
                let player = Arc::clone(&self.cue);
                tokio::spawn(async move {
                    if let Err(err) = player.play(cue).await {
                        debug!(?cue, error = %err, "audio cue failed");
                    }
                });
            }
            Effect::ReportError(err) => warn!(error = %err, "recorder error"),
        }
        None
    }

    fn publish(&self) {
        let snapshot = self.machine.snapshot();
        self.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    fn teardown(&mut self) {
        self.dispatch(Input::Teardown);
        self.countdown = None;
        self.capture_deadline = None;
        self.lease = None;
        self.granted = None;
        info!("recorder shut down");
    }
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => future::pending::<()>().await,
    }
}
