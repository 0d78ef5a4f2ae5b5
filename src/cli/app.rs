//! Interactive recording session

use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::application::ports::{ConfigStore, Playback};
use crate::application::{RecorderConfig, RecorderHandle, RecordingController};
use crate::domain::config::AppConfig;
use crate::domain::recording::{Duration, RecordingState, RecordingStatus};
use crate::infrastructure::{create_audio_cue, list_input_devices, CpalCapture, RodioPlayback};

use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

const IDLE_KEYS: &[(&str, &str)] = &[("s", "start"), ("q", "quit")];
const COUNTDOWN_KEYS: &[(&str, &str)] = &[("d", "cancel"), ("q", "quit")];
const RECORDING_KEYS: &[(&str, &str)] = &[("x", "stop"), ("d", "delete"), ("q", "quit")];
const STOPPED_KEYS: &[(&str, &str)] = &[
    ("p", "play"),
    ("r", "resume"),
    ("d", "delete"),
    ("q", "quit"),
];

/// Resolved settings for an interactive session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub recorder: RecorderConfig,
    pub cues: bool,
    pub device: Option<String>,
}

impl SessionOptions {
    /// Validate merged config. Errors are usage errors.
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let countdown_from = match config.countdown {
            Some(0) => return Err("Invalid countdown: must be at least 1".to_string()),
            Some(n) => n,
            None => config.countdown_or_default(),
        };
        let tick = parse_duration("tick", config.tick.as_deref())?
            .unwrap_or_else(Duration::default_tick);
        let max_duration = parse_duration("max-duration", config.max_duration.as_deref())?
            .unwrap_or_else(Duration::default_max_duration);

        Ok(Self {
            recorder: RecorderConfig {
                countdown_from,
                tick,
                max_duration: Some(max_duration),
            },
            cues: config.cues_or_default(),
            device: config.device_name().map(str::to_string),
        })
    }
}

fn parse_duration(name: &str, value: Option<&str>) -> Result<Option<Duration>, String> {
    value
        .map(|s| s.parse::<Duration>())
        .transpose()
        .map_err(|e| format!("Invalid {}: {}", name, e))
}

/// One line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    Start,
    Stop,
    Resume,
    Delete,
    Play,
    Quit,
    Help,
}

impl FromStr for SessionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "start" => Ok(Self::Start),
            "x" | "stop" => Ok(Self::Stop),
            "r" | "resume" => Ok(Self::Resume),
            "d" | "delete" => Ok(Self::Delete),
            "p" | "play" => Ok(Self::Play),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "?" | "h" | "help" => Ok(Self::Help),
            other => Err(format!("Unknown key '{}'. Type ? for help", other)),
        }
    }
}

/// Load config from the store and layer it: defaults < file < cli
pub async fn load_merged_config<S: ConfigStore>(store: &S, cli_config: AppConfig) -> AppConfig {
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, path = %store.path().display(), "ignoring unreadable config");
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// List input devices
pub fn run_devices(presenter: &Presenter) -> ExitCode {
    let devices = list_input_devices();
    if devices.is_empty() {
        presenter.warn("No audio input devices found");
        return ExitCode::from(EXIT_ERROR);
    }
    for device in devices {
        presenter.device(&device.name, device.is_default);
    }
    ExitCode::SUCCESS
}

/// Run the interactive session on stdin until quit, EOF or a signal
pub async fn run_session(options: SessionOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let capture = CpalCapture::new(options.device.clone());
    let cue = create_audio_cue(options.cues);
    let (controller, handle) = RecordingController::new(capture, cue, options.recorder);
    let controller_task = tokio::spawn(controller.run());

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let code = drive_session(
        &handle,
        &RodioPlayback::new(),
        &mut presenter,
        &shutdown,
        lines,
        options.recorder.max_duration,
    )
    .await;

    presenter.stop_spinner();
    let _ = handle.shutdown();
    if let Err(e) = controller_task.await {
        warn!(error = %e, "recorder task ended abnormally");
    }
    ExitCode::from(code)
}

/// Feed input lines to the recorder and render every state change
pub async fn drive_session<P, R>(
    handle: &RecorderHandle,
    playback: &P,
    presenter: &mut Presenter,
    shutdown: &ShutdownSignal,
    mut lines: Lines<R>,
    limit: Option<Duration>,
) -> u8
where
    P: Playback,
    R: AsyncBufRead + Unpin,
{
    let mut states = handle.subscribe();
    let mut view = SessionView::new(limit.map(|d| d.as_std()));
    presenter.hint(IDLE_KEYS);

    let mut progress = interval(StdDuration::from_millis(200));
    progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.wait() => {
                presenter.stop_spinner();
                presenter.info("Interrupted, releasing microphone");
                return EXIT_SUCCESS;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    presenter.error("Recorder stopped unexpectedly");
                    return EXIT_ERROR;
                }
                let state = states.borrow_and_update().clone();
                view.render(state, presenter);
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<SessionKey>() {
                    Ok(SessionKey::Quit) => return EXIT_SUCCESS,
                    Ok(key) => {
                        if !on_key(key, handle, playback, presenter, shutdown).await {
                            return EXIT_ERROR;
                        }
                    }
                    Err(e) => presenter.warn(&e),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    return EXIT_SUCCESS;
                }
                Err(e) => {
                    presenter.error(&format!("Failed to read input: {}", e));
                    return EXIT_ERROR;
                }
            },
            _ = progress.tick(), if view.is_recording() => view.progress(presenter),
        }
    }
}

/// Returns false once the recorder is gone.
///
/// Recorder commands are always sent: the snapshot may lag commands that
/// are still queued, and the recorder ignores the ones that do not apply.
async fn on_key<P: Playback>(
    key: SessionKey,
    handle: &RecorderHandle,
    playback: &P,
    presenter: &mut Presenter,
    shutdown: &ShutdownSignal,
) -> bool {
    let sent = match key {
        SessionKey::Start => handle.start(),
        SessionKey::Stop => handle.stop(),
        SessionKey::Resume => handle.resume(),
        SessionKey::Delete => handle.delete(),
        SessionKey::Play => {
            play(handle, playback, presenter, shutdown).await;
            Ok(())
        }
        SessionKey::Help => {
            presenter.hint(keys_for(&handle.state()));
            Ok(())
        }
        SessionKey::Quit => Ok(()),
    };

    match sent {
        Ok(()) => true,
        Err(e) => {
            presenter.error(&e.to_string());
            false
        }
    }
}

async fn play<P: Playback>(
    handle: &RecorderHandle,
    playback: &P,
    presenter: &Presenter,
    shutdown: &ShutdownSignal,
) {
    let state = handle.state();
    let asset = match state.captured_asset() {
        Some(asset) if state.is_stopped() => asset,
        _ => {
            presenter.warn(&format!("Cannot play while {}", state.status()));
            return;
        }
    };

    presenter.info("Playing...");
    tokio::select! {
        result = playback.play(asset) => match result {
            Ok(()) => presenter.success("Playback finished"),
            Err(e) => presenter.error(&e.to_string()),
        },
        _ = shutdown.wait() => {}
    }
}

fn keys_for(state: &RecordingState) -> &'static [(&'static str, &'static str)] {
    match state.status() {
        RecordingStatus::Idle => IDLE_KEYS,
        RecordingStatus::CountingDown => COUNTDOWN_KEYS,
        RecordingStatus::Recording => RECORDING_KEYS,
        RecordingStatus::Stopped => STOPPED_KEYS,
    }
}

/// Turns snapshot changes into terminal output
struct SessionView {
    last: RecordingState,
    limit: Option<StdDuration>,
    recording_since: Option<Instant>,
}

impl SessionView {
    fn new(limit: Option<StdDuration>) -> Self {
        Self {
            last: RecordingState::default(),
            limit,
            recording_since: None,
        }
    }

    fn is_recording(&self) -> bool {
        self.recording_since.is_some()
    }

    fn progress(&self, presenter: &Presenter) {
        if let Some(since) = self.recording_since {
            presenter.update_recording_progress(since.elapsed(), self.limit);
        }
    }

    fn render(&mut self, next: RecordingState, presenter: &mut Presenter) {
        if let Some(err) = next.error() {
            if self.last.error() != Some(err) {
                presenter.stop_spinner();
                presenter.error(&err.to_string());
            }
        }
        if next.awaiting_device() && !self.last.awaiting_device() {
            presenter.info("Waiting for the microphone...");
        }

        match next.status() {
            RecordingStatus::CountingDown => {
                if next.countdown_remaining() != self.last.countdown_remaining() {
                    if let Some(n) = next.countdown_remaining() {
                        presenter.countdown(n);
                    }
                }
            }
            RecordingStatus::Recording if !self.last.is_recording() => {
                presenter.recording_started();
                self.recording_since = Some(Instant::now());
            }
            RecordingStatus::Stopped if !self.last.is_stopped() => {
                if let Some(asset) = next.captured_asset() {
                    presenter.recording_stopped(asset);
                }
                presenter.hint(STOPPED_KEYS);
            }
            RecordingStatus::Idle if !self.last.is_idle() => {
                presenter.stop_spinner();
                if next.error().is_none() {
                    let message = if self.last.is_counting_down() {
                        "Countdown cancelled"
                    } else {
                        "Recording discarded"
                    };
                    presenter.info(message);
                }
                presenter.hint(IDLE_KEYS);
            }
            _ => {}
        }

        if !next.is_recording() {
            self.recording_since = None;
        }
        self.last = next;
    }
}
