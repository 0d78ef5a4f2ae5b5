//! Microphone capture using cpal
//!
//! `cpal::Stream` is not `Send`, so each open device gets a worker thread
//! that owns the stream for its whole life. The handle talks to the worker
//! over a channel and shares the current sink with the stream callbacks.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::JoinHandle;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tracing::{debug, warn};

use crate::application::ports::{CaptureDevice, CaptureError, CaptureHandle, CaptureSink};
use crate::domain::recording::PcmFormat;

/// Preferred capture rate; speech does not need more
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

type SharedSink = Arc<StdMutex<Option<CaptureSink>>>;

/// An input device visible to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List available audio input devices
pub fn list_input_devices() -> Vec<InputDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    host.input_devices()
        .map(|devices| {
            devices
                .filter_map(|device| {
                    let name = device.name().ok()?;
                    let is_default = default_name.as_deref() == Some(name.as_str());
                    Some(InputDeviceInfo { name, is_default })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Capture device backed by the default cpal host
#[derive(Debug, Clone, Default)]
pub struct CpalCapture {
    device_name: Option<String>,
}

impl CpalCapture {
    /// Capture from `device_name`, or the system default input when `None`
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}

#[async_trait]
impl CaptureDevice for CpalCapture {
    async fn open(&self) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let name = self.device_name.clone();
        let handle = tokio::task::spawn_blocking(move || CpalHandle::open(name.as_deref()))
            .await
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Task join error: {}", e)))??;
        Ok(Box::new(handle))
    }
}

/// An open input stream, running on its own thread
struct CpalHandle {
    format: PcmFormat,
    sink: SharedSink,
    shutdown: Option<std_mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalHandle {
    fn open(device_name: Option<&str>) -> Result<Self, CaptureError> {
        let device = find_input_device(device_name)?;
        let (config, sample_format) = input_config(&device)?;
        let format = PcmFormat::new(config.sample_rate.0, 1);
        debug!(
            device = %device.name().unwrap_or_default(),
            %format,
            ?sample_format,
            "opening input stream"
        );

        let sink: SharedSink = Arc::new(StdMutex::new(None));
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();
        let worker_sink = Arc::clone(&sink);

        let worker = std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                let stream = match build_stream(&device, &config, sample_format, worker_sink)
                    .and_then(|stream| {
                        stream.play().map_err(map_play_error)?;
                        Ok(stream)
                    }) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Returns once the handle drops its sender
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                format,
                sink,
                shutdown: Some(shutdown_tx),
                worker: Some(worker),
            }),
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(err)
            }
            Err(_) => Err(CaptureError::StartFailed(
                "capture thread exited during setup".to_string(),
            )),
        }
    }

    fn take_sink(&self) -> Option<CaptureSink> {
        self.sink.lock().ok().and_then(|mut guard| guard.take())
    }
}

impl CaptureHandle for CpalHandle {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn start(&mut self, sink: CaptureSink) -> Result<(), CaptureError> {
        if self.shutdown.is_none() {
            return Err(CaptureError::StartFailed("device already closed".to_string()));
        }
        let mut guard = self
            .sink
            .lock()
            .map_err(|_| CaptureError::StartFailed("capture state poisoned".to_string()))?;
        *guard = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        // Callbacks deliver under the same lock, so nothing follows `finished`
        if let Some(sink) = self.take_sink() {
            sink.finished();
        }
    }

    fn close(&mut self) {
        self.take_sink();
        if self.shutdown.take().is_some() {
            if let Some(worker) = self.worker.take() {
                join_worker(worker);
            }
            debug!("input stream closed");
        }
    }
}

impl Drop for CpalHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Wait for the stream thread to exit. Inside a runtime the join moves to
/// the blocking pool so stream teardown never stalls an async worker.
fn join_worker(worker: JoinHandle<()>) {
    let join = move || {
        if worker.join().is_err() {
            warn!("capture worker panicked");
        }
    };
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(join);
        }
        Err(_) => join(),
    }
}

fn find_input_device(name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    match name {
        None => host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no default input device".to_string())
        }),
        Some(wanted) => host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
            .find(|d| d.name().ok().as_deref() == Some(wanted))
            .ok_or_else(|| CaptureError::DeviceUnavailable(format!("no input device named {wanted}"))),
    }
}

/// Pick an i16 or f32 config, preferring fewer channels and 16 kHz support
fn input_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), CaptureError> {
    let supported = device.supported_input_configs().map_err(|e| {
        let message = e.to_string();
        if is_permission_message(&message) {
            CaptureError::PermissionDenied
        } else {
            CaptureError::DeviceUnavailable(message)
        }
    })?;

    let mut best: Option<cpal::SupportedStreamConfigRange> = None;
    for range in supported {
        if !matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32) {
            continue;
        }
        let is_better = match &best {
            None => true,
            Some(current) => {
                let fewer_channels = range.channels() < current.channels();
                let better_rate = includes_target(&range) && !includes_target(current);
                fewer_channels || better_rate
            }
        };
        if is_better {
            best = Some(range);
        }
    }

    let range = best.ok_or_else(|| {
        CaptureError::DeviceUnavailable("no supported i16 or f32 input config".to_string())
    })?;

    let sample_rate = if includes_target(&range) {
        SampleRate(TARGET_SAMPLE_RATE)
    } else {
        range.min_sample_rate()
    };

    Ok((
        StreamConfig {
            channels: range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        },
        range.sample_format(),
    ))
}

fn includes_target(range: &cpal::SupportedStreamConfigRange) -> bool {
    range.min_sample_rate().0 <= TARGET_SAMPLE_RATE && range.max_sample_rate().0 >= TARGET_SAMPLE_RATE
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    sink: SharedSink,
) -> Result<cpal::Stream, CaptureError> {
    let channels = config.channels;
    let error_sink = Arc::clone(&sink);
    let on_error = move |err: cpal::StreamError| {
        warn!(error = %err, "input stream error");
        let taken = error_sink.lock().ok().and_then(|mut guard| guard.take());
        if let Some(sink) = taken {
            sink.lost(err.to_string());
        }
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                deliver(&sink, &stereo_to_mono(data, channels));
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                deliver(&sink, &stereo_to_mono(&samples, channels));
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::StartFailed(format!(
                "unsupported sample format {other:?}"
            )))
        }
    };

    stream.map_err(map_build_error)
}

fn deliver(sink: &SharedSink, samples: &[i16]) {
    if samples.is_empty() {
        return;
    }
    if let Ok(guard) = sink.lock() {
        if let Some(sink) = guard.as_ref() {
            sink.data(to_le_bytes(samples));
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Average interleaved channels into one
fn stereo_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn is_permission_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("permission") || lower.contains("not authorized")
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device not available".to_string())
        }
        other => {
            let message = other.to_string();
            if is_permission_message(&message) {
                CaptureError::PermissionDenied
            } else {
                CaptureError::StartFailed(message)
            }
        }
    }
}

fn map_play_error(err: cpal::PlayStreamError) -> CaptureError {
    match err {
        cpal::PlayStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device not available".to_string())
        }
        other => {
            let message = other.to_string();
            if is_permission_message(&message) {
                CaptureError::PermissionDenied
            } else {
                CaptureError::StartFailed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CaptureEvent;
    use crate::domain::recording::{Fragment, SessionId};
    use tokio::sync::mpsc;

    fn gated_worker() -> (std_mpsc::Sender<()>, std_mpsc::Receiver<()>, JoinHandle<()>) {
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let (done_tx, done_rx) = std_mpsc::channel::<()>();
        let worker = std::thread::spawn(move || {
            let _ = release_rx.recv();
            let _ = done_tx.send(());
        });
        (release_tx, done_rx, worker)
    }

    #[tokio::test]
    async fn join_inside_runtime_does_not_block() {
        let (release, done, worker) = gated_worker();

        // Returns while the worker is still parked on its channel
        join_worker(worker);
        assert!(done.try_recv().is_err());

        release.send(()).unwrap();
        tokio::task::spawn_blocking(move || done.recv().unwrap())
            .await
            .unwrap();
    }

    #[test]
    fn join_outside_runtime_waits_for_worker() {
        let (release, done, worker) = gated_worker();
        release.send(()).unwrap();

        join_worker(worker);
        assert!(done.try_recv().is_ok());
    }

    #[test]
    fn stereo_to_mono_single_channel() {
        let mono = vec![100i16, 200, 300];
        assert_eq!(stereo_to_mono(&mono, 1), mono);
    }

    #[test]
    fn stereo_to_mono_two_channels() {
        let stereo = vec![100i16, 200, 300, 400];
        assert_eq!(stereo_to_mono(&stereo, 2), vec![150, 350]);
    }

    #[test]
    fn f32_samples_are_clamped() {
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), -i16::MAX);
        assert_eq!(f32_to_i16(0.0), 0);
    }

    #[test]
    fn samples_are_little_endian() {
        assert_eq!(to_le_bytes(&[1, -2]), vec![0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn permission_messages_are_recognised() {
        assert!(is_permission_message("Permission denied (os error 13)"));
        assert!(is_permission_message("App is not authorized to use the microphone"));
        assert!(!is_permission_message("device busy"));
    }

    #[test]
    fn deliver_skips_without_sink() {
        let shared: SharedSink = Arc::new(StdMutex::new(None));
        deliver(&shared, &[1, 2, 3]);

        let (tx, mut rx) = mpsc::unbounded_channel();
        *shared.lock().unwrap() = Some(CaptureSink::new(SessionId::new(1), tx));
        deliver(&shared, &[1]);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, CaptureEvent::Data(Fragment::new(vec![1, 0])));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn list_devices_does_not_panic() {
        // May be empty on machines without audio hardware
        let _ = list_input_devices();
    }

    #[tokio::test]
    #[ignore = "Requires audio hardware"]
    async fn can_open_default_device() {
        let capture = CpalCapture::new(None);
        let mut handle = capture.open().await.unwrap();
        assert_eq!(handle.format().channels, 1);
        handle.close();
    }
}
