//! Audio capture port interfaces

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::recording::{Fragment, PcmFormat, RecorderError, SessionId};

/// Capture errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("No audio device available: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to start capture: {0}")]
    StartFailed(String),
}

impl From<CaptureError> for RecorderError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => RecorderError::PermissionDenied,
            CaptureError::DeviceUnavailable(msg) => RecorderError::DeviceUnavailable(msg),
            CaptureError::StartFailed(msg) => RecorderError::CaptureFailed(msg),
        }
    }
}

/// What a capture device reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// One fragment of audio, in capture order
    Data(Fragment),
    /// Capture stopped; no more data follows for this session
    Finished,
    /// The device went away mid-session
    Lost(String),
}

/// A capture event tagged with the session it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub session: SessionId,
    pub event: CaptureEvent,
}

/// Callback handed to a device when capture begins.
///
/// The device pushes events through it from whatever thread it runs on;
/// they are queued for the controller, which processes them in order.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl CaptureSink {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<DeviceEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Deliver a fragment. Returns false once the controller is gone.
    pub fn data(&self, bytes: Vec<u8>) -> bool {
        self.send(CaptureEvent::Data(Fragment::new(bytes)))
    }

    /// Report that capture has stopped and every fragment was delivered
    pub fn finished(&self) -> bool {
        self.send(CaptureEvent::Finished)
    }

    /// Report that the device disconnected
    pub fn lost(&self, reason: impl Into<String>) -> bool {
        self.send(CaptureEvent::Lost(reason.into()))
    }

    fn send(&self, event: CaptureEvent) -> bool {
        self.tx
            .send(DeviceEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

/// Port for acquiring a capture device
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request access to the device.
    ///
    /// # Returns
    /// An open handle that is not yet capturing, or why access failed
    async fn open(&self) -> Result<Box<dyn CaptureHandle>, CaptureError>;
}

/// An open capture device
pub trait CaptureHandle: Send {
    /// Layout of the PCM data this device delivers
    fn format(&self) -> PcmFormat;

    /// Begin delivering fragments to `sink`
    fn start(&mut self, sink: CaptureSink) -> Result<(), CaptureError>;

    /// Stop capturing. Outstanding fragments are flushed to the sink,
    /// followed by [`CaptureSink::finished`].
    fn stop(&mut self);

    /// Stop capturing and release the hardware. Safe to call repeatedly.
    fn close(&mut self);
}

/// Scoped ownership of an open device: dropping the lease closes it.
pub struct DeviceLease {
    handle: Box<dyn CaptureHandle>,
}

impl DeviceLease {
    pub fn new(handle: Box<dyn CaptureHandle>) -> Self {
        Self { handle }
    }

    pub fn format(&self) -> PcmFormat {
        self.handle.format()
    }

    pub fn start(&mut self, sink: CaptureSink) -> Result<(), CaptureError> {
        self.handle.start(sink)
    }

    pub fn stop(&mut self) {
        self.handle.stop();
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.handle.close();
    }
}

impl std::fmt::Debug for DeviceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLease")
            .field("format", &self.handle.format())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandle {
        closes: Arc<AtomicUsize>,
    }

    impl CaptureHandle for CountingHandle {
        fn format(&self) -> PcmFormat {
            PcmFormat::default()
        }

        fn start(&mut self, _sink: CaptureSink) -> Result<(), CaptureError> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dropping_lease_closes_device() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let _lease = DeviceLease::new(Box::new(CountingHandle {
                closes: Arc::clone(&closes),
            }));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sink_tags_events_with_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = CaptureSink::new(SessionId::new(7), tx);

        assert!(sink.data(vec![1, 2]));
        assert!(sink.finished());

        let first = rx.try_recv().unwrap();
        assert_eq!(first.session, SessionId::new(7));
        assert_eq!(first.event, CaptureEvent::Data(Fragment::new(vec![1, 2])));
        assert_eq!(rx.try_recv().unwrap().event, CaptureEvent::Finished);
    }

    #[test]
    fn sink_reports_closed_controller() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = CaptureSink::new(SessionId::new(1), tx);
        drop(rx);
        assert!(!sink.lost("gone"));
    }

    #[test]
    fn capture_error_maps_to_recorder_error() {
        assert_eq!(
            RecorderError::from(CaptureError::PermissionDenied),
            RecorderError::PermissionDenied
        );
        assert!(matches!(
            RecorderError::from(CaptureError::StartFailed("x".into())),
            RecorderError::CaptureFailed(_)
        ));
    }
}
