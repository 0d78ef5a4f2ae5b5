//! Captured audio value objects

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use thiserror::Error;

/// Bytes per sample; captured audio is always signed 16-bit little-endian.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Errors from converting an asset into a container format
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Captured audio is not frame aligned ({0} bytes)")]
    Misaligned(usize),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

/// Layout of the PCM stream a capture device produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Bytes needed for one frame (one sample per channel)
    pub const fn frame_size(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::new(16_000, 1)
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz/{}ch/s16le", self.sample_rate, self.channels)
    }
}

/// One chunk of raw audio delivered by the capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(Vec<u8>);

impl Fragment {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Fragment {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Fragment {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Finalized recording: every fragment of a session, concatenated in arrival order.
///
/// Immutable once built. Clones share the underlying bytes, so snapshots can
/// carry it around freely.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioAsset {
    data: Arc<[u8]>,
    format: PcmFormat,
}

impl AudioAsset {
    /// Create an asset from already concatenated PCM bytes
    pub fn new(data: Vec<u8>, format: PcmFormat) -> Self {
        Self {
            data: data.into(),
            format,
        }
    }

    /// Raw PCM bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playing time implied by the byte count and format
    pub fn duration(&self) -> StdDuration {
        let bytes_per_sec = self.format.frame_size() as u64 * self.format.sample_rate as u64;
        if bytes_per_sec == 0 {
            return StdDuration::ZERO;
        }
        StdDuration::from_millis(self.data.len() as u64 * 1000 / bytes_per_sec)
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }

    /// Wrap the PCM data in a RIFF/WAVE container for playback
    pub fn to_wav(&self) -> Result<Vec<u8>, AssetError> {
        if self.data.len() % self.format.frame_size().max(1) != 0 {
            return Err(AssetError::Misaligned(self.data.len()));
        }

        let spec = hound::WavSpec {
            channels: self.format.channels,
            sample_rate: self.format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(self.data.len() + 44));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for pair in self.data.chunks_exact(BYTES_PER_SAMPLE) {
                writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }
}

impl fmt::Debug for AudioAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioAsset")
            .field("bytes", &self.data.len())
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn frame_size_accounts_for_channels() {
        assert_eq!(PcmFormat::new(48_000, 1).frame_size(), 2);
        assert_eq!(PcmFormat::new(48_000, 2).frame_size(), 4);
    }

    #[test]
    fn duration_from_byte_count() {
        // One second of 16kHz mono = 32000 bytes
        let asset = AudioAsset::new(vec![0u8; 32_000], PcmFormat::new(16_000, 1));
        assert_eq!(asset.duration(), StdDuration::from_secs(1));
    }

    #[test]
    fn human_readable_size() {
        let small = AudioAsset::new(vec![0u8; 512], PcmFormat::default());
        assert_eq!(small.human_readable_size(), "512 B");

        let medium = AudioAsset::new(vec![0u8; 2048], PcmFormat::default());
        assert_eq!(medium.human_readable_size(), "2.0 KB");
    }

    #[test]
    fn clones_share_bytes() {
        let asset = AudioAsset::new(vec![1, 2, 3, 4], PcmFormat::default());
        let copy = asset.clone();
        assert_eq!(asset, copy);
        assert!(std::ptr::eq(asset.data().as_ptr(), copy.data().as_ptr()));
    }

    #[test]
    fn wav_has_header_and_samples() {
        let asset = AudioAsset::new(pcm(&[0, 1000, -1000, i16::MAX]), PcmFormat::new(8_000, 1));
        let wav = asset.to_wav().unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
    }

    #[test]
    fn wav_rejects_partial_frames() {
        let asset = AudioAsset::new(vec![0u8; 3], PcmFormat::new(8_000, 1));
        assert!(matches!(asset.to_wav(), Err(AssetError::Misaligned(3))));
    }

    #[test]
    fn debug_hides_payload() {
        let asset = AudioAsset::new(vec![7u8; 10], PcmFormat::default());
        let debug = format!("{:?}", asset);
        assert!(debug.contains("bytes: 10"));
    }
}
