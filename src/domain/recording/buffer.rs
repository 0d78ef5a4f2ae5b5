//! Append-only fragment buffer for one capture session

use super::asset::{AudioAsset, Fragment, PcmFormat};

/// Ordered fragments of a capture session.
///
/// Fragments are only appended, never reordered; `finalize` concatenates
/// them in the order they arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBuffer {
    fragments: Vec<Fragment>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a buffer that continues an earlier recording.
    /// The previous asset becomes the first fragment.
    pub fn continuing(previous: &AudioAsset) -> Self {
        let mut buffer = Self::new();
        buffer.push(Fragment::from(previous.data()));
        buffer
    }

    pub fn push(&mut self, fragment: Fragment) {
        if fragment.is_empty() {
            return;
        }
        self.total_bytes += fragment.len();
        self.fragments.push(fragment);
    }

    /// Number of buffered fragments
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate every fragment into one immutable asset
    pub fn finalize(self, format: PcmFormat) -> AudioAsset {
        let mut data = Vec::with_capacity(self.total_bytes);
        for fragment in &self.fragments {
            data.extend_from_slice(fragment.as_bytes());
        }
        AudioAsset::new(data, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_keeps_arrival_order() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(Fragment::from(b"AA".as_slice()));
        buffer.push(Fragment::from(b"BB".as_slice()));
        buffer.push(Fragment::from(b"CC".as_slice()));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.total_bytes(), 6);

        let asset = buffer.finalize(PcmFormat::default());
        assert_eq!(asset.data(), b"AABBCC");
    }

    #[test]
    fn empty_fragments_are_skipped() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(Fragment::new(Vec::new()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn finalize_empty_buffer_yields_empty_asset() {
        let asset = ChunkBuffer::new().finalize(PcmFormat::default());
        assert!(asset.is_empty());
    }

    #[test]
    fn continuing_prepends_previous_asset() {
        let previous = AudioAsset::new(b"old-".to_vec(), PcmFormat::default());
        let mut buffer = ChunkBuffer::continuing(&previous);
        buffer.push(Fragment::from(b"new".as_slice()));

        let asset = buffer.finalize(PcmFormat::default());
        assert_eq!(asset.data(), b"old-new");
    }
}
