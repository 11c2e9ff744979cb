//! Chunker: slices an utterance into fixed-size frames.
//!
//! Frames are borrowed views into the [`AudioBuffer`], produced lazily in
//! offset order with no gaps and no overlap. The final frame carries the
//! remainder and may be shorter than the configured size. A zero-length
//! buffer yields no frames.

use crate::audio::AudioBuffer;
use crate::defaults;

/// A fixed-duration slice of an utterance.
///
/// Borrows its bytes from the buffer being framed; it owns nothing and is
/// consumed exactly once by the upload path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFrame<'a> {
    /// Byte offset of this frame within the utterance.
    pub offset: usize,
    /// The frame's audio bytes.
    pub bytes: &'a [u8],
}

impl AudioFrame<'_> {
    /// Returns the frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true when the frame holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Splits audio buffers into fixed-size frames.
///
/// Pure and stateless: framing the same buffer twice yields the same
/// sequence, and iteration always restarts from offset zero.
#[derive(Debug, Clone)]
pub struct Chunker {
    frame_bytes: usize,
}

impl Chunker {
    /// Creates a chunker with the default frame size.
    pub fn new() -> Self {
        Self::with_frame_bytes(defaults::FRAME_BYTES)
    }

    /// Creates a chunker with a custom frame size in bytes.
    ///
    /// A zero size is clamped to one byte so iteration always terminates.
    pub fn with_frame_bytes(frame_bytes: usize) -> Self {
        Self {
            frame_bytes: frame_bytes.max(1),
        }
    }

    /// Returns the configured frame size in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Returns how many frames a buffer will produce.
    pub fn frame_count(&self, buffer: &AudioBuffer) -> usize {
        buffer.len().div_ceil(self.frame_bytes)
    }

    /// Returns a lazy iterator over the buffer's frames.
    pub fn frames<'a>(&self, buffer: &'a AudioBuffer) -> Frames<'a> {
        Frames {
            bytes: buffer.as_bytes(),
            frame_bytes: self.frame_bytes,
            offset: 0,
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the frames of one utterance.
#[derive(Debug)]
pub struct Frames<'a> {
    bytes: &'a [u8],
    frame_bytes: usize,
    offset: usize,
}

impl<'a> Iterator for Frames<'a> {
    type Item = AudioFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let end = usize::min(self.offset + self.frame_bytes, self.bytes.len());
        let frame = AudioFrame {
            offset: self.offset,
            bytes: &self.bytes[self.offset..end],
        };
        self.offset = end;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.bytes.len() - self.offset).div_ceil(self.frame_bytes);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(len: usize) -> AudioBuffer {
        AudioBuffer::new((0..len).map(|i| (i % 251) as u8).collect())
    }

    #[test]
    fn test_exact_multiple_produces_full_frames() {
        let chunker = Chunker::with_frame_bytes(3200);
        let buffer = buffer_of(6400);

        let frames: Vec<_> = chunker.frames(&buffer).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), 3200);
        assert_eq!(frames[1].len(), 3200);
    }

    #[test]
    fn test_remainder_becomes_short_final_frame() {
        let chunker = Chunker::with_frame_bytes(3200);
        let buffer = buffer_of(6401);

        let frames: Vec<_> = chunker.frames(&buffer).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].len(), 3200);
        assert_eq!(frames[1].len(), 3200);
        assert_eq!(frames[2].len(), 1);
    }

    #[test]
    fn test_buffer_smaller_than_frame() {
        let chunker = Chunker::with_frame_bytes(3200);
        let buffer = buffer_of(100);

        let frames: Vec<_> = chunker.frames(&buffer).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].offset, 0);
        assert_eq!(frames[0].len(), 100);
    }

    #[test]
    fn test_empty_buffer_yields_no_frames() {
        let chunker = Chunker::new();
        let buffer = AudioBuffer::new(Vec::new());

        assert_eq!(chunker.frames(&buffer).count(), 0);
        assert_eq!(chunker.frame_count(&buffer), 0);
    }

    #[test]
    fn test_frame_count_is_ceiling_division() {
        let chunker = Chunker::with_frame_bytes(3200);
        assert_eq!(chunker.frame_count(&buffer_of(0)), 0);
        assert_eq!(chunker.frame_count(&buffer_of(1)), 1);
        assert_eq!(chunker.frame_count(&buffer_of(3200)), 1);
        assert_eq!(chunker.frame_count(&buffer_of(3201)), 2);
        assert_eq!(chunker.frame_count(&buffer_of(9600)), 3);
    }

    #[test]
    fn test_frames_cover_buffer_in_order_without_gaps() {
        let chunker = Chunker::with_frame_bytes(1000);
        let buffer = buffer_of(3456);

        let mut expected_offset = 0;
        let mut reassembled = Vec::new();
        for frame in chunker.frames(&buffer) {
            assert_eq!(frame.offset, expected_offset);
            reassembled.extend_from_slice(frame.bytes);
            expected_offset += frame.len();
        }
        assert_eq!(reassembled, buffer.as_bytes());
    }

    #[test]
    fn test_framing_is_restartable() {
        let chunker = Chunker::with_frame_bytes(128);
        let buffer = buffer_of(1000);

        let first: Vec<_> = chunker.frames(&buffer).collect();
        let second: Vec<_> = chunker.frames(&buffer).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_size_hint_is_exact() {
        let chunker = Chunker::with_frame_bytes(3200);
        let buffer = buffer_of(6401);

        let mut frames = chunker.frames(&buffer);
        assert_eq!(frames.len(), 3);
        frames.next();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_zero_frame_size_is_clamped() {
        let chunker = Chunker::with_frame_bytes(0);
        assert_eq!(chunker.frame_bytes(), 1);

        let buffer = buffer_of(3);
        assert_eq!(chunker.frames(&buffer).count(), 3);
    }

    #[test]
    fn test_default_frame_size() {
        assert_eq!(Chunker::new().frame_bytes(), defaults::FRAME_BYTES);
    }
}
