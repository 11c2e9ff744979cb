//! Audio types for utterance buffering and framing.
//!
//! Client audio arrives as one immutable [`AudioBuffer`] per utterance; the
//! [`Chunker`] slices a buffer into the fixed-size frames that are streamed
//! to the recognition backend.

pub mod buffer;
pub mod chunker;

pub use buffer::AudioBuffer;
pub use chunker::{AudioFrame, Chunker, Frames};
