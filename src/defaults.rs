//! Default configuration constants for scribed.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default audio frame size in bytes.
///
/// 3200 bytes is roughly 100ms of 16kHz 16-bit mono PCM. Small enough for
/// low-latency streaming to the recognition backend, large enough to keep
/// per-frame overhead negligible.
pub const FRAME_BYTES: usize = 3200;

/// Default language code requested from the recognition backend.
pub const LANGUAGE_CODE: &str = "en-US";

/// Default media encoding label for the audio stream.
///
/// The core handles raw PCM only; this label is forwarded to the backend
/// when the stream is opened.
pub const MEDIA_ENCODING: &str = "pcm";

/// Default deployment region label, forwarded opaquely to the backend.
pub const REGION: &str = "us-east-1";

/// Default recognition backend endpoint (host:port).
pub const ENDPOINT: &str = "127.0.0.1:9090";

/// Default idle timeout in milliseconds for a recognition stream.
///
/// If the backend produces no event for this long, the session is abandoned
/// rather than left to hang a client connection indefinitely.
pub const IDLE_TIMEOUT_MS: u64 = 30_000;

/// Default cap on concurrent recognition streams.
///
/// Bounds resource growth under load; sessions beyond the cap wait for a
/// permit rather than opening ever more backend connections.
pub const MAX_STREAMS: usize = 32;

/// Default transcript table name.
pub const TABLE: &str = "Transcriptions";

/// Default transcript database URL.
pub const DATABASE_URL: &str = "sqlite:scribed.db";

/// Default gateway bind address.
pub const LISTEN_HOST: &str = "0.0.0.0";

/// Default gateway listen port.
pub const LISTEN_PORT: u16 = 8080;

/// Capacity of the bounded audio channel feeding a recognition stream.
///
/// Deliberately small: once the backend stops draining, frame production
/// pauses after this many in-flight frames instead of buffering the whole
/// utterance again.
pub const AUDIO_CHANNEL_CAPACITY: usize = 8;

/// Capacity of the inbound recognition event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_bytes_is_100ms_of_default_audio() {
        // 16-bit mono: 2 bytes per sample, one tenth of a second per frame.
        assert_eq!(FRAME_BYTES, (SAMPLE_RATE as usize * 2) / 10);
    }
}
