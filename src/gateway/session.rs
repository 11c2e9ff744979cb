//! Per-connection lifecycle for streaming clients.

use crate::audio::AudioBuffer;
use crate::error::{Result, ScribedError};

/// Lifecycle of one streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, nothing buffered for the current utterance.
    Open,
    /// Audio is accumulating for the current utterance.
    Streaming,
    /// The current utterance is out for recognition and its reply is pending.
    Finalizing,
    /// The connection is gone. Terminal.
    Closed,
}

/// Tracks where one streaming client is in the utterance cycle.
///
/// The socket loop owns the I/O; this type owns the rules. Audio frames
/// accumulate until the client marks the end of the utterance, at which point
/// the buffered audio is handed off for recognition and the session waits for
/// the reply before the next cycle begins. Audio that arrives while a reply is
/// pending is kept for the following utterance, and a second end-of-utterance
/// in that window is refused without disturbing the one in flight.
#[derive(Debug)]
pub struct ClientSession {
    state: SessionState,
    buffer: Vec<u8>,
}

impl ClientSession {
    /// Creates a session for a freshly accepted connection.
    pub fn new() -> Self {
        Self {
            state: SessionState::Open,
            buffer: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bytes buffered for the utterance that has not been finalized yet.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Accepts one binary audio frame.
    ///
    /// While a reply is pending the frame is buffered for the next utterance.
    /// Frames arriving after the connection closed are dropped.
    pub fn push_audio(&mut self, bytes: &[u8]) {
        match self.state {
            SessionState::Open => {
                self.buffer.extend_from_slice(bytes);
                self.state = SessionState::Streaming;
            }
            SessionState::Streaming | SessionState::Finalizing => {
                self.buffer.extend_from_slice(bytes);
            }
            SessionState::Closed => {}
        }
    }

    /// Takes the buffered audio as one finished utterance.
    ///
    /// Fails with [`ScribedError::SessionBusy`] while a previous utterance is
    /// still waiting for its reply; the buffer is left untouched so the
    /// client can end the utterance again once the reply arrives. An
    /// utterance with no audio is valid and yields an empty buffer.
    pub fn end_utterance(&mut self) -> Result<AudioBuffer> {
        match self.state {
            SessionState::Open | SessionState::Streaming => {
                self.state = SessionState::Finalizing;
                Ok(AudioBuffer::new(std::mem::take(&mut self.buffer)))
            }
            SessionState::Finalizing => Err(ScribedError::SessionBusy),
            SessionState::Closed => Err(ScribedError::Other(
                "Connection is closed".to_string(),
            )),
        }
    }

    /// Marks the pending utterance as replied to and opens the next cycle.
    ///
    /// Audio buffered while the reply was pending carries over, so the next
    /// cycle starts in [`SessionState::Streaming`] when anything arrived in
    /// the meantime.
    pub fn reply_sent(&mut self) {
        if self.state == SessionState::Finalizing {
            self.state = if self.buffer.is_empty() {
                SessionState::Open
            } else {
                SessionState::Streaming
            };
        }
    }

    /// Tears the session down. Buffered audio is discarded.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.buffer.clear();
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_open_and_empty() {
        let session = ClientSession::new();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.buffered_bytes(), 0);
    }

    #[test]
    fn audio_moves_open_to_streaming() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2, 3]);
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(session.buffered_bytes(), 3);
    }

    #[test]
    fn audio_accumulates_across_frames() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2]);
        session.push_audio(&[3, 4, 5]);
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(session.buffered_bytes(), 5);
    }

    #[test]
    fn end_utterance_takes_buffer_and_finalizes() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2, 3, 4]);

        let audio = session.end_utterance().unwrap();
        assert_eq!(audio.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(session.state(), SessionState::Finalizing);
        assert_eq!(session.buffered_bytes(), 0);
    }

    #[test]
    fn end_utterance_without_audio_is_valid() {
        let mut session = ClientSession::new();
        let audio = session.end_utterance().unwrap();
        assert!(audio.is_empty());
        assert_eq!(session.state(), SessionState::Finalizing);
    }

    #[test]
    fn audio_during_finalizing_buffers_for_next_utterance() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2]);
        session.end_utterance().unwrap();

        session.push_audio(&[3, 4, 5]);
        assert_eq!(session.state(), SessionState::Finalizing);
        assert_eq!(session.buffered_bytes(), 3);
    }

    #[test]
    fn second_end_while_finalizing_is_busy() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2]);
        session.end_utterance().unwrap();
        session.push_audio(&[3, 4]);

        let err = session.end_utterance().unwrap_err();
        assert!(matches!(err, ScribedError::SessionBusy));
        // The in-flight utterance and the carried-over audio both survive.
        assert_eq!(session.state(), SessionState::Finalizing);
        assert_eq!(session.buffered_bytes(), 2);
    }

    #[test]
    fn reply_with_empty_buffer_reopens() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2]);
        session.end_utterance().unwrap();

        session.reply_sent();
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn reply_with_carried_audio_resumes_streaming() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2]);
        session.end_utterance().unwrap();
        session.push_audio(&[3, 4]);

        session.reply_sent();
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(session.buffered_bytes(), 2);
    }

    #[test]
    fn carried_audio_becomes_the_next_utterance() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2]);
        session.end_utterance().unwrap();
        session.push_audio(&[3, 4]);
        session.reply_sent();

        let next = session.end_utterance().unwrap();
        assert_eq!(next.as_bytes(), &[3, 4]);
        assert_eq!(session.state(), SessionState::Finalizing);
    }

    #[test]
    fn reply_outside_finalizing_is_ignored() {
        let mut session = ClientSession::new();
        session.reply_sent();
        assert_eq!(session.state(), SessionState::Open);

        session.push_audio(&[1]);
        session.reply_sent();
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(session.buffered_bytes(), 1);
    }

    #[test]
    fn close_discards_buffer_and_is_terminal() {
        let mut session = ClientSession::new();
        session.push_audio(&[1, 2, 3]);
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.buffered_bytes(), 0);

        session.push_audio(&[4, 5]);
        assert_eq!(session.buffered_bytes(), 0);
        assert!(session.end_utterance().is_err());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn full_cycle_walks_every_state() {
        let mut session = ClientSession::new();
        assert_eq!(session.state(), SessionState::Open);

        session.push_audio(&[1, 2]);
        assert_eq!(session.state(), SessionState::Streaming);

        session.end_utterance().unwrap();
        assert_eq!(session.state(), SessionState::Finalizing);

        session.reply_sent();
        assert_eq!(session.state(), SessionState::Open);

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }
}
