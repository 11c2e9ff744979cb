//! Transcription session: one end-to-end recognition attempt.
//!
//! A session owns the full life of one utterance: it opens a stream on the
//! backend, feeds frames from one task while consuming events on another,
//! and reduces the event stream into the final transcript. Feeding and
//! consuming run concurrently so backend backpressure can never deadlock
//! against backend output.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::audio::{AudioBuffer, Chunker};
use crate::defaults;
use crate::error::{Result, ScribedError};
use crate::recognition::backend::{RecognitionBackend, RecognitionConfig, RecognitionStream};
use crate::recognition::event::RecognitionEvent;

/// Drives one utterance through a recognition backend.
///
/// The session is cheap to construct and holds no per-utterance state;
/// callers build one per configuration and reuse it across utterances.
pub struct TranscriptionSession<B: RecognitionBackend> {
    backend: B,
    config: RecognitionConfig,
    chunker: Chunker,
    idle_timeout: Duration,
}

impl<B: RecognitionBackend> TranscriptionSession<B> {
    /// Creates a session with default stream parameters.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RecognitionConfig::default())
    }

    /// Creates a session with custom stream parameters.
    pub fn with_config(backend: B, config: RecognitionConfig) -> Self {
        Self {
            backend,
            config,
            chunker: Chunker::new(),
            idle_timeout: Duration::from_millis(defaults::IDLE_TIMEOUT_MS),
        }
    }

    /// Overrides the frame size used when feeding audio.
    pub fn with_frame_bytes(mut self, frame_bytes: usize) -> Self {
        self.chunker = Chunker::with_frame_bytes(frame_bytes);
        self
    }

    /// Overrides the idle timeout: the longest the session waits for the
    /// next backend event before abandoning the stream.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Transcribes one utterance.
    ///
    /// # Arguments
    /// * `audio` - The complete utterance audio
    ///
    /// # Returns
    /// The trimmed transcript. An empty utterance yields an empty
    /// transcript, not an error.
    pub async fn run(&self, audio: &AudioBuffer) -> Result<String> {
        self.run_with_progress(audio, |_| {}).await
    }

    /// Transcribes one utterance, reporting partial hypotheses as they
    /// arrive.
    ///
    /// # Arguments
    /// * `audio` - The complete utterance audio
    /// * `on_partial` - Callback invoked for each partial hypothesis;
    ///   partials never enter the returned transcript
    pub async fn run_with_progress<F>(&self, audio: &AudioBuffer, mut on_partial: F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        debug!(
            bytes = audio.len(),
            frames = self.chunker.frame_count(audio),
            "opening recognition stream"
        );
        let RecognitionStream {
            audio: audio_tx,
            mut events,
        } = self.backend.open(&self.config).await?;

        // Feed half. Frames go out in offset order; a blocked send is the
        // backpressure point. Dropping the sender after the last frame is
        // the end-of-input signal. Returns false when the backend stopped
        // accepting audio early.
        let buffer = audio.clone();
        let chunker = self.chunker.clone();
        let feed = tokio::spawn(async move {
            for frame in chunker.frames(&buffer) {
                if audio_tx.send(frame.bytes.to_vec()).await.is_err() {
                    return false;
                }
            }
            true
        });

        // Consume half: fold events into the transcript until the backend
        // closes the stream.
        let mut transcript = String::new();
        loop {
            let event = match timeout(self.idle_timeout, events.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    feed.abort();
                    return Err(ScribedError::RecognitionTimeout {
                        idle_ms: self.idle_timeout.as_millis() as u64,
                    });
                }
            };
            match event {
                Some(RecognitionEvent::Partial { text }) => on_partial(&text),
                Some(RecognitionEvent::Final { text, alternatives }) => {
                    if !alternatives.is_empty() {
                        debug!(count = alternatives.len(), "discarding lower-ranked alternatives");
                    }
                    transcript.push_str(&text);
                    transcript.push(' ');
                }
                Some(RecognitionEvent::StreamError { message }) => {
                    warn!(error = %message, "recognition stream failed");
                    feed.abort();
                    return Err(ScribedError::RecognitionFailed { message });
                }
                None => break,
            }
        }

        // Normal close. Confirm the whole utterance actually reached the
        // backend before trusting the result.
        match feed.await {
            Ok(true) => {
                let transcript = transcript.trim().to_string();
                debug!(chars = transcript.len(), "recognition stream closed");
                Ok(transcript)
            }
            Ok(false) => Err(ScribedError::RecognitionFailed {
                message: "Backend closed the stream before end-of-input".to_string(),
            }),
            Err(e) => Err(ScribedError::RecognitionFailed {
                message: format!("Audio feed task failed: {}", e),
            }),
        }
    }
}
