//! Recognition backend contract.
//!
//! A backend owns the conversation with an actual speech-recognition engine.
//! The session layer only sees the [`RecognitionStream`] channel pair, so
//! engines can be swapped (remote service vs mock) without touching the
//! session logic.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::defaults;
use crate::error::{Result, ScribedError};
use crate::recognition::event::RecognitionEvent;

/// Stream parameters announced to the backend when a session opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Language requested for recognition, e.g. "en-US".
    pub language_code: String,
    /// Encoding label of the audio bytes. Only raw PCM is produced here.
    pub encoding: String,
    /// Sample rate of the audio in Hz.
    pub sample_rate_hz: u32,
    /// Deployment region label, forwarded opaquely. The core never
    /// interprets it.
    pub region: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language_code: defaults::LANGUAGE_CODE.to_string(),
            encoding: defaults::MEDIA_ENCODING.to_string(),
            sample_rate_hz: defaults::SAMPLE_RATE,
            region: defaults::REGION.to_string(),
        }
    }
}

/// One live recognition stream.
///
/// `audio` accepts frame bytes in offset order; dropping the sender is the
/// end-of-input signal. `events` yields backend events until the backend
/// closes its side. Both channels are bounded, so a slow backend pushes back
/// on the feeder instead of buffering the utterance a second time.
#[derive(Debug)]
pub struct RecognitionStream {
    pub audio: mpsc::Sender<Vec<u8>>,
    pub events: mpsc::Receiver<RecognitionEvent>,
}

/// Trait for speech-recognition backends.
///
/// This trait allows swapping implementations (remote service vs mock).
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Opens a bidirectional stream for one utterance.
    ///
    /// # Arguments
    /// * `config` - Stream parameters sent to the engine at open time
    ///
    /// # Returns
    /// The channel pair for this utterance, or an error when no stream
    /// could be established.
    async fn open(&self, config: &RecognitionConfig) -> Result<RecognitionStream>;
}

/// Implement RecognitionBackend for Arc<T> to allow sharing across sessions.
/// `?Sized` keeps `Arc<dyn RecognitionBackend>` covered as well.
#[async_trait]
impl<T: RecognitionBackend + ?Sized> RecognitionBackend for Arc<T> {
    async fn open(&self, config: &RecognitionConfig) -> Result<RecognitionStream> {
        (**self).open(config).await
    }
}

/// Mock recognition backend for tests and development.
///
/// Scripts a fixed event sequence per stream. The mock drains the audio
/// channel first and emits its script only after end-of-input, mimicking a
/// backend that answers once the utterance is complete. Clones share the
/// open/receive accounting, so a test can keep one handle and hand a clone
/// to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockRecognitionBackend {
    events: Vec<RecognitionEvent>,
    fail_open: bool,
    opened: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    last_config: Arc<Mutex<Option<RecognitionConfig>>>,
}

impl MockRecognitionBackend {
    /// Create a mock that emits no events and closes the stream cleanly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary event to the script.
    pub fn with_event(mut self, event: RecognitionEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Append a partial event to the script.
    pub fn with_partial(self, text: &str) -> Self {
        self.with_event(RecognitionEvent::Partial {
            text: text.to_string(),
        })
    }

    /// Append a final event to the script.
    pub fn with_final(self, text: &str) -> Self {
        self.with_event(RecognitionEvent::final_text(text))
    }

    /// Append a stream error to the script.
    pub fn with_stream_error(self, message: &str) -> Self {
        self.with_event(RecognitionEvent::StreamError {
            message: message.to_string(),
        })
    }

    /// Configure the mock to refuse to open streams.
    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Number of streams opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// All audio frames received across every stream, in arrival order.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The config of the most recently opened stream.
    pub fn last_config(&self) -> Option<RecognitionConfig> {
        self.last_config
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl RecognitionBackend for MockRecognitionBackend {
    async fn open(&self, config: &RecognitionConfig) -> Result<RecognitionStream> {
        if self.fail_open {
            return Err(ScribedError::RecognitionFailed {
                message: "mock backend refused to open stream".to_string(),
            });
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap_or_else(|e| e.into_inner()) = Some(config.clone());

        let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(defaults::AUDIO_CHANNEL_CAPACITY);
        let (events_tx, events_rx) =
            mpsc::channel::<RecognitionEvent>(defaults::EVENT_CHANNEL_CAPACITY);

        let script = self.events.clone();
        let received = self.received.clone();
        tokio::spawn(async move {
            while let Some(chunk) = audio_rx.recv().await {
                received.lock().unwrap_or_else(|e| e.into_inner()).push(chunk);
            }
            for event in script {
                if events_tx.send(event).await.is_err() {
                    return;
                }
            }
            // events_tx drops here: normal stream close
        });

        Ok(RecognitionStream {
            audio: audio_tx,
            events: events_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_emits_script_after_end_of_input() {
        let backend = MockRecognitionBackend::new()
            .with_partial("hel")
            .with_final("hello");

        let mut stream = backend.open(&RecognitionConfig::default()).await.unwrap();
        stream.audio.send(vec![1, 2, 3]).await.unwrap();
        drop(stream.audio);

        assert_eq!(
            stream.events.recv().await,
            Some(RecognitionEvent::Partial {
                text: "hel".to_string()
            })
        );
        assert_eq!(
            stream.events.recv().await,
            Some(RecognitionEvent::final_text("hello"))
        );
        assert_eq!(stream.events.recv().await, None, "stream should close");
    }

    #[tokio::test]
    async fn test_mock_records_received_frames_and_opens() {
        let backend = MockRecognitionBackend::new();
        assert_eq!(backend.opened(), 0);

        let mut stream = backend.open(&RecognitionConfig::default()).await.unwrap();
        stream.audio.send(vec![1]).await.unwrap();
        stream.audio.send(vec![2, 2]).await.unwrap();
        drop(stream.audio);
        while stream.events.recv().await.is_some() {}

        assert_eq!(backend.opened(), 1);
        assert_eq!(backend.received(), vec![vec![1], vec![2, 2]]);
    }

    #[tokio::test]
    async fn test_mock_open_failure() {
        let backend = MockRecognitionBackend::new().with_open_failure();
        let err = backend
            .open(&RecognitionConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_recognition_failure());
        assert_eq!(backend.opened(), 0);
    }

    #[tokio::test]
    async fn test_mock_records_stream_config() {
        let backend = MockRecognitionBackend::new();
        let config = RecognitionConfig {
            language_code: "de-DE".to_string(),
            ..RecognitionConfig::default()
        };
        let stream = backend.open(&config).await.unwrap();
        drop(stream);

        assert_eq!(
            backend.last_config().map(|c| c.language_code),
            Some("de-DE".to_string())
        );
    }

    #[tokio::test]
    async fn test_clones_share_accounting() {
        let backend = MockRecognitionBackend::new();
        let clone = backend.clone();

        let stream = clone.open(&RecognitionConfig::default()).await.unwrap();
        drop(stream);

        assert_eq!(backend.opened(), 1);
    }

    #[tokio::test]
    async fn test_backend_usable_through_arc_dyn() {
        let backend: Arc<dyn RecognitionBackend> =
            Arc::new(MockRecognitionBackend::new().with_final("via arc"));

        let mut stream = backend.open(&RecognitionConfig::default()).await.unwrap();
        drop(stream.audio);
        assert_eq!(
            stream.events.recv().await,
            Some(RecognitionEvent::final_text("via arc"))
        );
    }

    #[test]
    fn test_recognition_config_default() {
        let config = RecognitionConfig::default();
        assert_eq!(config.language_code, "en-US");
        assert_eq!(config.encoding, "pcm");
        assert_eq!(config.sample_rate_hz, 16000);
        assert_eq!(config.region, "us-east-1");
    }
}
