//! Remote recognition backend speaking newline-delimited JSON over TCP.
//!
//! One TCP connection per utterance, one JSON document per line:
//! - outbound: a `start` message announcing the stream parameters, then one
//!   `audio` message per frame (base64 payload), then `end` once the audio
//!   channel closes.
//! - inbound: [`RecognitionEvent`] lines; EOF is a normal close.
//!
//! I/O and parse failures surface as `error` events on the stream, so the
//! session layer handles a dead connection the same way as a backend-reported
//! failure.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::defaults;
use crate::error::{Result, ScribedError};
use crate::recognition::backend::{RecognitionBackend, RecognitionConfig, RecognitionStream};
use crate::recognition::event::RecognitionEvent;

/// Messages written to the backend, one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRequest {
    /// Announces stream parameters. Sent exactly once, before any audio.
    Start {
        #[serde(flatten)]
        config: RecognitionConfig,
    },
    /// One frame of audio, base64 encoded.
    Audio { data: String },
    /// End-of-input; no further audio follows.
    End,
}

impl StreamRequest {
    /// Serialize request to JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize request from JSON string.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Streaming client for a remote recognition service.
///
/// Constructed once and shared across sessions; each `open` dials a fresh
/// connection for its utterance. A semaphore caps how many streams may be
/// live at once, so load spikes queue instead of piling connections onto
/// the backend.
#[derive(Debug)]
pub struct RemoteRecognitionBackend {
    endpoint: String,
    streams: Arc<Semaphore>,
}

impl RemoteRecognitionBackend {
    /// Creates a client for `endpoint` ("host:port") with the default
    /// concurrent stream cap.
    pub fn new(endpoint: &str) -> Self {
        Self::with_max_streams(endpoint, defaults::MAX_STREAMS)
    }

    /// Creates a client with a custom concurrent stream cap.
    pub fn with_max_streams(endpoint: &str, max_streams: usize) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            streams: Arc::new(Semaphore::new(max_streams.max(1))),
        }
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Writes one request as a JSON line and flushes it.
async fn write_line(
    writer: &mut OwnedWriteHalf,
    request: &StreamRequest,
) -> std::io::Result<()> {
    let json = request
        .to_json()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[async_trait]
impl RecognitionBackend for RemoteRecognitionBackend {
    async fn open(&self, config: &RecognitionConfig) -> Result<RecognitionStream> {
        let permit = self
            .streams
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScribedError::RecognitionFailed {
                message: "Backend stream limiter closed".to_string(),
            })?;

        debug!(endpoint = %self.endpoint, "connecting to recognition backend");
        let stream =
            TcpStream::connect(&self.endpoint)
                .await
                .map_err(|e| ScribedError::RecognitionFailed {
                    message: format!(
                        "Failed to connect to recognition backend at {}: {}",
                        self.endpoint, e
                    ),
                })?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let start = StreamRequest::Start {
            config: config.clone(),
        };
        write_line(&mut writer, &start)
            .await
            .map_err(|e| ScribedError::RecognitionFailed {
                message: format!("Failed to announce stream parameters: {}", e),
            })?;

        let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(defaults::AUDIO_CHANNEL_CAPACITY);
        let (events_tx, events_rx) =
            mpsc::channel::<RecognitionEvent>(defaults::EVENT_CHANNEL_CAPACITY);

        // Writer half: frames out in arrival order, then end-of-input.
        // Failures surface as error events rather than a silent close.
        let writer_events = events_tx.clone();
        let writer_task = tokio::spawn(async move {
            while let Some(chunk) = audio_rx.recv().await {
                let message = StreamRequest::Audio {
                    data: STANDARD.encode(&chunk),
                };
                if let Err(e) = write_line(&mut writer, &message).await {
                    warn!(error = %e, "failed to send audio frame");
                    let _ = writer_events
                        .send(RecognitionEvent::StreamError {
                            message: format!("Failed to send audio: {}", e),
                        })
                        .await;
                    return;
                }
            }
            if let Err(e) = write_line(&mut writer, &StreamRequest::End).await {
                warn!(error = %e, "failed to send end-of-input");
                let _ = writer_events
                    .send(RecognitionEvent::StreamError {
                        message: format!("Failed to send end-of-input: {}", e),
                    })
                    .await;
            }
        });

        // Reader half: one event per line until EOF.
        let reader_task = tokio::spawn(async move {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match RecognitionEvent::from_json(trimmed) {
                            Ok(event) => {
                                if events_tx.send(event).await.is_err() {
                                    // Session side dropped the stream.
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "unparsable event from backend");
                                let _ = events_tx
                                    .send(RecognitionEvent::StreamError {
                                        message: format!("Unparsable backend event: {}", e),
                                    })
                                    .await;
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = events_tx
                            .send(RecognitionEvent::StreamError {
                                message: format!("Backend read failed: {}", e),
                            })
                            .await;
                        break;
                    }
                }
            }
        });

        // The permit covers the whole stream: released only once both
        // halves are done with the connection.
        tokio::spawn(async move {
            let _permit = permit;
            let _ = tokio::join!(writer_task, reader_task);
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
    use tokio::net::TcpListener;
    use tokio::time::{Duration, timeout};

    /// In-process stand-in for the recognition service: accepts connections,
    /// records every request, and answers `end` with the scripted events.
    async fn spawn_fixture(
        events: Vec<RecognitionEvent>,
    ) -> (String, mpsc::UnboundedReceiver<StreamRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                let (reader, mut writer) = stream.into_split();
                let mut reader = BufReader::new(reader);
                let mut line = String::new();
                loop {
                    line.clear();
                    if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                        break;
                    }
                    let request = StreamRequest::from_json(line.trim()).unwrap();
                    let is_end = matches!(request, StreamRequest::End);
                    let _ = seen_tx.send(request);
                    if is_end {
                        for event in &events {
                            let json = event.to_json().unwrap();
                            writer.write_all(json.as_bytes()).await.unwrap();
                            writer.write_all(b"\n").await.unwrap();
                        }
                        writer.flush().await.unwrap();
                        break;
                    }
                }
                // Connection drops here; client sees EOF.
            }
        });

        (addr, seen_rx)
    }

    #[tokio::test]
    async fn test_full_stream_against_fixture() {
        let (addr, mut seen) = spawn_fixture(vec![
            RecognitionEvent::Partial {
                text: "hel".to_string(),
            },
            RecognitionEvent::final_text("hello"),
        ])
        .await;

        let backend = RemoteRecognitionBackend::new(&addr);
        let config = RecognitionConfig::default();
        let mut stream = backend.open(&config).await.unwrap();

        stream.audio.send(vec![1, 2, 3]).await.unwrap();
        stream.audio.send(vec![4, 5]).await.unwrap();
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
        assert_eq!(stream.events.recv().await, None, "EOF closes the stream");

        // The fixture saw start, both frames (base64), then end.
        match seen.recv().await.unwrap() {
            StreamRequest::Start { config: sent } => {
                assert_eq!(sent.language_code, "en-US");
                assert_eq!(sent.sample_rate_hz, 16000);
            }
            other => panic!("expected start first, got {:?}", other),
        }
        match seen.recv().await.unwrap() {
            StreamRequest::Audio { data } => {
                assert_eq!(STANDARD.decode(data).unwrap(), vec![1, 2, 3]);
            }
            other => panic!("expected audio, got {:?}", other),
        }
        match seen.recv().await.unwrap() {
            StreamRequest::Audio { data } => {
                assert_eq!(STANDARD.decode(data).unwrap(), vec![4, 5]);
            }
            other => panic!("expected audio, got {:?}", other),
        }
        assert!(matches!(seen.recv().await.unwrap(), StreamRequest::End));
    }

    #[tokio::test]
    async fn test_connect_failure_is_recognition_error() {
        // Port 1 on localhost: nothing listens there.
        let backend = RemoteRecognitionBackend::new("127.0.0.1:1");
        let err = backend
            .open(&RecognitionConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_recognition_failure());
        assert!(err.to_string().contains("Failed to connect"));
    }

    #[tokio::test]
    async fn test_garbage_from_backend_becomes_stream_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let mut line = String::new();
            // Consume the start line, then answer with garbage.
            reader.read_line(&mut line).await.unwrap();
            writer.write_all(b"definitely not json\n").await.unwrap();
            writer.flush().await.unwrap();
        });

        let backend = RemoteRecognitionBackend::new(&addr);
        let mut stream = backend.open(&RecognitionConfig::default()).await.unwrap();

        let event = stream.events.recv().await.unwrap();
        match event {
            RecognitionEvent::StreamError { message } => {
                assert!(message.contains("Unparsable backend event"));
            }
            other => panic!("expected stream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_cap_queues_second_open() {
        let (addr, _seen) = spawn_fixture(vec![RecognitionEvent::final_text("done")]).await;
        let backend = RemoteRecognitionBackend::with_max_streams(&addr, 1);
        let config = RecognitionConfig::default();

        let mut first = backend.open(&config).await.unwrap();

        // Second open must wait for the first stream's permit.
        let blocked = timeout(Duration::from_millis(50), backend.open(&config)).await;
        assert!(blocked.is_err(), "second stream should be waiting");

        // Finish the first stream; the permit frees once both halves close.
        drop(first.audio);
        while first.events.recv().await.is_some() {}

        let second = timeout(Duration::from_secs(2), backend.open(&config)).await;
        assert!(second.is_ok_and(|r| r.is_ok()));
    }

    #[test]
    fn test_stream_request_json_shapes() {
        let start = StreamRequest::Start {
            config: RecognitionConfig::default(),
        };
        let json = start.to_json().unwrap();
        assert!(json.contains(r#""type":"start""#));
        assert!(json.contains(r#""language_code":"en-US""#));
        assert!(json.contains(r#""encoding":"pcm""#));
        assert!(json.contains(r#""sample_rate_hz":16000"#));
        assert!(json.contains(r#""region":"us-east-1""#));

        let audio = StreamRequest::Audio {
            data: STANDARD.encode([1u8, 2, 3]),
        };
        assert_eq!(audio.to_json().unwrap(), r#"{"type":"audio","data":"AQID"}"#);

        assert_eq!(StreamRequest::End.to_json().unwrap(), r#"{"type":"end"}"#);
    }

    #[test]
    fn test_stream_request_roundtrip() {
        let requests = vec![
            StreamRequest::Start {
                config: RecognitionConfig::default(),
            },
            StreamRequest::Audio {
                data: "AQID".to_string(),
            },
            StreamRequest::End,
        ];
        for request in requests {
            let json = request.to_json().expect("should serialize");
            let back = StreamRequest::from_json(&json).expect("should deserialize");
            assert_eq!(request, back, "roundtrip failed for {:?}", request);
        }
    }
}
