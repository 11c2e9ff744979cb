//! HTTP/WebSocket gateway serving the transcription endpoints.

use crate::audio::AudioBuffer;
use crate::defaults;
use crate::error::{Result, ScribedError};
use crate::gateway::protocol::{ClientCommand, TranscribeRequest, UtteranceReply};
use crate::gateway::session::{ClientSession, SessionState};
use crate::recognition::{RecognitionBackend, RecognitionConfig, TranscriptionSession};
use crate::store::Persister;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Shared state behind every gateway endpoint.
pub struct GatewayState {
    backend: Arc<dyn RecognitionBackend>,
    persister: Persister,
    recognition: RecognitionConfig,
    frame_bytes: usize,
    idle_timeout: Duration,
}

impl GatewayState {
    /// Creates gateway state with default recognition parameters.
    pub fn new(backend: Arc<dyn RecognitionBackend>, persister: Persister) -> Self {
        Self {
            backend,
            persister,
            recognition: RecognitionConfig::default(),
            frame_bytes: defaults::FRAME_BYTES,
            idle_timeout: Duration::from_millis(defaults::IDLE_TIMEOUT_MS),
        }
    }

    /// Sets the parameters announced to the recognition backend.
    pub fn with_recognition(mut self, recognition: RecognitionConfig) -> Self {
        self.recognition = recognition;
        self
    }

    /// Sets the frame size used when chunking utterances.
    pub fn with_frame_bytes(mut self, frame_bytes: usize) -> Self {
        self.frame_bytes = frame_bytes;
        self
    }

    /// Sets how long a session waits for the next backend event.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn session(&self) -> TranscriptionSession<Arc<dyn RecognitionBackend>> {
        TranscriptionSession::with_config(Arc::clone(&self.backend), self.recognition.clone())
            .with_frame_bytes(self.frame_bytes)
            .with_idle_timeout(self.idle_timeout)
    }

    /// Runs one utterance end to end: recognize, persist, hand back the text.
    ///
    /// The transcript is returned only after it is durably stored, so a
    /// persistence failure fails the whole utterance and nothing is reported
    /// to the client.
    pub async fn transcribe_utterance(&self, audio: &AudioBuffer) -> Result<String> {
        let transcript = self
            .session()
            .run_with_progress(audio, |partial| {
                trace!(text = partial, "partial hypothesis");
            })
            .await?;
        let record = self.persister.persist_transcript(&transcript).await?;
        debug!(
            id = %record.id,
            chars = transcript.len(),
            "utterance transcribed and stored"
        );
        Ok(transcript)
    }
}

/// Builds the gateway router with every endpoint wired to the shared state.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/transcribe", post(transcribe_handler))
        .route("/stream", get(stream_handler))
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "ok"})) }),
        )
        .with_state(state)
}

/// Binds the listen address and serves until SIGINT or SIGTERM.
pub async fn run_gateway(state: Arc<GatewayState>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, "gateway listening");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        _ = wait_for_sigterm() => {
            info!("received SIGTERM, shutting down");
        }
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "failed to register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    // Ctrl+C still works on non-Unix.
    std::future::pending::<()>().await;
}

async fn transcribe_handler(
    State(state): State<Arc<GatewayState>>,
    body: Option<Json<TranscribeRequest>>,
) -> (StatusCode, Json<UtteranceReply>) {
    match decode_request(body) {
        Ok(audio) => match state.transcribe_utterance(&audio).await {
            Ok(transcript) => (StatusCode::OK, Json(UtteranceReply::transcript(transcript))),
            Err(e) => {
                warn!(error = %e, "transcription request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(UtteranceReply::error(e.to_string())),
                )
            }
        },
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(UtteranceReply::error(e.to_string())),
        ),
    }
}

/// Pulls the audio out of a request body, treating an unreadable body the
/// same as one without the field.
fn decode_request(body: Option<Json<TranscribeRequest>>) -> Result<AudioBuffer> {
    let payload = body
        .and_then(|Json(request)| request.audio_data)
        .ok_or_else(|| ScribedError::ClientInput {
            message: "No audioData field found in event".to_string(),
        })?;
    AudioBuffer::from_base64(&payload)
}

async fn stream_handler(
    State(state): State<Arc<GatewayState>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_stream(state, socket))
}

/// Drives one streaming connection through the utterance cycle.
///
/// Binary frames accumulate audio; an `end_utterance` text frame hands the
/// buffer to a spawned recognition task so the receive loop keeps draining
/// the socket while the utterance is in flight. Each utterance gets exactly
/// one JSON reply.
async fn handle_stream(state: Arc<GatewayState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = ClientSession::new();
    let (reply_tx, mut reply_rx) = mpsc::channel::<UtteranceReply>(1);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Binary(data))) => {
                        session.push_audio(&data);
                    }
                    Some(Ok(Message::Text(text))) => match ClientCommand::from_json(&text) {
                        Ok(ClientCommand::EndUtterance) => match session.end_utterance() {
                            Ok(audio) => {
                                in_flight = Some(spawn_utterance(
                                    Arc::clone(&state),
                                    audio,
                                    reply_tx.clone(),
                                ));
                            }
                            Err(e) => {
                                if send_reply(&mut sender, &UtteranceReply::error(e.to_string()))
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                        },
                        Err(e) => {
                            if send_reply(&mut sender, &UtteranceReply::error(e.to_string()))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket receive failed");
                        break;
                    }
                }
            }
            Some(reply) = reply_rx.recv() => {
                in_flight = None;
                session.reply_sent();
                if send_reply(&mut sender, &reply).await.is_err() {
                    break;
                }
            }
        }
    }

    // Disconnect. An in-flight utterance can no longer be answered; audio
    // that was streamed but never ended counts as ended by the close.
    if let Some(task) = in_flight.take() {
        task.abort();
    }
    if session.state() == SessionState::Streaming {
        if let Ok(audio) = session.end_utterance() {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                match state.transcribe_utterance(&audio).await {
                    Ok(transcript) => {
                        debug!(chars = transcript.len(), "utterance flushed after disconnect");
                    }
                    Err(e) => warn!(error = %e, "disconnect flush failed"),
                }
            });
        }
    }
    session.close();
    debug!("stream connection closed");
}

fn spawn_utterance(
    state: Arc<GatewayState>,
    audio: AudioBuffer,
    reply_tx: mpsc::Sender<UtteranceReply>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reply = match state.transcribe_utterance(&audio).await {
            Ok(transcript) => UtteranceReply::transcript(transcript),
            Err(e) => {
                warn!(error = %e, "streamed utterance failed");
                UtteranceReply::error(e.to_string())
            }
        };
        let _ = reply_tx.send(reply).await;
    })
}

async fn send_reply(
    sender: &mut SplitSink<WebSocket, Message>,
    reply: &UtteranceReply,
) -> std::result::Result<(), axum::Error> {
    let json = reply
        .to_json()
        .unwrap_or_else(|_| r#"{"error":"Failed to serialize reply"}"#.to_string());
    sender.send(Message::Text(json)).await
}
