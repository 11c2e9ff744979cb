//! Client-facing gateway: HTTP batch endpoint, WebSocket streaming endpoint,
//! and the per-connection lifecycle that keeps them honest.
//!
//! ```text
//! POST /transcribe ──► decode ──► TranscriptionSession ──► Persister ──► reply
//!
//! GET /stream ──► ClientSession (Open → Streaming → Finalizing → ...)
//!                    binary frames buffer audio
//!                    {"type":"end_utterance"} finalizes one utterance
//!                    one {"transcript"} or {"error"} reply per utterance
//! ```

pub mod protocol;
pub mod server;
pub mod session;

pub use protocol::{ClientCommand, TranscribeRequest, UtteranceReply};
pub use server::{GatewayState, router, run_gateway};
pub use session::{ClientSession, SessionState};
