//! Streaming speech recognition.
//!
//! One utterance flows through a session as two concurrent halves:
//! ```text
//! ┌─────────┐  frames   ┌──────────────┐  events   ┌──────────┐
//! │ Chunker │──────────▶│  Recognition │──────────▶│ Reducer  │──▶ transcript
//! │ (feed)  │  bounded  │   backend    │  bounded  │ (consume)│
//! └─────────┘  channel  └──────────────┘  channel  └──────────┘
//! ```
//! The feed half streams fixed-size frames into the backend and closes the
//! channel as end-of-input; the consume half folds partial/final events into
//! the transcript. Both halves run until the backend closes its event stream
//! or the session aborts.

pub mod backend;
pub mod event;
pub mod remote;
pub mod session;

pub use backend::{MockRecognitionBackend, RecognitionBackend, RecognitionConfig, RecognitionStream};
pub use event::RecognitionEvent;
pub use remote::RemoteRecognitionBackend;
pub use session::TranscriptionSession;
