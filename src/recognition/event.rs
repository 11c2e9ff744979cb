//! Event vocabulary shared by all recognition backends.
//!
//! The serde shape doubles as the wire format of the remote backend, so the
//! tags here are load-bearing: `partial`, `final` and `error` are what a
//! backend actually writes on its side of the stream.

use serde::{Deserialize, Serialize};

/// One event on a recognition stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecognitionEvent {
    /// Provisional hypothesis for the segment currently being recognized.
    /// May be revised or replaced; never part of the transcript.
    Partial { text: String },
    /// Confirmed hypothesis for a completed segment.
    ///
    /// `text` is the backend's top-ranked alternative and the only part that
    /// enters the transcript. Lower-ranked alternatives ride along for
    /// logging and debugging.
    Final {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        alternatives: Vec<String>,
    },
    /// Backend-side failure. Terminates the stream and invalidates every
    /// segment already received for this utterance.
    #[serde(rename = "error")]
    StreamError { message: String },
}

impl RecognitionEvent {
    /// Shorthand for a final event without extra alternatives.
    pub fn final_text(text: &str) -> Self {
        RecognitionEvent::Final {
            text: text.to_string(),
            alternatives: Vec::new(),
        }
    }

    /// Serialize event to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
