//! Client-facing JSON shapes for the HTTP and WebSocket endpoints.

use crate::error::{Result, ScribedError};
use serde::{Deserialize, Serialize};

/// Body of a batch transcription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribeRequest {
    /// Base64-encoded PCM audio. Absent when the client sent a body without
    /// the field.
    #[serde(
        rename = "audioData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub audio_data: Option<String>,
}

impl TranscribeRequest {
    /// Builds a request carrying the given base64 payload.
    pub fn new(audio_data: impl Into<String>) -> Self {
        Self {
            audio_data: Some(audio_data.into()),
        }
    }

    /// Serializes to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ScribedError::Other(format!("Failed to serialize request: {}", e)))
    }

    /// Deserializes from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScribedError::ClientInput {
            message: format!("Invalid request body: {}", e),
        })
    }
}

/// One reply per utterance, shared by the HTTP and WebSocket endpoints.
///
/// Serializes as `{"transcript": ...}` on success and `{"error": ...}` on
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UtteranceReply {
    /// The utterance was transcribed and durably stored.
    Transcript { transcript: String },
    /// The utterance failed; nothing was stored.
    Error { error: String },
}

impl UtteranceReply {
    /// Builds a success reply.
    pub fn transcript(text: impl Into<String>) -> Self {
        Self::Transcript {
            transcript: text.into(),
        }
    }

    /// Builds a failure reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// True for failure replies.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Serializes to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ScribedError::Other(format!("Failed to serialize reply: {}", e)))
    }

    /// Deserializes from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ScribedError::Other(format!("Failed to parse reply: {}", e)))
    }
}

/// Commands a streaming client sends as WebSocket text frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Marks the end of the current utterance; one reply follows.
    EndUtterance,
}

impl ClientCommand {
    /// Serializes to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ScribedError::Other(format!("Failed to serialize command: {}", e)))
    }

    /// Deserializes from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScribedError::ClientInput {
            message: format!("Unrecognized command: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_wire_field_name() {
        let request = TranscribeRequest::new("AQID");
        let json = request.to_json().unwrap();
        assert_eq!(json, r#"{"audioData":"AQID"}"#);
    }

    #[test]
    fn request_parses_missing_field_as_none() {
        let request = TranscribeRequest::from_json("{}").unwrap();
        assert!(request.audio_data.is_none());
    }

    #[test]
    fn request_ignores_unknown_fields() {
        let request =
            TranscribeRequest::from_json(r#"{"audioData":"AQID","sessionId":"x"}"#).unwrap();
        assert_eq!(request.audio_data.as_deref(), Some("AQID"));
    }

    #[test]
    fn request_rejects_malformed_json() {
        let err = TranscribeRequest::from_json("not json").unwrap_err();
        assert!(matches!(err, ScribedError::ClientInput { .. }));
    }

    #[test]
    fn transcript_reply_shape() {
        let reply = UtteranceReply::transcript("hello world");
        let json = reply.to_json().unwrap();
        assert_eq!(json, r#"{"transcript":"hello world"}"#);
        assert!(!reply.is_error());
    }

    #[test]
    fn error_reply_shape() {
        let reply = UtteranceReply::error("No audioData field found in event");
        let json = reply.to_json().unwrap();
        assert_eq!(json, r#"{"error":"No audioData field found in event"}"#);
        assert!(reply.is_error());
    }

    #[test]
    fn empty_transcript_is_still_a_success_reply() {
        let reply = UtteranceReply::transcript("");
        assert_eq!(reply.to_json().unwrap(), r#"{"transcript":""}"#);
        assert!(!reply.is_error());
    }

    #[test]
    fn reply_roundtrips_both_variants() {
        for reply in [
            UtteranceReply::transcript("hi"),
            UtteranceReply::error("boom"),
        ] {
            let json = reply.to_json().unwrap();
            assert_eq!(UtteranceReply::from_json(&json).unwrap(), reply);
        }
    }

    #[test]
    fn end_utterance_command_shape() {
        let json = ClientCommand::EndUtterance.to_json().unwrap();
        assert_eq!(json, r#"{"type":"end_utterance"}"#);
        assert_eq!(
            ClientCommand::from_json(&json).unwrap(),
            ClientCommand::EndUtterance
        );
    }

    #[test]
    fn unknown_command_is_a_client_error() {
        let err = ClientCommand::from_json(r#"{"type":"warp_drive"}"#).unwrap_err();
        assert!(matches!(err, ScribedError::ClientInput { .. }));
    }
}
