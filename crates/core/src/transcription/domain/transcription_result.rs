use serde::{Deserialize, Serialize};

use super::model_error::{parse_object, ParseError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TranscriptionSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Response produced by the backend for a JSON request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<TranscriptionSegment>>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn default_success() -> bool {
    true
}

impl TranscriptionResult {
    /// Successful result carrying only text, as returned by the legacy protocol.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            segments: None,
            success: true,
            error: None,
            duration_ms: None,
            timestamp: None,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseError> {
        parse_object(bytes, &["text"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::domain::model_error::{DecodeError, SchemaError};
    use approx::assert_relative_eq;

    #[test]
    fn test_from_json_full_response() {
        let result = TranscriptionResult::from_json(
            br#"{
                "text": "hello world",
                "language": "en",
                "segments": [
                    {"start": 0.0, "end": 0.8, "text": "hello", "confidence": 0.9},
                    {"start": 0.8, "end": 1.5, "text": "world"}
                ],
                "success": true,
                "duration_ms": 1200,
                "timestamp": "2024-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(result.text, "hello world");
        assert_eq!(result.language.as_deref(), Some("en"));
        assert!(result.success);
        assert_eq!(result.duration_ms, Some(1200));
        assert_eq!(result.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));

        let segments = result.segments.unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello");
        assert_eq!(segments[1].confidence, None);
        assert_relative_eq!(segments[1].duration(), 0.7, epsilon = 1e-9);
    }

    #[test]
    fn test_from_json_minimal_defaults_to_success() {
        let result = TranscriptionResult::from_json(br#"{"text": ""}"#).unwrap();
        assert!(result.success);
        assert!(result.segments.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_from_json_ignores_unknown_fields() {
        let result =
            TranscriptionResult::from_json(br#"{"text":"hi","model":"tiny","extra":[1,2]}"#).unwrap();
        assert_eq!(result, TranscriptionResult::from_text("hi"));
    }

    #[test]
    fn test_from_json_failure_response() {
        let result = TranscriptionResult::from_json(
            br#"{"text":"","success":false,"error":"audio too short"}"#,
        )
        .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("audio too short"));
    }

    #[test]
    fn test_from_json_missing_text_is_schema_error() {
        let err = TranscriptionResult::from_json(br#"{"success":true}"#).unwrap_err();
        assert!(matches!(err, ParseError::Schema(SchemaError::MissingField("text"))));
    }

    #[test]
    fn test_from_json_not_json_is_decode_error() {
        let err = TranscriptionResult::from_json(b"hello world").unwrap_err();
        assert!(matches!(err, ParseError::Decode(DecodeError::Json(_))));
    }
}
