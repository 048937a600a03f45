use serde::{Deserialize, Serialize};

use super::audio_data::AudioData;
use super::model_error::{parse_object, ParseError};
use super::transcription_options::TranscriptionOptions;

/// JSON-side transcription request; the hub for every format conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    pub audio_data: AudioData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<TranscriptionOptions>,
}

impl TranscriptionRequest {
    pub fn new(audio_data: AudioData, options: Option<TranscriptionOptions>) -> Self {
        Self {
            audio_data,
            options,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseError> {
        parse_object(bytes, &["audio_data"])
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::domain::audio_data::AudioPayload;
    use crate::transcription::domain::model_error::{DecodeError, SchemaError};
    use serde_json::json;

    #[test]
    fn test_request_without_options_omits_key() {
        let request = TranscriptionRequest::new(
            AudioData::new(AudioPayload::Base64("QUJD".into()), "wav"),
            None,
        );
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"audio_data": {"data": "QUJD", "format": "wav"}})
        );
    }

    #[test]
    fn test_request_with_options() {
        let request = TranscriptionRequest::new(
            AudioData::new(AudioPayload::Base64("QUJD".into()), "wav"),
            Some(TranscriptionOptions::default().with_language("en")),
        );
        let value: serde_json::Value = serde_json::from_slice(&request.to_json().unwrap()).unwrap();
        assert_eq!(value["options"], json!({"language": "en"}));
    }

    #[test]
    fn test_from_json_base64() {
        let request = TranscriptionRequest::from_json(
            br#"{"audio_data":{"data":"dGVzdA==","format":"wav"},"options":{"language":"en","temperature":0.5}}"#,
        )
        .unwrap();
        assert_eq!(request.audio_data.decode().unwrap(), b"test");
        let options = request.options.unwrap();
        assert_eq!(options.language.as_deref(), Some("en"));
        assert_eq!(options.temperature, Some(0.5));
        assert_eq!(options.include_timestamps, None);
    }

    #[test]
    fn test_from_json_binary_minimal() {
        let request = TranscriptionRequest::from_json(br#"{"audio_data":{"data":[1,2,3]}}"#).unwrap();
        assert_eq!(request.audio_data.data, AudioPayload::Binary(vec![1, 2, 3]));
        assert!(request.options.is_none());
    }

    #[test]
    fn test_from_json_missing_audio_data() {
        let err = TranscriptionRequest::from_json(br#"{"options":{}}"#).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Schema(SchemaError::MissingField("audio_data"))
        ));
    }

    #[test]
    fn test_from_json_invalid_json() {
        let err = TranscriptionRequest::from_json(b"{invalid json}").unwrap_err();
        assert!(matches!(err, ParseError::Decode(DecodeError::Json(_))));
    }
}
