use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::model_error::DecodeError;

/// Audio bytes as carried in a JSON request: a base64 string or a plain
/// array of byte values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudioPayload {
    Base64(String),
    Binary(Vec<u8>),
}

impl AudioPayload {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        AudioPayload::Base64(STANDARD.encode(bytes))
    }

    /// Raw audio bytes, decoding base64 when needed.
    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        match self {
            AudioPayload::Base64(data) => {
                let bytes = STANDARD.decode(data)?;
                log::debug!(
                    "Decoded {} base64 characters into {} audio bytes",
                    data.len(),
                    bytes.len()
                );
                Ok(bytes)
            }
            AudioPayload::Binary(bytes) => Ok(bytes.clone()),
        }
    }

    /// Normalizes to the base64 representation.
    pub fn into_base64(self) -> Self {
        match self {
            AudioPayload::Binary(bytes) => AudioPayload::from_bytes(&bytes),
            base64 => base64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioData {
    pub data: AudioPayload,
    /// Container label such as "wav".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl AudioData {
    pub fn new(data: AudioPayload, format: impl Into<String>) -> Self {
        Self {
            data,
            format: Some(format.into()),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        self.data.decode()
    }
}
