use std::str::FromStr;

use crate::backend::domain::transcription_backend::TranscriptionBackend;
use crate::framing::domain::input_format::{detect, InputFormat};
use crate::framing::domain::legacy_frame::extract_payload;
use crate::transcription::domain::audio_data::AudioPayload;
use crate::transcription::domain::transcription_options::TranscriptionOptions;
use crate::transcription::domain::transcription_request::TranscriptionRequest;
use crate::transcription::domain::transcription_result::TranscriptionResult;

/// Dialect used to talk to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Legacy,
    Json,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sot" => Ok(Protocol::Legacy),
            "json" => Ok(Protocol::Json),
            other => Err(format!("invalid protocol '{other}', expected 'json' or 'sot'")),
        }
    }
}

/// Single-request transcription: classify input → extract audio → validate
/// options → exchange with the backend.
pub struct TranscribeAudioUseCase {
    backend: Box<dyn TranscriptionBackend>,
    protocol: Protocol,
    options: Option<TranscriptionOptions>,
}

impl TranscribeAudioUseCase {
    pub fn new(
        backend: Box<dyn TranscriptionBackend>,
        protocol: Protocol,
        options: Option<TranscriptionOptions>,
    ) -> Self {
        Self {
            backend,
            protocol,
            options,
        }
    }

    /// Accepts a legacy frame, a JSON request, or raw audio bytes.
    ///
    /// Options given to the use case win over options embedded in a JSON
    /// request. A result reporting `success: false` is returned as an error.
    pub fn execute(&mut self, input: &[u8]) -> Result<TranscriptionResult, Box<dyn std::error::Error>> {
        let (audio, embedded_options) = match detect(input) {
            InputFormat::LegacyFramed => (extract_payload(input)?.to_vec(), None),
            InputFormat::Json => {
                let request = TranscriptionRequest::from_json(input)?;
                (request.audio_data.decode()?, request.options)
            }
            InputFormat::Unrecognized => (input.to_vec(), None),
        };
        log::debug!("Transcribing {} audio bytes via {:?}", audio.len(), self.protocol);

        let options = self.options.clone().or(embedded_options);
        if let Some(options) = &options {
            options.validate()?;
        }

        let result = match self.protocol {
            Protocol::Legacy => {
                if options.is_some() {
                    log::warn!("Transcription options are ignored by the legacy protocol");
                }
                TranscriptionResult::from_text(self.backend.transcribe_legacy(&audio)?)
            }
            Protocol::Json => self
                .backend
                .transcribe_json(AudioPayload::from_bytes(&audio), options)?,
        };

        if !result.success {
            let message = result
                .error
                .unwrap_or_else(|| "backend reported an unsuccessful transcription".to_string());
            return Err(message.into());
        }
        Ok(result)
    }
}
