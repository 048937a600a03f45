//! Translation between legacy SOT frames and JSON transcription requests.
//!
//! Legacy frames carry no options, so the JSON leg never invents them and the
//! legacy leg drops whatever options and metadata the request had.

use crate::framing::domain::legacy_frame::{build_frame, extract_payload, FramingError};
use crate::shared::constants::DEFAULT_AUDIO_FORMAT;
use crate::transcription::domain::audio_data::{AudioData, AudioPayload};
use crate::transcription::domain::model_error::DecodeError;
use crate::transcription::domain::transcription_options::TranscriptionOptions;
use crate::transcription::domain::transcription_request::TranscriptionRequest;

/// Wraps the payload of a legacy frame as a base64 "wav" request.
pub fn legacy_to_json_request(
    blob: &[u8],
    options: Option<TranscriptionOptions>,
) -> Result<TranscriptionRequest, FramingError> {
    let payload = extract_payload(blob)?;
    log::debug!("Converting {} legacy payload bytes to a JSON request", payload.len());

    Ok(TranscriptionRequest::new(
        AudioData::new(AudioPayload::from_bytes(payload), DEFAULT_AUDIO_FORMAT),
        options,
    ))
}

/// Decodes the request audio and frames it with the legacy marker.
pub fn json_request_to_legacy_bytes(
    request: &TranscriptionRequest,
) -> Result<Vec<u8>, DecodeError> {
    if request.options.is_some() {
        log::debug!("Dropping request options: legacy frames cannot carry them");
    }
    let audio = request.audio_data.decode()?;
    Ok(build_frame(&audio))
}
