use super::backend_error::BackendError;
use crate::transcription::domain::audio_data::AudioPayload;
use crate::transcription::domain::transcription_options::TranscriptionOptions;
use crate::transcription::domain::transcription_result::TranscriptionResult;

/// Lifecycle of a backend session: `Unstarted → Running → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unstarted,
    Running,
    Stopped,
}

/// Domain interface for one request/response exchange with a transcription
/// backend, in either protocol dialect.
///
/// Each exchange is one-shot: the backend answers a single request and exits.
pub trait TranscriptionBackend {
    /// Sends `audio` as a legacy SOT frame and returns the backend's text output.
    fn transcribe_legacy(&mut self, audio: &[u8]) -> Result<String, BackendError>;

    /// Sends a JSON request and parses the JSON response.
    fn transcribe_json(
        &mut self,
        audio: AudioPayload,
        options: Option<TranscriptionOptions>,
    ) -> Result<TranscriptionResult, BackendError>;
}
