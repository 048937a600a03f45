pub mod audio_data;
pub mod model_error;
pub mod transcription_options;
pub mod transcription_request;
pub mod transcription_result;
