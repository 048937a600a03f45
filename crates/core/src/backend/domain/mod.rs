pub mod backend_error;
pub mod session_config;
pub mod transcription_backend;
