pub mod convert_use_case;
pub mod transcribe_audio_use_case;
