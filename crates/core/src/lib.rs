pub mod backend;
pub mod conversion;
pub mod framing;
pub mod pipeline;
pub mod shared;
pub mod transcription;
