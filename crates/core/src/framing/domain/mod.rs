pub mod input_format;
pub mod legacy_frame;
