use super::legacy_frame::find_marker;

/// Wire framing of an opaque byte blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    LegacyFramed,
    Json,
    Unrecognized,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFormat::LegacyFramed => write!(f, "sot"),
            InputFormat::Json => write!(f, "json"),
            InputFormat::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Classifies a blob as legacy-framed, JSON, or neither.
///
/// A marker match wins over JSON parsing: legacy frames are never valid JSON
/// text, so a marker hit is unambiguous. Never fails.
pub fn detect(blob: &[u8]) -> InputFormat {
    if find_marker(blob).is_some() {
        return InputFormat::LegacyFramed;
    }

    let text = match std::str::from_utf8(blob) {
        Ok(text) => text,
        Err(_) => return InputFormat::Unrecognized,
    };

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(_) => InputFormat::Json,
        Err(_) => InputFormat::Unrecognized,
    }
}
