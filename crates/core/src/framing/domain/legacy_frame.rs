use thiserror::Error;

use crate::shared::constants::LEGACY_MARKER;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("no SOT marker found in {len} bytes of input")]
    MarkerNotFound { len: usize },
}

/// Byte offset of the first legacy marker in `blob`, if any.
pub fn find_marker(blob: &[u8]) -> Option<usize> {
    blob.windows(LEGACY_MARKER.len())
        .position(|window| window == LEGACY_MARKER)
}

/// Returns the audio payload preceding the first marker.
///
/// Everything from the marker onwards, including trailing bytes after it,
/// is discarded.
pub fn extract_payload(blob: &[u8]) -> Result<&[u8], FramingError> {
    let position = find_marker(blob).ok_or(FramingError::MarkerNotFound { len: blob.len() })?;
    log::debug!("Legacy marker at offset {position}, payload is {position} bytes");
    Ok(&blob[..position])
}

/// Appends the legacy marker to raw audio bytes.
pub fn build_frame(raw: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(raw.len() + LEGACY_MARKER.len());
    frame.extend_from_slice(raw);
    frame.extend_from_slice(LEGACY_MARKER);
    frame
}
