use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Bytes that could not be decoded into the expected representation.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 audio data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid UTF-8 text: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
}

/// Well-formed JSON that does not have the expected shape.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unexpected field shape: {0}")]
    Mismatch(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Parses `bytes` as a JSON object carrying every field in `required`, then
/// maps it onto `T`. Unknown fields are left to `T`'s serde attributes.
pub(crate) fn parse_object<T: DeserializeOwned>(
    bytes: &[u8],
    required: &[&'static str],
) -> Result<T, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(DecodeError::from)?;
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Json)?;

    let object = value.as_object().ok_or(SchemaError::NotAnObject)?;
    if let Some(missing) = required.iter().find(|field| !object.contains_key(**field)) {
        return Err(SchemaError::MissingField(*missing).into());
    }

    serde_json::from_value(value).map_err(|e| SchemaError::Mismatch(e).into())
}
