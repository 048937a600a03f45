use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::conversion::format_converter::{json_request_to_legacy_bytes, legacy_to_json_request};
use crate::framing::domain::input_format::{detect, InputFormat};
use crate::framing::domain::legacy_frame::FramingError;
use crate::transcription::domain::model_error::{DecodeError, ParseError};
use crate::transcription::domain::transcription_options::TranscriptionOptions;
use crate::transcription::domain::transcription_request::TranscriptionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Json,
    Legacy,
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(TargetFormat::Json),
            "sot" => Ok(TargetFormat::Legacy),
            other => Err(format!("invalid format '{other}', expected 'json' or 'sot'")),
        }
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetFormat::Json => write!(f, "json"),
            TargetFormat::Legacy => write!(f, "sot"),
        }
    }
}

/// Step of a conversion that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Read,
    Detection,
    Decode,
    Encode,
    Write,
}

impl std::fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConversionStage::Read => "read",
            ConversionStage::Detection => "detection",
            ConversionStage::Decode => "decode",
            ConversionStage::Encode => "encode",
            ConversionStage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("unknown input format, expected SOT-framed data or JSON")]
    UnrecognizedInput,
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error("invalid JSON request: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to serialize JSON output: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to read {source_name}: {source}")]
    Read {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    pub fn stage(&self) -> ConversionStage {
        match self {
            ConversionError::Read { .. } => ConversionStage::Read,
            ConversionError::UnrecognizedInput => ConversionStage::Detection,
            ConversionError::Framing(_) | ConversionError::Parse(_) | ConversionError::Decode(_) => {
                ConversionStage::Decode
            }
            ConversionError::Encode(_) => ConversionStage::Encode,
            ConversionError::Write { .. } => ConversionStage::Write,
        }
    }
}

/// Converts a blob to `target`; see [`ConvertUseCase::convert`].
pub fn convert_blob(
    input: &[u8],
    target: TargetFormat,
    options: Option<TranscriptionOptions>,
) -> Result<Vec<u8>, ConversionError> {
    ConvertUseCase::new(target, options).convert(input)
}

/// Conversion pipeline: detect → decode → re-encode for the target format.
pub struct ConvertUseCase {
    target: TargetFormat,
    options: Option<TranscriptionOptions>,
}

impl ConvertUseCase {
    /// `options` are attached only when a legacy frame is converted to JSON.
    pub fn new(target: TargetFormat, options: Option<TranscriptionOptions>) -> Self {
        Self { target, options }
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    pub fn convert(&self, input: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let format = detect(input);
        log::info!("Converting {format} input ({} bytes) to {}", input.len(), self.target);

        match (format, self.target) {
            (InputFormat::Unrecognized, _) => Err(ConversionError::UnrecognizedInput),
            (InputFormat::LegacyFramed, TargetFormat::Json) => {
                let request = legacy_to_json_request(input, self.options.clone())?;
                serde_json::to_vec_pretty(&request).map_err(ConversionError::Encode)
            }
            (InputFormat::LegacyFramed, TargetFormat::Legacy) => {
                log::info!("Input is already SOT-framed, passing it through unchanged");
                Ok(input.to_vec())
            }
            (InputFormat::Json, TargetFormat::Json) => {
                let value: serde_json::Value =
                    serde_json::from_slice(input).map_err(DecodeError::Json)?;
                serde_json::to_vec_pretty(&value).map_err(ConversionError::Encode)
            }
            (InputFormat::Json, TargetFormat::Legacy) => {
                let request = TranscriptionRequest::from_json(input)?;
                Ok(json_request_to_legacy_bytes(&request)?)
            }
        }
    }

    /// Converts `input_path` into `output_path`.
    ///
    /// The output is staged in a sibling `.part` file and renamed into place
    /// only after a complete write, so a failed run leaves no output behind.
    pub fn convert_file(&self, input_path: &Path, output_path: &Path) -> Result<(), ConversionError> {
        let input = fs::read(input_path).map_err(|e| ConversionError::Read {
            source_name: input_path.display().to_string(),
            source: e,
        })?;

        self.convert_to_file(&input, output_path)?;
        log::info!("Converted {} to {}", input_path.display(), output_path.display());
        Ok(())
    }

    /// Converts in-memory input and writes it to `output_path` through the
    /// same `.part` staging as [`Self::convert_file`].
    pub fn convert_to_file(&self, input: &[u8], output_path: &Path) -> Result<(), ConversionError> {
        let output = self.convert(input)?;
        write_atomically(output_path, &output)?;
        log::debug!("Wrote {} bytes to {}", output.len(), output_path.display());
        Ok(())
    }

    /// Reads `reader` to the end, converts, and writes the whole result.
    pub fn convert_stream<R: Read, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<(), ConversionError> {
        let mut input = Vec::new();
        reader
            .read_to_end(&mut input)
            .map_err(|e| ConversionError::Read {
                source_name: "input stream".to_string(),
                source: e,
            })?;

        let output = self.convert(&input)?;

        let stream_error = |e: std::io::Error| ConversionError::Write {
            path: "output stream".to_string(),
            source: e,
        };
        writer.write_all(&output).map_err(stream_error)?;
        writer.flush().map_err(stream_error)?;
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<(), ConversionError> {
    let temp_path = part_path(dest);
    let result = fs::write(&temp_path, bytes)
        .map_err(|e| ConversionError::Write {
            path: temp_path.display().to_string(),
            source: e,
        })
        .and_then(|()| {
            fs::rename(&temp_path, dest).map_err(|e| ConversionError::Write {
                path: dest.display().to_string(),
                source: e,
            })
        });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::domain::legacy_frame::build_frame;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    #[rstest]
    #[case::json("json", TargetFormat::Json)]
    #[case::sot("sot", TargetFormat::Legacy)]
    fn test_target_format_parses(#[case] name: &str, #[case] expected: TargetFormat) {
        assert_eq!(name.parse::<TargetFormat>().unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[test]
    fn test_target_format_rejects_unknown() {
        let err = "xml".parse::<TargetFormat>().unwrap_err();
        assert!(err.contains("xml"));
    }

    #[test]
    fn test_legacy_to_json_is_pretty_printed() {
        let output = convert_blob(b"ABC\0SOT\0", TargetFormat::Json, None).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains('\n'), "expected pretty output, got: {text}");
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"audio_data": {"data": "QUJD", "format": "wav"}}));
    }

    #[test]
    fn test_legacy_to_json_with_options() {
        let options = TranscriptionOptions::default()
            .with_language("en")
            .with_temperature(0.0);
        let output = convert_blob(b"ABC\0SOT\0", TargetFormat::Json, Some(options)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["options"], json!({"language": "en", "temperature": 0.0}));
    }

    #[test]
    fn test_json_to_json_normalizes_formatting() {
        let input = br#"{"audio_data":{"format":"wav","data":"QUJD"},"custom":1}"#;
        let output = convert_blob(input, TargetFormat::Json, None).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "{\n  \"audio_data\": {\n    \"format\": \"wav\",\n    \"data\": \"QUJD\"\n  },\n  \"custom\": 1\n}"
        );
    }

    #[test]
    fn test_json_to_json_ignores_options() {
        let input = br#"{"audio_data":{"data":"QUJD"}}"#;
        let options = TranscriptionOptions::default().with_language("en");
        let output = convert_blob(input, TargetFormat::Json, Some(options)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert!(value.get("options").is_none());
    }

    #[test]
    fn test_json_to_legacy() {
        let input = br#"{"audio_data":{"data":"QUJD","format":"wav"},"options":{"language":"en"}}"#;
        let output = convert_blob(input, TargetFormat::Legacy, None).unwrap();
        assert_eq!(output, b"ABC\0SOT\0".to_vec());
    }

    #[test]
    fn test_legacy_to_legacy_passes_through() {
        let input = b"ABC\0SOT\0trailer";
        let output = convert_blob(input, TargetFormat::Legacy, None).unwrap();
        assert_eq!(output, input.to_vec());
    }

    #[test]
    fn test_legacy_json_legacy_round_trip() {
        let payload: Vec<u8> = (0u8..=255).filter(|b| *b != 0).collect();
        let blob = build_frame(&payload);
        let options = TranscriptionOptions::default().with_include_timestamps(false);

        let json = convert_blob(&blob, TargetFormat::Json, Some(options)).unwrap();
        let back = convert_blob(&json, TargetFormat::Legacy, None).unwrap();
        assert_eq!(back, blob);
    }

    #[rstest]
    #[case::json_target(TargetFormat::Json)]
    #[case::legacy_target(TargetFormat::Legacy)]
    fn test_unrecognized_input_fails_detection(#[case] target: TargetFormat) {
        let err = convert_blob(b"not a frame", target, None).unwrap_err();
        assert!(matches!(err, ConversionError::UnrecognizedInput));
        assert_eq!(err.stage(), ConversionStage::Detection);
    }

    #[test]
    fn test_json_without_audio_data_fails_decode() {
        let err = convert_blob(br#"{"text":"hi"}"#, TargetFormat::Legacy, None).unwrap_err();
        assert!(matches!(err, ConversionError::Parse(_)));
        assert_eq!(err.stage(), ConversionStage::Decode);
    }

    #[test]
    fn test_json_with_bad_base64_fails_decode() {
        let err = convert_blob(br#"{"audio_data":{"data":"%%%"}}"#, TargetFormat::Legacy, None)
            .unwrap_err();
        assert!(matches!(err, ConversionError::Decode(DecodeError::Base64(_))));
        assert_eq!(err.stage(), ConversionStage::Decode);
    }

    #[test]
    fn test_convert_file_writes_output() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("audio.sot");
        let output = tmp.path().join("audio.json");
        fs::write(&input, b"ABC\0SOT\0").unwrap();

        ConvertUseCase::new(TargetFormat::Json, None)
            .convert_file(&input, &output)
            .unwrap();

        let request = TranscriptionRequest::from_json(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(request.audio_data.decode().unwrap(), b"ABC");
        assert!(!tmp.path().join("audio.json.part").exists());
    }

    #[test]
    fn test_convert_file_failure_leaves_no_output() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("garbage.bin");
        let output = tmp.path().join("out.json");
        fs::write(&input, b"garbage").unwrap();

        let err = ConvertUseCase::new(TargetFormat::Json, None)
            .convert_file(&input, &output)
            .unwrap_err();

        assert_eq!(err.stage(), ConversionStage::Detection);
        assert!(!output.exists());
        assert!(!tmp.path().join("out.json.part").exists());
    }

    #[test]
    fn test_convert_file_missing_input_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let err = ConvertUseCase::new(TargetFormat::Json, None)
            .convert_file(&tmp.path().join("missing.sot"), &tmp.path().join("out.json"))
            .unwrap_err();
        assert_eq!(err.stage(), ConversionStage::Read);
        assert!(err.to_string().contains("missing.sot"));
    }

    #[test]
    fn test_convert_file_unwritable_destination_is_write_error() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("audio.sot");
        fs::write(&input, b"ABC\0SOT\0").unwrap();
        let output = tmp.path().join("no_such_dir").join("audio.json");

        let err = ConvertUseCase::new(TargetFormat::Json, None)
            .convert_file(&input, &output)
            .unwrap_err();
        assert_eq!(err.stage(), ConversionStage::Write);
        assert!(!output.exists());
    }

    #[test]
    fn test_convert_file_replaces_existing_output() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("audio.json");
        let output = tmp.path().join("audio.sot");
        fs::write(&input, br#"{"audio_data":{"data":"QUJD"}}"#).unwrap();
        fs::write(&output, b"stale").unwrap();

        ConvertUseCase::new(TargetFormat::Legacy, None)
            .convert_file(&input, &output)
            .unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"ABC\0SOT\0".to_vec());
    }

    #[test]
    fn test_convert_to_file_writes_in_memory_input() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("audio.sot");

        ConvertUseCase::new(TargetFormat::Legacy, None)
            .convert_to_file(br#"{"audio_data":{"data":"QUJD"}}"#, &output)
            .unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"ABC\0SOT\0".to_vec());
        assert!(!tmp.path().join("audio.sot.part").exists());
    }

    #[test]
    fn test_convert_to_file_failed_rename_leaves_no_partial_output() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("taken");
        fs::create_dir(&output).unwrap();
        fs::write(output.join("keep"), b"x").unwrap();

        let err = ConvertUseCase::new(TargetFormat::Json, None)
            .convert_to_file(b"ABC\0SOT\0", &output)
            .unwrap_err();
        assert_eq!(err.stage(), ConversionStage::Write);
        assert!(output.is_dir());
        assert!(!tmp.path().join("taken.part").exists());
    }

    #[test]
    fn test_convert_stream() {
        let mut reader: &[u8] = br#"{"audio_data":{"data":[1,2,3]}}"#;
        let mut writer = Vec::new();
        ConvertUseCase::new(TargetFormat::Legacy, None)
            .convert_stream(&mut reader, &mut writer)
            .unwrap();
        assert_eq!(writer, b"\x01\x02\x03\0SOT\0".to_vec());
    }

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/out.json")),
            PathBuf::from("/tmp/out.json.part")
        );
    }
}
