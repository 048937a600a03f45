use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::SUPPORTED_LANGUAGES;

/// Decoding options forwarded to the backend with a JSON request.
///
/// Every field is optional and only fields that were explicitly set are
/// serialized. `Some(false)` and `None` are different requests: the first
/// overrides the backend default, the second leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOptions {
    /// Language code, e.g. "en".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_to_english: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_timestamps: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0-1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_beam_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beam_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_blank: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_timestamps: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid transcription options: {}", format_violations(.violations))]
pub struct OptionsValidationError {
    pub violations: Vec<FieldViolation>,
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(FieldViolation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl TranscriptionOptions {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_translate_to_english(mut self, translate: bool) -> Self {
        self.translate_to_english = Some(translate);
        self
    }

    pub fn with_include_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = Some(include);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_beam_search(mut self, beam_size: u32) -> Self {
        self.use_beam_search = Some(true);
        self.beam_size = Some(beam_size);
        self
    }

    pub fn with_suppress_blank(mut self, suppress: bool) -> Self {
        self.suppress_blank = Some(suppress);
        self
    }

    pub fn with_word_timestamps(mut self, enabled: bool) -> Self {
        self.word_timestamps = Some(enabled);
        self
    }

    /// True when no field has been set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Checks every set field against the backend's accepted ranges and
    /// reports all violations together.
    pub fn validate(&self) -> Result<(), OptionsValidationError> {
        let mut violations = Vec::new();

        if let Some(language) = &self.language {
            if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
                violations.push(FieldViolation {
                    field: "language",
                    message: format!(
                        "unsupported language code '{language}', expected one of {}",
                        SUPPORTED_LANGUAGES.join(", ")
                    ),
                });
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                violations.push(FieldViolation {
                    field: "temperature",
                    message: format!("{temperature} is outside 0.0-1.0"),
                });
            }
        }

        if self.beam_size == Some(0) {
            violations.push(FieldViolation {
                field: "beam_size",
                message: "must be greater than 0".to_string(),
            });
        }

        if self.max_tokens == Some(0) {
            violations.push(FieldViolation {
                field: "max_tokens",
                message: "must be greater than 0".to_string(),
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(OptionsValidationError { violations })
        }
    }
}
