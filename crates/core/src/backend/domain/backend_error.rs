use std::time::Duration;

use thiserror::Error;

use crate::transcription::domain::model_error::ParseError;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend failed to start: {message}{}", stderr_suffix(.stderr))]
    Startup { message: String, stderr: String },
    #[error("backend did not {operation} within {timeout:?}{}", stderr_suffix(.stderr))]
    Timeout {
        operation: &'static str,
        timeout: Duration,
        stderr: String,
    },
    #[error("backend exited with {}{}", exit_code(.status), stderr_suffix(.stderr))]
    Transcription { status: Option<i32>, stderr: String },
    #[error("backend I/O failed while trying to {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid backend response: {0}")]
    Response(#[from] ParseError),
    #[error("backend session is not running")]
    NotRunning,
    #[error("backend session was already started")]
    AlreadyStarted,
}

impl BackendError {
    /// Captured standard-error output of the backend, when there is any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            BackendError::Startup { stderr, .. }
            | BackendError::Timeout { stderr, .. }
            | BackendError::Transcription { stderr, .. } => {
                Some(stderr.as_str()).filter(|s| !s.is_empty())
            }
            _ => None,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

fn exit_code(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no exit status (killed by signal)".to_string(),
    }
}
