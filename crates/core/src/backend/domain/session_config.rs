use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{DEFAULT_STARTUP_TIMEOUT, DEFAULT_STOP_TIMEOUT};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read backend config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid backend config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for one backend process.
///
/// Loadable from a JSON file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Worker thread count passed to the backend as `--threads`.
    pub threads: Option<u32>,
    /// Disables hardware acceleration (`--cpu-only`).
    pub cpu_only: bool,
    pub startup_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    /// Upper bound for one request/response exchange. Unset waits for exit.
    pub exchange_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            threads: None,
            cpu_only: false,
            startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT.as_millis() as u64,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT.as_millis() as u64,
            exchange_timeout_ms: None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn exchange_timeout(&self) -> Option<Duration> {
        self.exchange_timeout_ms.map(Duration::from_millis)
    }

    /// Backend argv after the executable: model path, then translated flags.
    pub fn backend_args(&self, model_path: &Path) -> Vec<OsString> {
        let mut args = vec![model_path.as_os_str().to_os_string()];
        if let Some(threads) = self.threads {
            args.push("--threads".into());
            args.push(threads.to_string().into());
        }
        if self.cpu_only {
            args.push("--cpu-only".into());
        }
        args
    }
}
