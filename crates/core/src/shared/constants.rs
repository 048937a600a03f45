use std::time::Duration;

/// Delimiter terminating the audio payload in the legacy SOT protocol.
pub const LEGACY_MARKER: &[u8; 5] = b"\0SOT\0";

/// Container label attached to audio converted from legacy frames.
pub const DEFAULT_AUDIO_FORMAT: &str = "wav";

pub const DEFAULT_BACKEND_EXECUTABLE: &str = "whisper-background-server";

/// Ceiling for the backend to print its startup banner.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Ceiling for the backend to exit once termination was requested.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a stopping backend gets to exit on its own after stdin closes.
pub const STDIN_CLOSE_GRACE: Duration = Duration::from_millis(500);

/// How long to wait for the stderr drain after the process is gone.
pub const STDERR_GRACE: Duration = Duration::from_millis(500);

pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "auto", "zh", "de", "es", "ru", "ko", "fr", "ja", "pt", "tr", "pl", "ca",
];
