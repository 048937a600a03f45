use std::ffi::OsString;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use serde::Deserialize;

use super::child_io::{
    describe_exit, shutdown, spawn_banner_reader, spawn_output_collector, terminate, wait_for_exit,
    BannerOutcome, StderrDrain,
};
use crate::backend::domain::backend_error::BackendError;
use crate::backend::domain::session_config::SessionConfig;
use crate::backend::domain::transcription_backend::{SessionStatus, TranscriptionBackend};
use crate::framing::domain::legacy_frame::build_frame;
use crate::shared::constants::{DEFAULT_AUDIO_FORMAT, STDERR_GRACE, STDIN_CLOSE_GRACE};
use crate::transcription::domain::audio_data::{AudioData, AudioPayload};
use crate::transcription::domain::model_error::{DecodeError, ParseError};
use crate::transcription::domain::transcription_options::TranscriptionOptions;
use crate::transcription::domain::transcription_request::TranscriptionRequest;
use crate::transcription::domain::transcription_result::TranscriptionResult;

/// Startup line printed by the backend. Only `model_name` is of interest.
#[derive(Debug, Deserialize)]
struct StartupBanner {
    model_name: Option<String>,
}

enum SessionState {
    Unstarted,
    Running(RunningBackend),
    Stopped,
}

struct RunningBackend {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: StderrDrain,
    exchange_timeout: Option<Duration>,
    stop_timeout: Duration,
}

/// Backend session over a child process's stdin/stdout.
///
/// The backend is spawned as `<executable> [launcher args] <model> [--threads N] [--cpu-only]`,
/// prints a banner line, answers exactly one request and exits. The session
/// owns all three pipes for its whole lifetime.
pub struct ProcessBackendSession {
    executable: PathBuf,
    launcher_args: Vec<OsString>,
    model_name: Option<String>,
    state: SessionState,
}

impl ProcessBackendSession {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            launcher_args: Vec::new(),
            model_name: None,
            state: SessionState::Unstarted,
        }
    }

    /// Arguments placed before the model path, for running the backend
    /// through a wrapper such as `sh -c`.
    pub fn with_launcher_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.launcher_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::Unstarted => SessionStatus::Unstarted,
            SessionState::Running(_) => SessionStatus::Running,
            SessionState::Stopped => SessionStatus::Stopped,
        }
    }

    /// Model name reported in the startup banner, if it was JSON.
    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    /// Spawns the backend and waits for its startup banner.
    pub fn start(&mut self, model_path: &Path, config: &SessionConfig) -> Result<(), BackendError> {
        if !matches!(self.state, SessionState::Unstarted) {
            return Err(BackendError::AlreadyStarted);
        }
        if !model_path.exists() {
            return Err(BackendError::Startup {
                message: format!("model not found at: {}", model_path.display()),
                stderr: String::new(),
            });
        }

        let mut command = Command::new(&self.executable);
        command
            .args(&self.launcher_args)
            .args(config.backend_args(model_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        log::info!("Starting backend: {command:?}");

        let mut child = command.spawn().map_err(|e| BackendError::Startup {
            message: format!("failed to spawn {}: {e}", self.executable.display()),
            stderr: String::new(),
        })?;

        let (stdin, stdout, stderr) =
            match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
                (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
                _ => {
                    terminate(&mut child, config.stop_timeout());
                    return Err(BackendError::Startup {
                        message: "backend pipes are unavailable".to_string(),
                        stderr: String::new(),
                    });
                }
            };
        let stderr = StderrDrain::spawn(stderr);

        let timeout = config.startup_timeout();
        let stdout = match spawn_banner_reader(stdout).recv_timeout(timeout) {
            Ok(BannerOutcome::Line(line, reader)) => {
                self.model_name = parse_banner(&line);
                reader
            }
            Ok(BannerOutcome::Eof) => {
                let status = wait_for_exit(&mut child, config.stop_timeout())
                    .or_else(|| terminate(&mut child, config.stop_timeout()));
                return Err(BackendError::Startup {
                    message: format!(
                        "backend exited with {} before printing a startup banner",
                        describe_exit(status)
                    ),
                    stderr: stderr.collect(STDERR_GRACE),
                });
            }
            Ok(BannerOutcome::Failed(e)) => {
                terminate(&mut child, config.stop_timeout());
                return Err(BackendError::Startup {
                    message: format!("failed to read startup banner: {e}"),
                    stderr: stderr.collect(STDERR_GRACE),
                });
            }
            Err(RecvTimeoutError::Timeout) => {
                terminate(&mut child, config.stop_timeout());
                return Err(BackendError::Timeout {
                    operation: "print a startup banner",
                    timeout,
                    stderr: stderr.collect(STDERR_GRACE),
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                terminate(&mut child, config.stop_timeout());
                return Err(BackendError::Startup {
                    message: "startup banner reader stopped unexpectedly".to_string(),
                    stderr: stderr.collect(STDERR_GRACE),
                });
            }
        };

        self.state = SessionState::Running(RunningBackend {
            child,
            stdin,
            stdout,
            stderr,
            exchange_timeout: config.exchange_timeout(),
            stop_timeout: config.stop_timeout(),
        });
        Ok(())
    }

    /// Terminates the backend if it is running. Safe to call in any state.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Stopped) {
            SessionState::Running(running) => {
                let RunningBackend {
                    mut child,
                    stdin,
                    stop_timeout,
                    ..
                } = running;
                drop(stdin);
                log::info!("Stopping backend (pid {})", child.id());
                shutdown(&mut child, STDIN_CLOSE_GRACE, stop_timeout);
            }
            SessionState::Unstarted => self.state = SessionState::Unstarted,
            SessionState::Stopped => {}
        }
    }

    /// Writes one request, waits for the backend to exit, returns its stdout.
    /// The session is Stopped afterwards whatever the outcome.
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, BackendError> {
        match std::mem::replace(&mut self.state, SessionState::Stopped) {
            SessionState::Running(running) => running.exchange(request),
            other => {
                self.state = other;
                Err(BackendError::NotRunning)
            }
        }
    }
}

impl RunningBackend {
    fn exchange(self, request: &[u8]) -> Result<Vec<u8>, BackendError> {
        let RunningBackend {
            mut child,
            mut stdin,
            stdout,
            stderr,
            exchange_timeout,
            stop_timeout,
        } = self;

        let output = spawn_output_collector(stdout);

        log::debug!("Writing {} request bytes to backend", request.len());
        if let Err(e) = stdin.write_all(request).and_then(|()| stdin.flush()) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                log::warn!("Backend closed its input before reading the whole request");
            } else {
                terminate(&mut child, stop_timeout);
                return Err(BackendError::Io {
                    operation: "write the request",
                    source: e,
                });
            }
        }
        drop(stdin);

        let started_at = Instant::now();
        let received = match exchange_timeout {
            Some(timeout) => match output.recv_timeout(timeout) {
                Ok(received) => received,
                Err(RecvTimeoutError::Timeout) => {
                    terminate(&mut child, stop_timeout);
                    return Err(BackendError::Timeout {
                        operation: "finish the exchange",
                        timeout,
                        stderr: stderr.collect(STDERR_GRACE),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => Err(collector_stopped()),
            },
            None => output.recv().unwrap_or_else(|_| Err(collector_stopped())),
        };

        let response = match received {
            Ok(response) => response,
            Err(e) => {
                terminate(&mut child, stop_timeout);
                return Err(BackendError::Io {
                    operation: "read the response",
                    source: e,
                });
            }
        };

        let status = match exchange_timeout {
            Some(timeout) => {
                let remaining = timeout.saturating_sub(started_at.elapsed());
                match wait_for_exit(&mut child, remaining) {
                    Some(status) => status,
                    None => {
                        terminate(&mut child, stop_timeout);
                        return Err(BackendError::Timeout {
                            operation: "finish the exchange",
                            timeout,
                            stderr: stderr.collect(STDERR_GRACE),
                        });
                    }
                }
            }
            None => match child.wait() {
                Ok(status) => status,
                Err(e) => {
                    terminate(&mut child, stop_timeout);
                    return Err(BackendError::Io {
                        operation: "wait for the backend to exit",
                        source: e,
                    });
                }
            },
        };
        let stderr = stderr.collect(STDERR_GRACE);

        if !status.success() {
            return Err(BackendError::Transcription {
                status: status.code(),
                stderr,
            });
        }
        if !stderr.trim().is_empty() {
            log::debug!("Backend stderr: {}", stderr.trim());
        }

        log::debug!("Backend returned {} response bytes", response.len());
        Ok(response)
    }
}

impl TranscriptionBackend for ProcessBackendSession {
    fn transcribe_legacy(&mut self, audio: &[u8]) -> Result<String, BackendError> {
        let response = self.exchange(&build_frame(audio))?;
        let text = std::str::from_utf8(&response)
            .map_err(|e| BackendError::Response(ParseError::Decode(DecodeError::Utf8(e))))?;
        Ok(text.trim().to_string())
    }

    fn transcribe_json(
        &mut self,
        audio: AudioPayload,
        options: Option<TranscriptionOptions>,
    ) -> Result<TranscriptionResult, BackendError> {
        let request = TranscriptionRequest::new(
            AudioData::new(audio.into_base64(), DEFAULT_AUDIO_FORMAT),
            options,
        );
        let body = request.to_json().map_err(|e| BackendError::Io {
            operation: "encode the request",
            source: e.into(),
        })?;

        let response = self.exchange(&body)?;
        Ok(TranscriptionResult::from_json(&response)?)
    }
}

impl Drop for ProcessBackendSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn parse_banner(line: &str) -> Option<String> {
    match serde_json::from_str::<StartupBanner>(line) {
        Ok(banner) => {
            log::info!(
                "Backend started: {}",
                banner.model_name.as_deref().unwrap_or("unknown")
            );
            banner.model_name
        }
        Err(_) => {
            log::warn!("Backend started but its banner is not JSON: {line}");
            None
        }
    }
}

fn collector_stopped() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "backend output reader stopped unexpectedly")
}
