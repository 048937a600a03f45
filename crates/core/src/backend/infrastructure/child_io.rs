use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, ChildStdout, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Collects everything the backend writes to stderr on a background thread,
/// so a chatty backend never blocks on a full pipe.
pub(super) struct StderrDrain {
    rx: Receiver<String>,
}

impl StderrDrain {
    pub(super) fn spawn(mut stderr: ChildStderr) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut buf) {
                log::debug!("Backend stderr read failed: {e}");
            }
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        Self { rx }
    }

    /// Captured stderr. Call once the process has exited; waits at most
    /// `grace` in case a grandchild still holds the pipe open.
    pub(super) fn collect(self, grace: Duration) -> String {
        self.rx.recv_timeout(grace).unwrap_or_default()
    }
}

pub(super) enum BannerOutcome {
    Line(String, BufReader<ChildStdout>),
    Eof,
    Failed(io::Error),
}

/// Reads the first stdout line off-thread so the caller can bound the wait.
pub(super) fn spawn_banner_reader(stdout: ChildStdout) -> Receiver<BannerOutcome> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        let mut line = Vec::new();
        let outcome = match reader.read_until(b'\n', &mut line) {
            Ok(0) => BannerOutcome::Eof,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line).trim_end().to_string();
                BannerOutcome::Line(text, reader)
            }
            Err(e) => BannerOutcome::Failed(e),
        };
        let _ = tx.send(outcome);
    });
    rx
}

/// Reads stdout until the backend closes it.
pub(super) fn spawn_output_collector(
    mut stdout: BufReader<ChildStdout>,
) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = stdout.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });
    rx
}

/// Polls for exit until `timeout` elapses.
pub(super) fn wait_for_exit(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let status = poll_exit(child, timeout);
    if status.is_none() {
        log::warn!("Backend (pid {}) did not exit within {timeout:?}", child.id());
    }
    status
}

fn poll_exit(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to query backend exit status: {e}");
                return None;
            }
        }
    }
}

/// Gives a backend whose stdin was closed `grace` to exit by itself, then
/// falls back to [`terminate`].
pub(super) fn shutdown(child: &mut Child, grace: Duration, timeout: Duration) -> Option<ExitStatus> {
    if let Some(status) = poll_exit(child, grace) {
        log::debug!("Backend (pid {}) exited after its input closed", child.id());
        return Some(status);
    }
    terminate(child, timeout)
}

/// Kills the backend unless it already exited, then waits up to `timeout`.
pub(super) fn terminate(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    if let Ok(Some(status)) = child.try_wait() {
        return Some(status);
    }
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill backend (pid {}): {e}", child.id());
    }
    wait_for_exit(child, timeout)
}

pub(super) fn describe_exit(status: Option<ExitStatus>) -> String {
    match status.and_then(|s| s.code()) {
        Some(code) => format!("status {code}"),
        None => "an unknown status".to_string(),
    }
}
