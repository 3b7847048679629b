//! Subprocess help probing.
//!
//! Every probe runs with a pager-disabling, locale-pinning environment and a
//! hard wall-clock budget. Both output streams are captured: many tools print
//! usage text to stderr.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Environment forced onto every probe so nothing blocks on a pager or
/// produces localized text.
const PROBE_ENV: &[(&str, &str)] = &[
    ("PAGER", "cat"),
    ("MANPAGER", "cat"),
    ("GIT_PAGER", "cat"),
    ("LC_ALL", "C"),
];

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe process error: {0}")]
    Process(#[from] std::io::Error),
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// One subprocess invocation issued to elicit help text.
///
/// Implementations return the combined stdout+stderr capture; callers treat
/// any error as "no output" and move on to the next switch.
pub trait Prober {
    fn run(&self, exe: &Path, args: &[String], working_dir: &Path) -> Result<String, ProbeError>;
}

/// Real prober backed by `std::process::Command`.
pub struct HelpProber {
    pub timeout: Duration,
}

impl HelpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Prober for HelpProber {
    fn run(&self, exe: &Path, args: &[String], working_dir: &Path) -> Result<String, ProbeError> {
        let mut command = Command::new(exe);
        command
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in PROBE_ENV {
            command.env(key, value);
        }

        let mut child = command.spawn()?;

        // Drain both pipes on background threads so a chatty child cannot
        // deadlock against a full pipe buffer before it exits.
        let stdout_thread = child.stdout.take().map(drain_pipe);
        let stderr_thread = child.stderr.take().map(drain_pipe);

        match wait_with_timeout(&mut child, self.timeout) {
            Ok(Some(_status)) => {
                let stdout = join_drained(stdout_thread);
                let stderr = join_drained(stderr_thread);
                let mut combined = String::from_utf8_lossy(&stdout).into_owned();
                combined.push('\n');
                combined.push_str(&String::from_utf8_lossy(&stderr));
                Ok(combined)
            }
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ProbeError::Timeout(self.timeout))
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ProbeError::Process(err))
            }
        }
    }
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_drained(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|thread| thread.join().ok())
        .unwrap_or_default()
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
