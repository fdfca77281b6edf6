//! Focus sensor backed by a shell command.
//!
//! The command prints the focused application on its first line and the
//! window label on its second. A missing second line means an empty label.
//! A command that outlives its timeout is killed and the sample is skipped.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mlog_core::{Sample, Sensor, SensorError};

/// Time a single sensor command may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `sh -c <command>` once per sample.
#[derive(Debug, Clone)]
pub struct CommandSensor {
    command: String,
    timeout: Duration,
}

impl CommandSensor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Sensor for CommandSensor {
    fn sample(&mut self, now: DateTime<Utc>) -> Result<Sample, SensorError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let status = wait_with_timeout(&mut child, self.timeout)?;
        let stdout = read_pipe(child.stdout.take())?;
        if !status.success() {
            let stderr = read_pipe(child.stderr.take())?;
            return Err(SensorError::Unavailable {
                reason: format!("command failed with {status}: {}", stderr.trim()),
            });
        }
        parse_output(&stdout, now)
    }
}

/// Polls `child` until it exits, killing it once `timeout` has passed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, SensorError> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "failed to kill sensor command");
            }
            child.wait()?;
            return Err(SensorError::Unavailable {
                reason: format!("command timed out after {} ms", timeout.as_millis()),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn read_pipe(pipe: Option<impl Read>) -> Result<String, SensorError> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Parses sensor output into a sample.
pub fn parse_output(stdout: &str, now: DateTime<Utc>) -> Result<Sample, SensorError> {
    let mut lines = stdout.lines().map(str::trim);
    let application = lines
        .next()
        .filter(|app| !app.is_empty())
        .ok_or_else(|| SensorError::Unavailable {
            reason: "no focused application".to_string(),
        })?;
    let label = lines.next().unwrap_or_default();
    Ok(Sample::new(application, label, now))
}
