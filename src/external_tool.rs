//! Argument-vector subprocesses with a deadline.

use crate::error::{NpSearchError, Result};
use std::{
    io::{ErrorKind, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};
use tempfile::{NamedTempFile, TempDir};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Completed(ToolOutput),
    TimedOut,
}

fn describe(command: &Command) -> String {
    let mut ret = command.get_program().to_string_lossy().to_string();
    for arg in command.get_args() {
        ret.push(' ');
        ret.push_str(&arg.to_string_lossy());
    }
    ret
}

fn read_back(file: &mut NamedTempFile) -> Result<String> {
    let handle = file.as_file_mut();
    handle.seek(SeekFrom::Start(0))?;
    let mut bytes = vec![];
    handle.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Scratch directory for one tool call under `root`, removed when dropped.
pub fn scratch_dir(root: &Path, prefix: &str) -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir_in(root)?)
}

/// Runs `command` until it exits or `timeout` elapses.
///
/// Output is collected in temporary files inside `scratch` rather than pipes
/// so a chatty child can never block on a full pipe. A child still running at
/// the deadline is killed and reaped before `TimedOut` is returned.
pub fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
    scratch: &Path,
) -> Result<ToolOutcome> {
    let mut stdout = NamedTempFile::new_in(scratch)?;
    let mut stderr = NamedTempFile::new_in(scratch)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout.reopen()?))
        .stderr(Stdio::from(stderr.reopen()?));

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            NpSearchError::Configuration(format!(
                "Could not find executable for '{}'",
                describe(&command)
            ))
        } else {
            NpSearchError::ExternalTool(format!("Could not run '{}': {e}", describe(&command)))
        }
    })?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            // The child may exit between try_wait and kill
            let _ = child.kill();
            child.wait()?;
            log::debug!("'{}' killed after {:?}", describe(&command), timeout);
            return Ok(ToolOutcome::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(ToolOutcome::Completed(ToolOutput {
        status,
        stdout: read_back(&mut stdout)?,
        stderr: read_back(&mut stderr)?,
    }))
}

/// Turns a non-zero exit into an [`NpSearchError::ExternalTool`].
pub fn require_success(tool: &str, output: ToolOutput) -> Result<ToolOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(NpSearchError::ExternalTool(format!(
            "{tool} failed (status={:?}, stderr='{}')",
            output.status.code(),
            output.stderr.trim()
        )))
    }
}

/// Resolves `executable` to a runnable file, searching `PATH` for bare names.
pub fn ensure_executable(executable: &str) -> Result<PathBuf> {
    which::which(executable).map_err(|e| {
        NpSearchError::Configuration(format!(
            "Could not find an executable '{executable}' ({e}). Install it or set its path"
        ))
    })
}
