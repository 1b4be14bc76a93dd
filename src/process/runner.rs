use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};

#[derive(Debug, Clone)]
pub struct ProcessRequest {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  pub timeout: Duration,
}

impl ProcessRequest {
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
  /// `None` when the process was killed by a signal or timed out.
  pub code: Option<i32>,
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
  pub timed_out: bool,
}

impl ProcessOutput {
  pub fn timed_out() -> Self {
    Self {
      timed_out: true,
      ..Self::default()
    }
  }
}

/// Runs an external command to completion or until its timeout expires.
/// A timeout is reported through [`ProcessOutput::timed_out`], not as an error.
pub trait ProcessRunner {
  async fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

impl ProcessRunner for TokioRunner {
  async fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
    info!(
      "running `{}` in {} (timeout {}s)",
      request.command_line(),
      request.cwd.display(),
      request.timeout.as_secs()
    );

    let child = Command::new(&request.program)
      .args(&request.args)
      .current_dir(&request.cwd)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| AgentError::Process(format!("failed to spawn {}: {e}", request.program)))?;

    // Dropping the pending future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(request.timeout, child.wait_with_output()).await {
      Ok(output) => output?,
      Err(_) => {
        warn!(
          "`{}` timed out after {}s, killing",
          request.command_line(),
          request.timeout.as_secs()
        );
        return Ok(ProcessOutput::timed_out());
      }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    debug!(
      "`{}` exited with {}: {} bytes stdout, {} bytes stderr",
      request.command_line(),
      output.status,
      stdout.len(),
      stderr.len()
    );

    Ok(ProcessOutput {
      code: output.status.code(),
      success: output.status.success(),
      stdout,
      stderr,
      timed_out: false,
    })
  }
}
