use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{split_command, Config};
use crate::error::{AgentError, Result};
use crate::process::{ProcessOutput, ProcessRequest, ProcessRunner};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
  Passed,
  Failed,
  TimedOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
  pub outcome: ValidationOutcome,
  /// `None` when the formatter never ran.
  pub formatted: Option<bool>,
  #[serde(skip)]
  pub diagnostics: String,
}

impl ValidationResult {
  pub fn passed(&self) -> bool {
    self.outcome == ValidationOutcome::Passed
  }
}

/// Test run followed, on success only, by the formatter. Single attempt, no retries.
pub struct ValidationGate<'a, R> {
  runner: &'a R,
  config: &'a Config,
}

impl<'a, R: ProcessRunner> ValidationGate<'a, R> {
  pub fn new(runner: &'a R, config: &'a Config) -> Self {
    Self { runner, config }
  }

  pub async fn validate(&self, repo_root: &Path) -> ValidationResult {
    let cwd = repo_root.join(&self.config.build_dir);

    let test = match self
      .run_step(&self.config.test_command, &cwd, self.config.test_timeout())
      .await
    {
      Ok(output) => output,
      Err(e) => {
        error!("test runner failed to start: {e}");
        return ValidationResult {
          outcome: ValidationOutcome::Failed,
          formatted: None,
          diagnostics: e.to_string(),
        };
      }
    };

    if test.timed_out {
      warn!("tests did not finish within {}s", self.config.test_timeout_secs);
      return ValidationResult {
        outcome: ValidationOutcome::TimedOut,
        formatted: None,
        diagnostics: format!("tests timed out after {}s", self.config.test_timeout_secs),
      };
    }
    if !test.success {
      error!("tests failed (exit code {:?})", test.code);
      return ValidationResult {
        outcome: ValidationOutcome::Failed,
        formatted: None,
        diagnostics: test.stderr,
      };
    }
    info!("tests passed");

    let formatted = match self
      .run_step(&self.config.format_command, &cwd, self.config.format_timeout())
      .await
    {
      Ok(output) if output.success => {
        info!("code formatted");
        true
      }
      Ok(output) => {
        warn!(
          "formatter failed (exit code {:?}, timed out: {}): {}",
          output.code,
          output.timed_out,
          output.stderr.trim()
        );
        false
      }
      Err(e) => {
        warn!("formatter failed to start: {e}");
        false
      }
    };

    if !formatted && self.config.require_format {
      return ValidationResult {
        outcome: ValidationOutcome::Failed,
        formatted: Some(false),
        diagnostics: "formatter failed and require_format is set".into(),
      };
    }

    ValidationResult {
      outcome: ValidationOutcome::Passed,
      formatted: Some(formatted),
      diagnostics: test.stdout,
    }
  }

  async fn run_step(&self, command: &str, cwd: &Path, timeout: Duration) -> Result<ProcessOutput> {
    let (program, args) = split_command(command)
      .ok_or_else(|| AgentError::Config(format!("empty command: {command:?}")))?;
    let request = ProcessRequest {
      program,
      args,
      cwd: cwd.to_path_buf(),
      timeout,
    };
    self.runner.run(&request).await
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::collections::VecDeque;
  use std::sync::Mutex;

  use super::*;

  /// Replays canned outputs in order and records every command it was asked to run.
  pub(crate) struct StubRunner {
    outputs: Mutex<VecDeque<Result<ProcessOutput>>>,
    pub calls: Mutex<Vec<ProcessRequest>>,
  }

  impl StubRunner {
    pub(crate) fn new(outputs: Vec<Result<ProcessOutput>>) -> Self {
      Self {
        outputs: Mutex::new(outputs.into()),
        calls: Mutex::new(Vec::new()),
      }
    }

    pub(crate) fn programs(&self) -> Vec<String> {
      self
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(ProcessRequest::command_line)
        .collect()
    }
  }

  impl ProcessRunner for StubRunner {
    async fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
      self.calls.lock().unwrap().push(request.clone());
      self
        .outputs
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| panic!("unexpected call: {}", request.command_line()))
    }
  }

  pub(crate) fn exit(code: i32) -> Result<ProcessOutput> {
    Ok(ProcessOutput {
      code: Some(code),
      success: code == 0,
      stdout: String::new(),
      stderr: format!("exit {code}"),
      timed_out: false,
    })
  }

  #[tokio::test]
  async fn test_failed_tests_skip_formatter() {
    let runner = StubRunner::new(vec![exit(101)]);
    let config = Config::default();
    let result = ValidationGate::new(&runner, &config)
      .validate(Path::new("/repo"))
      .await;

    assert_eq!(result.outcome, ValidationOutcome::Failed);
    assert_eq!(result.formatted, None);
    assert_eq!(runner.programs(), vec!["cargo test --verbose"]);
  }

  #[tokio::test]
  async fn test_timeout_skips_formatter() {
    let runner = StubRunner::new(vec![Ok(ProcessOutput::timed_out())]);
    let config = Config::default();
    let result = ValidationGate::new(&runner, &config)
      .validate(Path::new("/repo"))
      .await;

    assert_eq!(result.outcome, ValidationOutcome::TimedOut);
    assert!(!result.passed());
    assert_eq!(runner.calls.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_pass_runs_formatter_in_build_dir() {
    let runner = StubRunner::new(vec![exit(0), exit(0)]);
    let config = Config::default();
    let result = ValidationGate::new(&runner, &config)
      .validate(Path::new("/repo"))
      .await;

    assert!(result.passed());
    assert_eq!(result.formatted, Some(true));
    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].cwd, Path::new("/repo/brezn"));
    assert_eq!(calls[0].timeout, Duration::from_secs(300));
    assert_eq!(calls[1].command_line(), "cargo fmt");
    assert_eq!(calls[1].timeout, Duration::from_secs(60));
  }

  #[tokio::test]
  async fn test_formatter_failure_tolerated_by_default() {
    let runner = StubRunner::new(vec![exit(0), exit(1)]);
    let config = Config::default();
    let result = ValidationGate::new(&runner, &config)
      .validate(Path::new("/repo"))
      .await;

    assert!(result.passed());
    assert_eq!(result.formatted, Some(false));
  }

  #[tokio::test]
  async fn test_formatter_failure_fails_when_required() {
    let runner = StubRunner::new(vec![exit(0), Ok(ProcessOutput::timed_out())]);
    let config = Config {
      require_format: true,
      ..Config::default()
    };
    let result = ValidationGate::new(&runner, &config)
      .validate(Path::new("/repo"))
      .await;

    assert_eq!(result.outcome, ValidationOutcome::Failed);
    assert_eq!(result.formatted, Some(false));
  }

  #[tokio::test]
  async fn test_spawn_failure_is_a_failed_gate() {
    let runner = StubRunner::new(vec![Err(AgentError::Process("no cargo".into()))]);
    let config = Config::default();
    let result = ValidationGate::new(&runner, &config)
      .validate(Path::new("/repo"))
      .await;

    assert_eq!(result.outcome, ValidationOutcome::Failed);
    assert!(result.diagnostics.contains("no cargo"));
  }
}
