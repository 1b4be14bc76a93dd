use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AgentError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "brezn-agent.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Directory holding the feature target files, relative to the repository root.
  #[serde(default = "default_src_dir")]
  pub src_dir: PathBuf,
  /// Directory the test runner and formatter are invoked in.
  #[serde(default = "default_build_dir")]
  pub build_dir: PathBuf,
  #[serde(default = "default_test_command")]
  pub test_command: String,
  #[serde(default = "default_test_timeout")]
  pub test_timeout_secs: u64,
  #[serde(default = "default_format_command")]
  pub format_command: String,
  #[serde(default = "default_format_timeout")]
  pub format_timeout_secs: u64,
  /// When set, a formatter failure fails the validation gate.
  #[serde(default)]
  pub require_format: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      src_dir: default_src_dir(),
      build_dir: default_build_dir(),
      test_command: default_test_command(),
      test_timeout_secs: default_test_timeout(),
      format_command: default_format_command(),
      format_timeout_secs: default_format_timeout(),
      require_format: false,
    }
  }
}

fn default_src_dir() -> PathBuf {
  PathBuf::from("brezn/src")
}
fn default_build_dir() -> PathBuf {
  PathBuf::from("brezn")
}
fn default_test_command() -> String {
  "cargo test --verbose".to_string()
}
fn default_test_timeout() -> u64 {
  300
}
fn default_format_command() -> String {
  "cargo fmt".to_string()
}
fn default_format_timeout() -> u64 {
  60
}

impl Config {
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Err(AgentError::ConfigNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
  }

  /// Loads `path` when given; otherwise the default file if present, else built-in defaults.
  pub fn resolve(path: Option<&Path>) -> Result<Self> {
    match path {
      Some(p) => Self::load(p),
      None => {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
          Self::load(default_path)
        } else {
          info!("no {DEFAULT_CONFIG_FILE} found, using defaults");
          Ok(Self::default())
        }
      }
    }
  }

  fn validate(&self) -> Result<()> {
    if split_command(&self.test_command).is_none() {
      return Err(AgentError::Config("test_command is empty".into()));
    }
    if split_command(&self.format_command).is_none() {
      return Err(AgentError::Config("format_command is empty".into()));
    }
    if self.test_timeout_secs == 0 || self.format_timeout_secs == 0 {
      return Err(AgentError::Config("timeouts must be greater than zero".into()));
    }
    Ok(())
  }

  pub fn test_timeout(&self) -> Duration {
    Duration::from_secs(self.test_timeout_secs)
  }

  pub fn format_timeout(&self) -> Duration {
    Duration::from_secs(self.format_timeout_secs)
  }
}

/// Splits a command line on whitespace into program and arguments.
pub fn split_command(command: &str) -> Option<(String, Vec<String>)> {
  let mut parts = command.split_whitespace().map(str::to_string);
  let program = parts.next()?;
  Some((program, parts.collect()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.src_dir, PathBuf::from("brezn/src"));
    assert_eq!(config.build_dir, PathBuf::from("brezn"));
    assert_eq!(config.test_timeout(), Duration::from_secs(300));
    assert_eq!(config.format_timeout(), Duration::from_secs(60));
    assert!(!config.require_format);
  }

  #[test]
  fn test_partial_yaml_fills_defaults() {
    let config: Config = serde_yaml::from_str("test_timeout_secs: 10\nrequire_format: true\n").unwrap();
    assert_eq!(config.test_timeout_secs, 10);
    assert!(config.require_format);
    assert_eq!(config.format_command, "cargo fmt");
  }

  #[test]
  fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, AgentError::ConfigNotFound(_)));
  }

  #[test]
  fn test_load_rejects_empty_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.yaml");
    std::fs::write(&path, "test_command: \"  \"\n").unwrap();
    assert!(matches!(Config::load(&path), Err(AgentError::Config(_))));
  }

  #[test]
  fn test_load_rejects_zero_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.yaml");
    std::fs::write(&path, "format_timeout_secs: 0\n").unwrap();
    assert!(matches!(Config::load(&path), Err(AgentError::Config(_))));
  }

  #[test]
  fn test_split_command() {
    assert_eq!(
      split_command("cargo test --verbose"),
      Some(("cargo".to_string(), vec!["test".to_string(), "--verbose".to_string()]))
    );
    assert_eq!(split_command("   "), None);
  }
}
