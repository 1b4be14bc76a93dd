use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
  #[error("config error: {0}")]
  Config(String),

  #[error("config file not found: {0}")]
  ConfigNotFound(PathBuf),

  #[error("unknown feature: {0}")]
  UnknownFeature(String),

  #[error("target file not found: {0}")]
  MissingTarget(PathBuf),

  #[error("no insertion point in {0}")]
  NoInsertionPoint(PathBuf),

  #[error("process error: {0}")]
  Process(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("yaml error: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
