use std::path::Path;

use tracing::{error, info};

use crate::error::{AgentError, Result};
use crate::patch::PatchBlock;

/// Chooses where a block is spliced into a file. `None` means the file has no
/// usable position and must not be modified.
pub trait InsertionStrategy {
  fn insertion_point(&self, content: &str) -> Option<usize>;
}

/// Byte offset of the last occurrence of a closing delimiter.
#[derive(Debug, Clone, Copy)]
pub struct LastClosingDelimiter {
  pub delimiter: char,
}

impl Default for LastClosingDelimiter {
  fn default() -> Self {
    Self { delimiter: '}' }
  }
}

impl InsertionStrategy for LastClosingDelimiter {
  fn insertion_point(&self, content: &str) -> Option<usize> {
    content.rfind(self.delimiter)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  Applied,
  AlreadyPresent,
}

/// Inserts `block` into `path` at most once: a single read, then a single
/// write only when the marker is absent and an insertion point exists.
pub fn apply(
  path: &Path,
  block: &PatchBlock,
  strategy: &impl InsertionStrategy,
) -> Result<ApplyOutcome> {
  if !path.exists() {
    error!("{}: target file missing", path.display());
    return Err(AgentError::MissingTarget(path.to_path_buf()));
  }

  let content = std::fs::read_to_string(path)?;

  if block.is_applied_in(&content) {
    info!("{}: {} already applied", path.display(), block.feature);
    return Ok(ApplyOutcome::AlreadyPresent);
  }

  let Some(pos) = strategy.insertion_point(&content) else {
    error!("{}: no insertion point for {}", path.display(), block.feature);
    return Err(AgentError::NoInsertionPoint(path.to_path_buf()));
  };

  let text = block.text();
  let mut patched = String::with_capacity(content.len() + text.len() + 1);
  patched.push_str(&content[..pos]);
  patched.push_str(&text);
  patched.push('\n');
  patched.push_str(&content[pos..]);

  std::fs::write(path, patched)?;
  info!("{}: applied {} at byte {pos}", path.display(), block.feature);
  Ok(ApplyOutcome::Applied)
}
