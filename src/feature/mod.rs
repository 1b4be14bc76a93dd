pub mod catalog;
pub mod detect;
pub mod select;

use serde::{Deserialize, Serialize};

pub use catalog::Registry;
pub use detect::{DetectionRule, Predicate};

/// Advisory only. Selection follows declaration order, never priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
  High,
  Medium,
  Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
  Pending,
  Completed,
}

/// A catalog entry. Status is not stored here; it is derived per run by
/// [`detect::analyze`].
#[derive(Debug, Clone)]
pub struct Feature {
  pub name: &'static str,
  pub priority: Priority,
  pub files: Vec<&'static str>,
  pub description: &'static str,
  pub detection: DetectionRule,
  /// File the feature's patch block is spliced into.
  pub target: &'static str,
}

impl std::fmt::Display for Feature {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({:?})", self.name, self.priority)
  }
}
