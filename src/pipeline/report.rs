use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::feature::detect::StatusSnapshot;
use crate::feature::select;
use crate::feature::{FeatureStatus, Priority};
use crate::pipeline::validate::ValidationResult;

#[derive(Debug, Clone, Serialize)]
pub struct FeatureEntry {
  pub priority: Priority,
  pub files: Vec<&'static str>,
  pub description: &'static str,
  pub status: FeatureStatus,
}

/// Analysis half of the report; this is all `status` prints.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
  pub mvp_progress: u32,
  pub completed_features: usize,
  pub total_features: usize,
  pub next_feature: String,
  #[serde(serialize_with = "in_declaration_order")]
  pub features: Vec<(&'static str, FeatureEntry)>,
  pub timestamp: DateTime<Utc>,
}

impl ProjectStatus {
  pub fn from_snapshot(snapshot: &StatusSnapshot<'_>, timestamp: DateTime<Utc>) -> Self {
    let completed = snapshot.completed();
    let total = snapshot.total();
    let next_feature = select::next_feature(snapshot)
      .map(|f| f.name)
      .unwrap_or(select::NONE)
      .to_string();

    let features = snapshot
      .states
      .iter()
      .map(|s| {
        (
          s.feature.name,
          FeatureEntry {
            priority: s.feature.priority,
            files: s.feature.files.clone(),
            description: s.feature.description,
            status: s.status,
          },
        )
      })
      .collect();

    Self {
      mvp_progress: progress(completed, total),
      completed_features: completed,
      total_features: total,
      next_feature,
      features,
      timestamp,
    }
  }
}

/// Floor of the completed percentage. The catalog is never empty.
pub fn progress(completed: usize, total: usize) -> u32 {
  debug_assert!(total > 0);
  (completed * 100 / total.max(1)) as u32
}

fn in_declaration_order<S: Serializer>(
  features: &[(&'static str, FeatureEntry)],
  serializer: S,
) -> Result<S::Ok, S::Error> {
  let mut map = serializer.serialize_map(Some(features.len()))?;
  for (name, entry) in features {
    map.serialize_entry(name, entry)?;
  }
  map.end()
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  #[serde(flatten)]
  pub status: ProjectStatus,
  pub implementation_success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_implementation: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub validation: Option<ValidationResult>,
}

impl RunReport {
  pub fn idle(status: ProjectStatus) -> Self {
    Self {
      status,
      implementation_success: true,
      last_implementation: None,
      validation: None,
    }
  }

  /// `validation` is `None` when the patch never reached the gate.
  pub fn attempted(
    status: ProjectStatus,
    feature: &str,
    applied: bool,
    validation: Option<ValidationResult>,
  ) -> Self {
    let passed = validation.as_ref().is_some_and(ValidationResult::passed);
    Self {
      status,
      implementation_success: applied && passed,
      last_implementation: Some(feature.to_string()),
      validation,
    }
  }

  pub fn exit_code(&self) -> i32 {
    if self.implementation_success {
      0
    } else {
      1
    }
  }
}
