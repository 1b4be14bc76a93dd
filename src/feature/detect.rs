use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::feature::{Feature, FeatureStatus, Registry};

/// A pure check over the text of a file.
#[derive(Debug, Clone)]
pub enum Predicate {
  Contains(&'static str),
  ContainsIgnoreCase(&'static str),
  AnyOf(Vec<Predicate>),
  AllOf(Vec<Predicate>),
  Custom {
    name: &'static str,
    check: fn(&str) -> bool,
  },
}

impl Predicate {
  pub fn holds(&self, content: &str) -> bool {
    match self {
      Predicate::Contains(needle) => content.contains(needle),
      Predicate::ContainsIgnoreCase(needle) => content
        .to_lowercase()
        .contains(&needle.to_lowercase()),
      Predicate::AnyOf(preds) => preds.iter().any(|p| p.holds(content)),
      Predicate::AllOf(preds) => preds.iter().all(|p| p.holds(content)),
      Predicate::Custom { check, .. } => check(content),
    }
  }

  /// `Contains` for each needle, combined with `AllOf`.
  pub fn all(needles: &[&'static str]) -> Predicate {
    Predicate::AllOf(needles.iter().copied().map(Predicate::Contains).collect())
  }

  /// `Contains` for each needle, combined with `AnyOf`.
  pub fn any(needles: &[&'static str]) -> Predicate {
    Predicate::AnyOf(needles.iter().copied().map(Predicate::Contains).collect())
  }
}

impl std::fmt::Display for Predicate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let join = |preds: &[Predicate], sep: &str| {
      preds
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(sep)
    };
    match self {
      Predicate::Contains(n) => write!(f, "contains {n:?}"),
      Predicate::ContainsIgnoreCase(n) => write!(f, "contains {n:?} (any case)"),
      Predicate::AnyOf(preds) => write!(f, "({})", join(preds, " or ")),
      Predicate::AllOf(preds) => write!(f, "({})", join(preds, " and ")),
      Predicate::Custom { name, .. } => write!(f, "{name}"),
    }
  }
}

/// Every predicate must hold against `file` for the feature to count as completed.
#[derive(Debug, Clone)]
pub struct DetectionRule {
  pub file: &'static str,
  pub predicates: Vec<Predicate>,
}

impl DetectionRule {
  pub fn evaluate(&self, content: &str) -> bool {
    self.predicates.iter().all(|p| {
      let ok = p.holds(content);
      if !ok {
        debug!("{}: predicate failed: {p}", self.file);
      }
      ok
    })
  }
}

/// Classifies one feature from the current on-disk content. A missing file
/// means pending, not an error.
pub fn detect(feature: &Feature, src_dir: &Path) -> Result<FeatureStatus> {
  let path = src_dir.join(feature.detection.file);
  let bytes = match std::fs::read(&path) {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == ErrorKind::NotFound => {
      debug!("{}: {} missing", feature.name, path.display());
      return Ok(FeatureStatus::Pending);
    }
    Err(e) => return Err(e.into()),
  };
  let content = String::from_utf8_lossy(&bytes);

  if feature.detection.evaluate(&content) {
    Ok(FeatureStatus::Completed)
  } else {
    Ok(FeatureStatus::Pending)
  }
}

#[derive(Debug, Clone)]
pub struct FeatureState<'a> {
  pub feature: &'a Feature,
  pub status: FeatureStatus,
}

/// Statuses for the whole catalog, in declaration order. Built fresh per run.
#[derive(Debug, Clone)]
pub struct StatusSnapshot<'a> {
  pub states: Vec<FeatureState<'a>>,
}

impl<'a> StatusSnapshot<'a> {
  pub fn total(&self) -> usize {
    self.states.len()
  }

  pub fn completed(&self) -> usize {
    self
      .states
      .iter()
      .filter(|s| s.status == FeatureStatus::Completed)
      .count()
  }

  pub fn status_of(&self, name: &str) -> Option<FeatureStatus> {
    self
      .states
      .iter()
      .find(|s| s.feature.name == name)
      .map(|s| s.status)
  }
}

pub fn analyze<'a>(registry: &'a Registry, src_dir: &Path) -> Result<StatusSnapshot<'a>> {
  info!("analyzing {} feature(s) in {}", registry.len(), src_dir.display());

  let mut states = Vec::with_capacity(registry.len());
  for feature in registry.features() {
    let status = detect(feature, src_dir)?;
    info!("{feature}: {status:?}");
    states.push(FeatureState { feature, status });
  }

  Ok(StatusSnapshot { states })
}
