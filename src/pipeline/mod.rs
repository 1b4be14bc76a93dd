pub mod report;
pub mod validate;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::feature::detect::{self, StatusSnapshot};
use crate::feature::{select, Feature, Registry};
use crate::patch::apply::{self, ApplyOutcome, InsertionStrategy, LastClosingDelimiter};
use crate::patch::synthesize;
use crate::process::ProcessRunner;
use crate::pipeline::report::{ProjectStatus, RunReport};
use crate::pipeline::validate::ValidationGate;

/// One traversal per run, forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Analyzing,
  Selecting,
  Idle,
  Synthesizing,
  Applying,
  Validating,
  Reporting,
  Done,
}

pub struct Pipeline<'a, R, S = LastClosingDelimiter> {
  registry: &'a Registry,
  config: &'a Config,
  repo_root: PathBuf,
  runner: &'a R,
  strategy: S,
}

impl<'a, R: ProcessRunner> Pipeline<'a, R> {
  pub fn new(registry: &'a Registry, config: &'a Config, repo_root: &Path, runner: &'a R) -> Self {
    Self {
      registry,
      config,
      repo_root: repo_root.to_path_buf(),
      runner,
      strategy: LastClosingDelimiter::default(),
    }
  }
}

impl<'a, R: ProcessRunner, S: InsertionStrategy> Pipeline<'a, R, S> {
  pub fn with_strategy<T: InsertionStrategy>(self, strategy: T) -> Pipeline<'a, R, T> {
    Pipeline {
      registry: self.registry,
      config: self.config,
      repo_root: self.repo_root,
      runner: self.runner,
      strategy,
    }
  }

  fn src_dir(&self) -> PathBuf {
    self.repo_root.join(&self.config.src_dir)
  }

  fn enter(&self, stage: Stage) {
    info!("stage: {stage:?}");
  }

  /// Analysis only; never touches the repository.
  pub fn status(&self) -> Result<ProjectStatus> {
    let snapshot = detect::analyze(self.registry, &self.src_dir())?;
    Ok(ProjectStatus::from_snapshot(&snapshot, Utc::now()))
  }

  /// Per-feature failures end up in the report; only unexpected I/O while
  /// analyzing is returned as an error.
  pub async fn run(&self) -> Result<RunReport> {
    self.enter(Stage::Analyzing);
    let snapshot = detect::analyze(self.registry, &self.src_dir())?;
    let status = ProjectStatus::from_snapshot(&snapshot, Utc::now());
    info!(
      "mvp progress: {}% ({}/{})",
      status.mvp_progress, status.completed_features, status.total_features
    );

    self.enter(Stage::Selecting);
    let report = match select::next_feature(&snapshot) {
      None => {
        self.enter(Stage::Idle);
        info!("all features already implemented");
        RunReport::idle(status)
      }
      Some(feature) => {
        info!("next feature: {feature}");
        self.attempt(feature, &snapshot, status).await
      }
    };

    self.enter(Stage::Reporting);
    if report.implementation_success {
      info!("run succeeded");
    } else {
      error!("run failed");
    }
    self.enter(Stage::Done);
    Ok(report)
  }

  async fn attempt(
    &self,
    feature: &Feature,
    snapshot: &StatusSnapshot<'_>,
    status: ProjectStatus,
  ) -> RunReport {
    debug_assert_eq!(
      snapshot.status_of(feature.name),
      Some(crate::feature::FeatureStatus::Pending)
    );

    if let Err(e) = self.implement(feature) {
      error!("implementing {} failed: {e}", feature.name);
      return RunReport::attempted(status, feature.name, false, None);
    }

    self.enter(Stage::Validating);
    let validation = ValidationGate::new(self.runner, self.config)
      .validate(&self.repo_root)
      .await;
    if validation.passed() {
      info!("feature {} implemented", feature.name);
    } else {
      error!(
        "validation {:?} for {}: {}",
        validation.outcome,
        feature.name,
        validation.diagnostics.trim()
      );
    }

    RunReport::attempted(status, feature.name, true, Some(validation))
  }

  /// Checks the target exists before synthesizing, then splices the block in.
  fn implement(&self, feature: &Feature) -> Result<ApplyOutcome> {
    let target = self.src_dir().join(feature.target);
    if !target.exists() {
      return Err(AgentError::MissingTarget(target));
    }

    self.enter(Stage::Synthesizing);
    let block = synthesize(feature.name)?;

    self.enter(Stage::Applying);
    apply::apply(&target, &block, &self.strategy)
  }
}
