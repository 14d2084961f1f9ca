//! Types for direct realization.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::graph::GraphError;
use crate::placeholder::PlaceholderError;

/// Errors raised while realizing targets.
///
/// Descriptor failures from recursive realization are carried as text so
/// results stay `Send` across worker tasks.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A recipe command exited unsuccessfully.
  #[error("{target}: command failed with exit code {code:?}: {command}")]
  BuildAction {
    target: String,
    command: String,
    code: Option<i32>,
    /// Captured stdout followed by stderr.
    output: String,
  },

  #[error("{target}: cancelled")]
  Cancelled { target: String },

  #[error("descriptor {descriptor}: {message}")]
  Descriptor { descriptor: PathBuf, message: String },

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Placeholder(#[from] PlaceholderError),

  #[error("io error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("environment variable {0} is not set")]
  MissingVariable(String),

  /// The sub-descriptor's own realization did not succeed.
  #[error("{target} in {descriptor} failed: {failed}")]
  Recursion {
    descriptor: PathBuf,
    target: String,
    failed: String,
  },

  #[error("worker task failed: {0}")]
  Join(String),
}

impl ExecuteError {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { path, source }
  }
}

/// Execution settings for one realization.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of targets realized at the same time.
  pub parallelism: usize,

  /// Keep realizing targets unaffected by a failure.
  pub keep_going: bool,

  /// Shell running recipe commands, `/bin/sh` when unset.
  pub shell: Option<String>,

  pub cancel: CancellationToken,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4),
      keep_going: false,
      shell: None,
      cancel: CancellationToken::new(),
    }
  }
}

impl ExecuteConfig {
  pub fn from_config(config: &Config) -> Self {
    Self {
      parallelism: config.parallelism.max(1),
      ..Self::default()
    }
  }
}

/// What realizing a single target amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
  /// Recipes ran.
  Rebuilt,
  /// Nothing to do: fresh artifact, placeholder or recipe-free aggregate.
  UpToDate,
}

#[derive(Debug, Clone)]
pub struct TargetOutcome {
  pub status: TargetStatus,
  /// Lines printed by echo recipes, in recipe order.
  pub output: Vec<String>,
}

/// Result of realizing a set of targets.
#[derive(Debug, Default)]
pub struct RealizeResult {
  pub rebuilt: Vec<String>,

  pub up_to_date: Vec<String>,

  pub failed: Vec<(String, ExecuteError)>,

  /// Skipped target -> the failed target that caused the skip.
  pub skipped: BTreeMap<String, String>,

  /// Echo output from every realized target, in realization order.
  pub output: Vec<String>,
}

impl RealizeResult {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  pub fn total(&self) -> usize {
    self.rebuilt.len() + self.up_to_date.len() + self.failed.len() + self.skipped.len()
  }

  /// Names of failed targets, joined for messages.
  pub fn failure_summary(&self) -> String {
    self
      .failed
      .iter()
      .map(|(name, _)| name.as_str())
      .collect::<Vec<_>>()
      .join(", ")
  }
}
