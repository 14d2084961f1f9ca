use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::naming::ArtifactKind;
use crate::recipe::Recipe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
  /// Aggregates dependencies, never carries recipes.
  Meta,
  /// Always realized; produces no tracked file.
  Phony,
  File,
  Directory,
}

impl TargetKind {
  pub fn produces_file(&self) -> bool {
    matches!(self, Self::File | Self::Directory)
  }
}

/// Whether a target is produced by this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
  /// Referenced but not produced here; may be produced by a sibling descriptor.
  Intermediate,
  Local,
  /// Found outside the session at the given path.
  External(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
  Normal,
  /// Must exist before the dependent is realized, but never makes it stale.
  OrderOnly,
}

#[derive(Debug, Clone, Serialize)]
pub struct Target {
  pub name: String,
  pub kind: TargetKind,
  pub path: Option<PathBuf>,
  pub descriptor: Option<PathBuf>,
  pub artifact: Option<ArtifactKind>,
  /// Plain files this target reads, in declaration order.
  pub inputs: Vec<PathBuf>,
  pub recipes: Vec<Recipe>,
  pub resolution: Resolution,
}

impl Target {
  pub(crate) fn new(name: &str, kind: TargetKind, path: Option<PathBuf>, descriptor: Option<PathBuf>) -> Self {
    Self {
      name: name.to_string(),
      kind,
      path,
      descriptor,
      artifact: None,
      inputs: Vec::new(),
      recipes: Vec::new(),
      resolution: Resolution::Local,
    }
  }

  pub(crate) fn placeholder(name: &str) -> Self {
    Self {
      resolution: Resolution::Intermediate,
      ..Self::new(name, TargetKind::Phony, None, None)
    }
  }

  pub fn is_local(&self) -> bool {
    self.resolution == Resolution::Local
  }

  pub fn writing_recipe(&self) -> Option<&Recipe> {
    self.recipes.iter().find(|r| r.is_writing())
  }

  /// Add an input file unless already present.
  pub(crate) fn add_input(&mut self, input: PathBuf) {
    if !self.inputs.contains(&input) {
      self.inputs.push(input);
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.path {
      Some(path) => write!(f, "{} ({})", self.name, path.display()),
      None => f.write_str(&self.name),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("target '{name}' is already registered for {existing}, cannot register it for {requested}")]
  NameCollision {
    name: String,
    existing: String,
    requested: String,
  },

  #[error("no target named '{0}'")]
  UnresolvedDependency(String),

  #[error("'{target}' depending on '{dependency}' would close a cycle")]
  Cycle { target: String, dependency: String },

  #[error("meta target '{0}' only aggregates dependencies and cannot carry recipes")]
  MetaRecipe(String),
}
