//! Per-invocation build session.
//!
//! A [`Session`] owns everything one descriptor evaluation produces: the
//! target graph, the naming context, the user name map and the bookkeeping
//! sets. Declarations are made through the methods in `declare`; once the
//! descriptor has been evaluated the session is [finalized](Session::finalize),
//! which attaches the clean recipes derived from bookkeeping. After that it is
//! either emitted as rule text or shared with the executor.

mod bookkeeping;
mod declare;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::consts::{META_TARGETS, PSEUDO_TARGETS, RULES_EXTENSION};
use crate::graph::{EdgeKind, Graph, GraphError, Resolution, Target, TargetKind};
use crate::naming::{ArtifactKind, Naming};
use crate::recipe::{Recipe, ValidationError};

pub use bookkeeping::{Bookkeeping, Messages};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("cannot open descriptor {path}: {message}")]
  Descriptor { path: PathBuf, message: String },
}

#[derive(Debug)]
pub struct Session {
  config: Config,
  descriptor: PathBuf,
  naming: Naming,
  graph: Graph,
  bookkeeping: Bookkeeping,
  messages: Messages,
  /// Library placeholder name -> (kind, logical library name).
  libraries: BTreeMap<String, (ArtifactKind, String)>,
  finalized: bool,
}

impl Session {
  /// Session for an existing descriptor file.
  ///
  /// The descriptor path is canonicalized once here; every relative path
  /// declared later is resolved against its directory.
  pub fn open(descriptor: &Path, config: Config) -> Result<Self, SessionError> {
    let canonical = dunce::canonicalize(descriptor).map_err(|e| SessionError::Descriptor {
      path: descriptor.to_path_buf(),
      message: e.to_string(),
    })?;
    Self::new(canonical, config)
  }

  /// Session for an absolute descriptor path that need not exist.
  pub fn new(descriptor: PathBuf, config: Config) -> Result<Self, SessionError> {
    let root = descriptor.parent().map(Path::to_path_buf).unwrap_or_default();
    let naming = Naming::new(root, config.platform.toolchain());

    let mut graph = Graph::new();
    for name in META_TARGETS {
      graph.register(name, TargetKind::Meta, None, Some(&descriptor))?;
    }
    for name in PSEUDO_TARGETS {
      graph.register(name, TargetKind::Phony, None, Some(&descriptor))?;
    }

    debug!(descriptor = %descriptor.display(), platform = %config.platform, "session created");

    Ok(Self {
      config,
      descriptor,
      naming,
      graph,
      bookkeeping: Bookkeeping::default(),
      messages: Messages::default(),
      libraries: BTreeMap::new(),
      finalized: false,
    })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn descriptor(&self) -> &Path {
    &self.descriptor
  }

  pub fn root(&self) -> &Path {
    self.naming.root()
  }

  /// The rule file generated for this session's descriptor.
  pub fn rules_path(&self) -> PathBuf {
    self.descriptor.with_extension(RULES_EXTENSION)
  }

  pub fn naming(&self) -> &Naming {
    &self.naming
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  pub fn bookkeeping(&self) -> &Bookkeeping {
    &self.bookkeeping
  }

  pub fn messages(&self) -> &Messages {
    &self.messages
  }

  pub fn is_finalized(&self) -> bool {
    self.finalized
  }

  /// Buffer a warning for the end of processing.
  pub fn warn(&self, message: impl Into<String>) {
    let message = message.into();
    debug!(descriptor = %self.descriptor.display(), "buffered warning: {message}");
    self.messages.push(message);
  }

  /// Run one declaration. On error the graph, bookkeeping and library map
  /// are restored, so a failed declaration caught by the descriptor leaves
  /// no trace.
  fn declare<T>(&mut self, declaration: impl FnOnce(&mut Self) -> Result<T, SessionError>) -> Result<T, SessionError> {
    let graph = self.graph.clone();
    let bookkeeping = self.bookkeeping.clone();
    let libraries = self.libraries.clone();

    let result = declaration(self);
    if let Err(e) = &result {
      debug!(descriptor = %self.descriptor.display(), "declaration rolled back: {e}");
      self.graph = graph;
      self.bookkeeping = bookkeeping;
      self.libraries = libraries;
    }
    result
  }

  /// Find a target by canonical or user name.
  pub fn lookup(&self, name: &str) -> Result<&Target, SessionError> {
    Ok(self.graph.lookup(name)?)
  }

  /// Directories holding local libraries `target` links against.
  ///
  /// Merged into the link line ahead of the configured search paths, so a
  /// library produced in this session wins over an installed one.
  pub fn link_search_paths(&self, target: &Target) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for (dependency, edge) in self.graph.dependencies(&target.name) {
      if edge != EdgeKind::Normal || !dependency.is_local() {
        continue;
      }
      if !dependency.artifact.is_some_and(|kind| kind.is_library()) {
        continue;
      }
      if let Some(parent) = dependency.path.as_deref().and_then(Path::parent)
        && !paths.iter().any(|p| p == parent)
      {
        paths.push(parent.to_path_buf());
      }
    }
    paths
  }

  /// Mark library placeholders found on the configured search path as external.
  ///
  /// Only direct mode needs this; emitted rules leave the lookup to make.
  pub fn resolve_externals(&mut self) {
    for (name, (kind, library)) in &self.libraries {
      let Some(target) = self.graph.get_mut(name) else {
        continue;
      };
      if target.resolution != Resolution::Intermediate {
        continue;
      }

      let file_name = self.naming.file_name(*kind, library);
      let found = self
        .config
        .search_paths()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file());

      if let Some(path) = found {
        debug!(target = %name, path = %path.display(), "library resolved externally");
        target.resolution = Resolution::External(path);
      }
    }
  }

  /// Attach the recipes derived from bookkeeping. Idempotent.
  pub fn finalize(&mut self) -> Result<(), SessionError> {
    if self.finalized {
      return Ok(());
    }

    let files: Vec<PathBuf> = self.bookkeeping.files().cloned().collect();
    if !files.is_empty() {
      self.graph.attach("clean_files", Recipe::RemoveFiles { paths: files })?;
    }

    let object_dirs: Vec<PathBuf> = self.bookkeeping.object_dirs().cloned().collect();
    for directory in object_dirs {
      self.graph.attach(
        "clean_objectfiles",
        Recipe::RemoveMatching {
          directory: directory.clone(),
          extension: "o".to_string(),
        },
      )?;
      self.graph.attach(
        "clean_dependencyfiles",
        Recipe::RemoveMatching {
          directory,
          extension: "d".to_string(),
        },
      )?;
    }

    self.graph.add_dependency(
      "clean",
      &["clean_objectfiles", "clean_dependencyfiles", "clean_files"],
      EdgeKind::Normal,
    )?;
    self.graph.add_dependency("link", &["all"], EdgeKind::Normal)?;
    self.graph.attach(
      "print_include_paths",
      Recipe::Echo {
        message: "$${include_paths}".to_string(),
      },
    )?;

    self.finalized = true;
    debug!(targets = self.graph.len(), "session finalized");
    Ok(())
  }

  /// Check the invariants emitted or executed output relies on.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if !self.finalized {
      return Err(ValidationError::Inconsistent("session has not been finalized".to_string()));
    }

    for target in self.graph.targets() {
      match target.kind {
        TargetKind::Meta if !target.recipes.is_empty() => {
          return Err(ValidationError::Inconsistent(format!(
            "meta target '{}' carries recipes",
            target.name
          )));
        }
        TargetKind::File | TargetKind::Directory => {
          let writers = target.recipes.iter().filter(|r| r.is_writing()).count();
          if writers != 1 {
            return Err(ValidationError::Inconsistent(format!(
              "'{}' has {writers} writing recipes, expected exactly one",
              target
            )));
          }
        }
        _ => {}
      }
    }

    for directory in self.bookkeeping.directories() {
      let created = self.graph.targets().any(|t| {
        t.kind == TargetKind::Directory
          && t.recipes.iter().any(|r| matches!(r, Recipe::CreateDirectory { path } if path == directory))
      });
      if !created {
        return Err(ValidationError::Inconsistent(format!(
          "directory {} is written into but never created",
          directory.display()
        )));
      }
    }

    let cleaned: Vec<&PathBuf> = self
      .graph
      .get("clean_files")
      .map(|t| {
        t.recipes
          .iter()
          .flat_map(|r| match r {
            Recipe::RemoveFiles { paths } => paths.iter().collect::<Vec<_>>(),
            _ => Vec::new(),
          })
          .collect()
      })
      .unwrap_or_default();
    for file in self.bookkeeping.files() {
      if !cleaned.contains(&file) {
        return Err(ValidationError::Inconsistent(format!(
          "{} is produced but not removed by clean",
          file.display()
        )));
      }
    }

    Ok(())
  }
}
