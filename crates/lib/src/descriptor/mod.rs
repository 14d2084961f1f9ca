//! Descriptors and their generated rule files.
//!
//! Each descriptor owns one rule file next to it (`atmake.lua` ->
//! `atmake.mk`). A rule file is regenerated when the descriptor or one of the
//! Lua modules it can `require` is newer; rebuilding what the rule file
//! describes is make's job in emission mode.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::consts::{DESCRIPTOR_FILE_NAME, MODULE_DIR, RULES_EXTENSION};
use crate::emit::{EmitError, emit};
use crate::eval::{EvalError, evaluate_descriptor};
use crate::execute::staleness::modified;

#[derive(Debug, Error)]
pub enum DescriptorError {
  #[error(transparent)]
  Eval(#[from] EvalError),

  #[error("{}: {source}", descriptor.display())]
  Emit {
    descriptor: PathBuf,
    #[source]
    source: EmitError,
  },

  #[error("io error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot walk {root}: {message}")]
  Walk { root: PathBuf, message: String },
}

/// Rule text rendered for a descriptor, with the warnings raised on the way.
#[derive(Debug, Clone)]
pub struct Rendered {
  pub text: String,
  pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Generated {
  pub rules: PathBuf,
  pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
  path: PathBuf,
}

impl Descriptor {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn rules(&self) -> PathBuf {
    self.path.with_extension(RULES_EXTENSION)
  }

  /// The descriptor followed by every module under its `lua/` directory,
  /// in path order.
  pub fn sources(&self) -> Result<Vec<PathBuf>, DescriptorError> {
    let mut sources = vec![self.path.clone()];
    let Some(modules) = self.path.parent().map(|dir| dir.join(MODULE_DIR)) else {
      return Ok(sources);
    };
    if !modules.is_dir() {
      return Ok(sources);
    }

    for entry in WalkDir::new(&modules).sort_by_file_name() {
      let entry = entry.map_err(|e| DescriptorError::Walk {
        root: modules.clone(),
        message: e.to_string(),
      })?;
      if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "lua") {
        sources.push(entry.into_path());
      }
    }
    Ok(sources)
  }

  /// Tier one staleness: the rule file is missing or older than one of the
  /// [sources](Self::sources).
  pub fn needs_regeneration(&self) -> Result<bool, DescriptorError> {
    let Some(rules) = modified(&self.rules()).map_err(|e| self.io_error(e))? else {
      return Ok(true);
    };

    for source in self.sources()? {
      match modified(&source).map_err(|e| self.io_error(e))? {
        Some(time) if time <= rules => {}
        _ => {
          debug!(source = %source.display(), "rules are stale");
          return Ok(true);
        }
      }
    }
    Ok(false)
  }

  /// Evaluate the descriptor and render its rule text without writing it.
  pub fn render(&self, config: &Config) -> Result<Rendered, DescriptorError> {
    let session = evaluate_descriptor(&self.path, config)?;
    let text = emit(&session).map_err(|source| DescriptorError::Emit {
      descriptor: self.path.clone(),
      source,
    })?;
    Ok(Rendered {
      text,
      warnings: session.messages().take(),
    })
  }

  /// Render and write the rule file.
  ///
  /// The text is written to a temporary file first and renamed over the
  /// rule file, so a failing descriptor leaves the previous rules intact.
  pub fn generate(&self, config: &Config) -> Result<Generated, DescriptorError> {
    let rendered = self.render(config)?;
    let rules = self.rules();
    let staging = rules.with_extension(format!("{RULES_EXTENSION}.tmp"));

    std::fs::write(&staging, rendered.text).map_err(|source| DescriptorError::Io {
      path: staging.clone(),
      source,
    })?;
    std::fs::rename(&staging, &rules).map_err(|source| DescriptorError::Io {
      path: rules.clone(),
      source,
    })?;

    info!(descriptor = %self.path.display(), rules = %rules.display(), "rules generated");
    Ok(Generated {
      rules,
      warnings: rendered.warnings,
    })
  }

  fn io_error(&self, error: crate::execute::ExecuteError) -> DescriptorError {
    match error {
      crate::execute::ExecuteError::Io { path, source } => DescriptorError::Io { path, source },
      other => DescriptorError::Io {
        path: self.path.clone(),
        source: std::io::Error::other(other.to_string()),
      },
    }
  }
}

/// Find every descriptor below `root`, in path order.
///
/// Hidden directories are not entered.
pub fn discover(root: &Path) -> Result<Vec<Descriptor>, DescriptorError> {
  let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
    e.depth() == 0
      || !e.file_type().is_dir()
      || e.file_name().to_str().map(|name| !name.starts_with('.')).unwrap_or(true)
  });

  let mut descriptors = Vec::new();
  for entry in walker {
    let entry = entry.map_err(|e| DescriptorError::Walk {
      root: root.to_path_buf(),
      message: e.to_string(),
    })?;
    if entry.file_type().is_file() && entry.file_name() == DESCRIPTOR_FILE_NAME {
      descriptors.push(Descriptor::new(entry.into_path()));
    }
  }

  debug!(root = %root.display(), count = descriptors.len(), "descriptors discovered");
  Ok(descriptors)
}

/// What a tree regeneration did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TreeReport {
  pub regenerated: Vec<PathBuf>,
  pub fresh: Vec<PathBuf>,
  pub warnings: Vec<String>,
}

/// Regenerate the stale rule files below `root`, or all of them with `force`.
///
/// Stops at the first descriptor that fails; rule files already written stay.
pub fn regenerate_tree(root: &Path, config: &Config, force: bool) -> Result<TreeReport, DescriptorError> {
  let mut report = TreeReport::default();

  for descriptor in discover(root)? {
    if !force && !descriptor.needs_regeneration()? {
      report.fresh.push(descriptor.rules());
      continue;
    }
    let generated = descriptor.generate(config)?;
    report.regenerated.push(generated.rules);
    report.warnings.extend(generated.warnings);
  }

  info!(
    regenerated = report.regenerated.len(),
    fresh = report.fresh.len(),
    "tree regenerated"
  );
  Ok(report)
}
