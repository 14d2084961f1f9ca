//! Timestamp checks deciding whether a file target needs its recipes.

use std::collections::HashSet;
use std::path::Path;
use std::time::SystemTime;

use tracing::trace;

use crate::graph::{EdgeKind, Resolution, Target};
use crate::session::Session;

use super::types::ExecuteError;

/// Why a target is rebuilt, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
  Missing,
  NewerInput(String),
  Rebuilt(String),
  NewerDependency(String),
}

/// Decide whether `target` must run its recipes.
///
/// Targets without a path always run. A file target is stale when its
/// artifact is missing, an input is newer, a normal dependency was rebuilt
/// in this run or is newer, or an external dependency is newer. Order-only
/// and intermediate dependencies never make a target stale.
pub fn check(session: &Session, target: &Target, rebuilt: &HashSet<String>) -> Result<Option<Reason>, ExecuteError> {
  let Some(path) = target.path.as_deref() else {
    return Ok(Some(Reason::Missing));
  };
  let Some(built) = modified(path)? else {
    return Ok(Some(Reason::Missing));
  };

  for input in &target.inputs {
    match modified(input)? {
      Some(time) if time <= built => {}
      _ => return Ok(Some(Reason::NewerInput(input.display().to_string()))),
    }
  }

  for (dependency, edge) in session.graph().dependencies(&target.name) {
    if edge == EdgeKind::OrderOnly {
      continue;
    }

    let path = match &dependency.resolution {
      Resolution::Intermediate => continue,
      Resolution::External(path) => path.as_path(),
      Resolution::Local => {
        if rebuilt.contains(&dependency.name) {
          return Ok(Some(Reason::Rebuilt(dependency.name.clone())));
        }
        match dependency.path.as_deref() {
          Some(path) if dependency.kind.produces_file() => path,
          _ => continue,
        }
      }
    };

    if modified(path)?.is_some_and(|time| time > built) {
      return Ok(Some(Reason::NewerDependency(dependency.name.clone())));
    }
  }

  trace!(target = %target.name, "up to date");
  Ok(None)
}

/// Modification time, `None` when the file does not exist.
pub fn modified(path: &Path) -> Result<Option<SystemTime>, ExecuteError> {
  match std::fs::metadata(path) {
    Ok(metadata) => Ok(Some(metadata.modified().map_err(ExecuteError::io(path))?)),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(ExecuteError::io(path)(e)),
  }
}
