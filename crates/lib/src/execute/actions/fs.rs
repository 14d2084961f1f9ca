//! In-process file system recipes.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::execute::staleness::modified;
use crate::execute::types::ExecuteError;

/// Create `path` and its parents. Creating an existing directory is harmless.
pub async fn create_directory(path: &Path) -> Result<(), ExecuteError> {
  tokio::fs::create_dir_all(path).await.map_err(ExecuteError::io(path))?;
  debug!(path = %path.display(), "directory created");
  Ok(())
}

/// Copy `source` to `destination` when the destination is missing or older.
///
/// Returns whether a copy happened.
pub async fn install(source: &Path, destination: &Path) -> Result<bool, ExecuteError> {
  let Some(source_time) = modified(source)? else {
    return Err(ExecuteError::Io {
      path: source.to_path_buf(),
      source: std::io::Error::new(std::io::ErrorKind::NotFound, "install source does not exist"),
    });
  };
  if modified(destination)?.is_some_and(|time| time >= source_time) {
    debug!(destination = %destination.display(), "install destination is current");
    return Ok(false);
  }

  if let Some(parent) = destination.parent() {
    tokio::fs::create_dir_all(parent).await.map_err(ExecuteError::io(parent))?;
  }
  tokio::fs::copy(source, destination)
    .await
    .map_err(ExecuteError::io(destination))?;
  info!(source = %source.display(), destination = %destination.display(), "installed");
  Ok(true)
}

/// Remove files, ignoring the ones already gone.
pub async fn remove_files(paths: &[PathBuf]) -> Result<usize, ExecuteError> {
  let mut removed = 0;
  for path in paths {
    match tokio::fs::remove_file(path).await {
      Ok(()) => removed += 1,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => return Err(ExecuteError::io(path)(e)),
    }
  }
  debug!(removed, "files removed");
  Ok(removed)
}

/// Remove the files in `directory` (not below it) with `extension`.
pub async fn remove_matching(directory: &Path, extension: &str) -> Result<usize, ExecuteError> {
  let mut entries = match tokio::fs::read_dir(directory).await {
    Ok(entries) => entries,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
    Err(e) => return Err(ExecuteError::io(directory)(e)),
  };

  let mut matching = Vec::new();
  while let Some(entry) = entries.next_entry().await.map_err(ExecuteError::io(directory))? {
    let path = entry.path();
    let is_file = entry.file_type().await.map_err(ExecuteError::io(&path))?.is_file();
    if is_file && path.extension().is_some_and(|e| e == extension) {
      matching.push(path);
    }
  }
  remove_files(&matching).await
}

/// Expand `$NAME` and `${NAME}` from the process environment.
pub fn expand_env(input: &str) -> Result<String, ExecuteError> {
  let mut out = String::with_capacity(input.len());
  let mut chars = input.char_indices().peekable();

  while let Some((_, c)) = chars.next() {
    if c != '$' {
      out.push(c);
      continue;
    }

    let braced = chars.next_if(|&(_, c)| c == '{').is_some();
    let mut name = String::new();
    while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_') {
      name.push(c);
    }
    if braced && chars.next_if(|&(_, c)| c == '}').is_none() {
      return Err(ExecuteError::MissingVariable(format!("{{{name}")));
    }
    if name.is_empty() {
      out.push('$');
      if braced {
        out.push_str("{}");
      }
      continue;
    }

    let value = std::env::var(&name).map_err(|_| ExecuteError::MissingVariable(name.clone()))?;
    out.push_str(&value);
  }

  Ok(out)
}
