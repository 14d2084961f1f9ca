use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Paths collected while declarations are processed.
///
/// Sorted sets, so the clean and directory blocks of generated rule files do
/// not depend on declaration order.
#[derive(Debug, Default, Clone)]
pub struct Bookkeeping {
  directories: BTreeSet<PathBuf>,
  files: BTreeSet<PathBuf>,
  object_dirs: BTreeSet<PathBuf>,
}

impl Bookkeeping {
  /// Returns `true` the first time a directory is registered.
  pub fn register_directory(&mut self, path: &Path) -> bool {
    self.directories.insert(path.to_path_buf())
  }

  pub fn register_file(&mut self, path: &Path) {
    self.files.insert(path.to_path_buf());
  }

  pub fn register_object_dir(&mut self, path: &Path) {
    self.object_dirs.insert(path.to_path_buf());
  }

  pub fn directories(&self) -> impl Iterator<Item = &PathBuf> {
    self.directories.iter()
  }

  pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
    self.files.iter()
  }

  pub fn object_dirs(&self) -> impl Iterator<Item = &PathBuf> {
    self.object_dirs.iter()
  }
}

/// Deferred warnings, flushed once when processing ends.
///
/// Realization adds to this from worker tasks, hence the lock.
#[derive(Debug, Default)]
pub struct Messages {
  inner: Mutex<BTreeSet<String>>,
}

impl Messages {
  pub fn push(&self, message: impl Into<String>) {
    self.lock().insert(message.into());
  }

  pub fn extend(&self, messages: impl IntoIterator<Item = String>) {
    self.lock().extend(messages);
  }

  pub fn snapshot(&self) -> Vec<String> {
    self.lock().iter().cloned().collect()
  }

  /// Remove and return every buffered message.
  pub fn take(&self) -> Vec<String> {
    std::mem::take(&mut *self.lock()).into_iter().collect()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
