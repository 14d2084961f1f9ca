//! Shared helpers for library tests.

use std::path::{Path, PathBuf};

use atmake_lib::config::Config;
use atmake_lib::platform::PlatformId;
use tempfile::TempDir;

pub fn linux() -> Config {
  Config {
    platform: PlatformId::Linux,
    ..Config::default()
  }
}

/// A source tree in a temp directory, canonicalized so emitted paths match.
pub struct SourceTree {
  _temp: TempDir,
  pub root: PathBuf,
}

impl SourceTree {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    Self { _temp: temp, root }
  }

  pub fn write(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.root.join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root.join(relative)
  }

  pub fn display(&self) -> String {
    display(&self.root)
  }
}

pub fn display(path: &Path) -> String {
  path.display().to_string()
}
