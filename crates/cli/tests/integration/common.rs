//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own source directory and an output directory for
/// installed files.
pub struct TestEnv {
  pub temp: TempDir,
  pub descriptor: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file, copied to `atmake.lua`.
  pub fn from_fixture(name: &str) -> Self {
    let env = Self::empty();
    std::fs::write(&env.descriptor, fixture_content(name)).unwrap();
    env
  }

  /// Create an empty test environment.
  ///
  /// Use this when you need to manually set up the directory structure.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    Self {
      descriptor: root.join("atmake.lua"),
      temp,
    }
  }

  /// Canonical source directory.
  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// Write a file relative to the source directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.root().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Output path for installed test artifacts.
  pub fn output_path(&self) -> PathBuf {
    let p = self.root().join("output");
    std::fs::create_dir_all(&p).unwrap();
    p
  }

  /// Get a pre-configured Command for the atmake binary.
  ///
  /// Pins the platform and clears the configuration inherited from the
  /// environment running the tests:
  /// - `TEST_OUTPUT_DIR`: Output path for installed artifacts
  pub fn atmake_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("atmake");
    for var in [
      "ATMAKE_LIBRARY_PATHS",
      "ATMAKE_DEFAULT_LIBRARY_PATHS",
      "ATMAKE_INCLUDE_PATHS",
      "ATMAKE_DEFAULT_LIBS",
      "FORCE_NOTPARALLEL",
    ] {
      cmd.env_remove(var);
    }
    cmd.env("ATMAKE_PLATFORM", "linux");
    cmd.env("TEST_OUTPUT_DIR", self.output_path());
    cmd
  }
}
