//! Toolchain-wide configuration read from the environment.
//!
//! Read once at start-up and stored in the session. Values end up in the
//! overridable variable block of generated rule files and in the commands
//! run in direct mode.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::placeholder::Placeholder;
use crate::platform::{PlatformError, PlatformId};

pub const ENV_PLATFORM: &str = "ATMAKE_PLATFORM";
pub const ENV_LIBRARY_PATHS: &str = "ATMAKE_LIBRARY_PATHS";
pub const ENV_DEFAULT_LIBRARY_PATHS: &str = "ATMAKE_DEFAULT_LIBRARY_PATHS";
pub const ENV_INCLUDE_PATHS: &str = "ATMAKE_INCLUDE_PATHS";
pub const ENV_DEFAULT_LIBS: &str = "ATMAKE_DEFAULT_LIBS";
pub const ENV_LINK_DIRECTIVES_EXE: &str = "ATMAKE_LINK_DIRECTIVES_EXE";
pub const ENV_LINK_DIRECTIVES_LIB: &str = "ATMAKE_LINK_DIRECTIVES_LIB";
pub const ENV_FORCE_NOTPARALLEL: &str = "FORCE_NOTPARALLEL";
pub const ENV_PARALLEL_MAKE: &str = "ATMAKE_PARALLEL_MAKE";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error(transparent)]
  Platform(#[from] PlatformError),

  #[error("{var} is not valid unicode")]
  NotUnicode { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
  pub platform: PlatformId,
  pub library_paths: Vec<PathBuf>,
  pub default_library_paths: Vec<PathBuf>,
  pub include_paths: Vec<PathBuf>,
  /// Logical names, rendered as `-l<name>`.
  pub default_libs: Vec<String>,
  pub link_directives_exe: String,
  pub link_directives_lib: String,
  /// Direct mode runs one recipe at a time; generated rules get `.NOTPARALLEL`.
  pub force_not_parallel: bool,
  /// Leave the `.NOTPARALLEL` guard out of generated rules.
  pub parallel_make: bool,
  pub parallelism: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      platform: PlatformId::current().unwrap_or(PlatformId::Linux),
      library_paths: Vec::new(),
      default_library_paths: Vec::new(),
      include_paths: Vec::new(),
      default_libs: Vec::new(),
      link_directives_exe: String::new(),
      link_directives_lib: String::new(),
      force_not_parallel: false,
      parallel_make: false,
      parallelism: num_cpus(),
    }
  }
}

impl Config {
  /// Read configuration from the process environment.
  ///
  /// # Errors
  ///
  /// Fails on an unknown `ATMAKE_PLATFORM`, on a host without a default
  /// platform, or on values that are not unicode.
  pub fn from_env() -> Result<Self, ConfigError> {
    let platform = match text(ENV_PLATFORM)? {
      Some(value) => value.parse()?,
      None => PlatformId::current().ok_or(PlatformError::UnsupportedHost)?,
    };

    let force_not_parallel = flag(ENV_FORCE_NOTPARALLEL);
    let parallelism = if force_not_parallel { 1 } else { num_cpus() };

    Ok(Self {
      platform,
      library_paths: paths(ENV_LIBRARY_PATHS),
      default_library_paths: paths(ENV_DEFAULT_LIBRARY_PATHS),
      include_paths: paths(ENV_INCLUDE_PATHS),
      default_libs: text(ENV_DEFAULT_LIBS)?
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default(),
      link_directives_exe: text(ENV_LINK_DIRECTIVES_EXE)?.unwrap_or_default(),
      link_directives_lib: text(ENV_LINK_DIRECTIVES_LIB)?.unwrap_or_default(),
      force_not_parallel,
      parallel_make: flag(ENV_PARALLEL_MAKE),
      parallelism,
    })
  }

  /// Apply a `-j` style override; `FORCE_NOTPARALLEL` still wins.
  pub fn with_parallelism(mut self, jobs: usize) -> Self {
    self.parallelism = if self.force_not_parallel { 1 } else { jobs.max(1) };
    self
  }

  pub fn with_platform(mut self, platform: PlatformId) -> Self {
    self.platform = platform;
    self
  }

  /// Toolchain-formatted value behind a placeholder.
  ///
  /// `None` for `$${make}`, which names a program rather than a setting.
  pub fn variable(&self, placeholder: Placeholder) -> Option<String> {
    let toolchain = self.platform.toolchain();
    let value = match placeholder {
      Placeholder::LibraryPaths => toolchain.search_directives(&self.library_paths),
      Placeholder::DefaultLibraryPaths => toolchain.search_directives(&self.default_library_paths),
      Placeholder::DefaultLibs => toolchain.library_directives(&self.default_libs),
      Placeholder::LinkDirectivesExe => self.link_directives_exe.clone(),
      Placeholder::LinkDirectivesLib => self.link_directives_lib.clone(),
      Placeholder::IncludePaths => self
        .include_paths
        .iter()
        .map(|dir| toolchain.include_directive(dir))
        .collect::<Vec<_>>()
        .join(" "),
      Placeholder::Make => return None,
    };
    Some(value)
  }

  /// Every directory searched for libraries, configured paths first.
  pub fn search_paths(&self) -> impl Iterator<Item = &PathBuf> {
    self.library_paths.iter().chain(self.default_library_paths.iter())
  }
}

fn raw(var: &str) -> Option<OsString> {
  env::var_os(var).filter(|v| !v.is_empty())
}

fn text(var: &'static str) -> Result<Option<String>, ConfigError> {
  raw(var)
    .map(|v| v.into_string().map_err(|_| ConfigError::NotUnicode { var }))
    .transpose()
}

fn paths(var: &str) -> Vec<PathBuf> {
  raw(var)
    .map(|v| env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect())
    .unwrap_or_default()
}

/// Set and not `0`/`false`/`no`.
fn flag(var: &str) -> bool {
  raw(var)
    .and_then(|v| v.into_string().ok())
    .is_some_and(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
