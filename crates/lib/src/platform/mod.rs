//! Platform selection and toolchain conventions.
//!
//! Everything that differs between toolchains (artifact prefixes and suffixes,
//! linker directives, link command templates) sits behind the [`Toolchain`]
//! trait. The set of implementations is closed: a [`PlatformId`] is chosen once
//! at start-up from configuration and resolved to a `&'static dyn Toolchain`.
//!
//! Link templates leave toolchain-wide values (search paths, default
//! libraries, link directives) as `$${name}` placeholders so the same recipe
//! text can be rendered for make or executed directly.

pub mod host;
mod linux;
mod osx;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::ArtifactKind;
use crate::recipe::Services;

pub use host::{Arch, Host, Os};
pub use linux::Linux;
pub use osx::Osx;

/// Toolchain flavours known to atmake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
  Linux,
  Osx,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
  #[error("unknown platform '{0}' (expected one of: linux, osx)")]
  Unknown(String),

  #[error("host operating system is not supported, set ATMAKE_PLATFORM explicitly")]
  UnsupportedHost,
}

impl PlatformId {
  /// Platform matching the host operating system.
  pub fn current() -> Option<Self> {
    match Os::current()? {
      Os::Linux => Some(Self::Linux),
      Os::Darwin => Some(Self::Osx),
      Os::Windows => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::Osx => "osx",
    }
  }

  /// Resolve the toolchain implementation for this platform.
  pub fn toolchain(self) -> &'static dyn Toolchain {
    match self {
      Self::Linux => &Linux,
      Self::Osx => &Osx,
    }
  }
}

impl fmt::Display for PlatformId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for PlatformId {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "linux" => Ok(Self::Linux),
      "osx" | "darwin" | "macos" => Ok(Self::Osx),
      other => Err(PlatformError::Unknown(other.to_string())),
    }
  }
}

/// Everything a toolchain needs to produce a link invocation.
#[derive(Debug, Clone, Copy)]
pub struct LinkSpec<'a> {
  pub kind: ArtifactKind,
  pub destination: &'a Path,
  pub objects: &'a [PathBuf],
  pub libraries: &'a [String],
  pub search_paths: &'a [PathBuf],
  pub directives: &'a [String],
  pub services: Option<&'a Services>,
  /// XA resource keys, servers only.
  pub resource_keys: &'a [String],
  /// Resource properties file, servers only.
  pub configuration: Option<&'a Path>,
}

/// Per-platform naming and invocation conventions.
pub trait Toolchain: Send + Sync + fmt::Debug {
  fn id(&self) -> PlatformId;

  /// File name prefix for an artifact kind.
  fn prefix(&self, kind: ArtifactKind) -> &'static str {
    match kind {
      ArtifactKind::SharedLibrary | ArtifactKind::Archive => "lib",
      ArtifactKind::Executable | ArtifactKind::Server | ArtifactKind::Bind => "",
    }
  }

  /// File name suffix for an artifact kind.
  fn suffix(&self, kind: ArtifactKind) -> &'static str;

  /// Compiler driver used for linking.
  fn linker(&self) -> &'static str;

  /// Flag turning a link into a shared library link.
  fn shared_flag(&self) -> &'static str;

  fn file_name(&self, kind: ArtifactKind, name: &str) -> String {
    format!("{}{}{}", self.prefix(kind), name, self.suffix(kind))
  }

  fn library_directive(&self, library: &str) -> String {
    format!("-l{library}")
  }

  fn library_path_directive(&self, dir: &Path) -> String {
    format!("-L{}", dir.display())
  }

  fn include_directive(&self, dir: &Path) -> String {
    format!("-I{}", dir.display())
  }

  /// Command producing the artifact, `None` for kinds that are never linked.
  fn link_command(&self, link: &LinkSpec<'_>) -> Option<String> {
    let destination = link.destination.display().to_string();
    let objects = join_paths(link.objects);
    let directives = link.directives.join(" ");

    let tail = match link.kind {
      ArtifactKind::Archive => {
        return Some(compact(&["ar rcs", directives.as_str(), destination.as_str(), objects.as_str()]));
      }
      ArtifactKind::Server => return Some(self.server_command(link)),
      ArtifactKind::Bind => return None,
      ArtifactKind::SharedLibrary => format!("$${{default_libs}} {} $${{link_directives_lib}}", self.shared_flag()),
      ArtifactKind::Executable => "$${default_libs} $${link_directives_exe}".to_string(),
    };

    let search = self.search_directives(link.search_paths);
    let libraries = self.library_directives(link.libraries);
    let linker = format!("{} -o", self.linker());
    Some(compact(&[
      linker.as_str(),
      destination.as_str(),
      objects.as_str(),
      search.as_str(),
      "$${library_paths} $${default_library_paths}",
      libraries.as_str(),
      tail.as_str(),
      directives.as_str(),
    ]))
  }

  /// XATMI servers are linked through the middleware's build-server tool on
  /// every platform.
  fn server_command(&self, link: &LinkSpec<'_>) -> String {
    let resources = match link.resource_keys {
      [] => String::new(),
      keys => format!("--resource-keys {}", keys.join(" ")),
    };
    let configuration = link
      .configuration
      .map(|path| format!("--properties-file {}", path.display()))
      .unwrap_or_default();
    let services = match link.services {
      Some(Services::Names(names)) => format!("-s {}", names.join(" ")),
      Some(Services::DefinitionFile(path)) => format!("-p {}", path.display()),
      None => String::new(),
    };

    let objects = join_paths(link.objects);
    let search = self.search_directives(link.search_paths);
    let libs = self.library_directives(link.libraries);
    let libraries = compact(&[
      search.as_str(),
      "$${library_paths}",
      "$${default_library_paths}",
      libs.as_str(),
      "$${default_libs}",
    ]);
    let destination = link.destination.display().to_string();
    let directives = link.directives.join(" ");
    let objects_arg = format!("-f \"{objects}\"");
    let libraries_arg = format!("-f \"{libraries}\"");

    compact(&[
      "casual-build-server",
      "-o",
      destination.as_str(),
      resources.as_str(),
      configuration.as_str(),
      services.as_str(),
      directives.as_str(),
      objects_arg.as_str(),
      libraries_arg.as_str(),
      "-f \"$${link_directives_exe}\"",
      "-f \"$${include_paths}\"",
    ])
  }

  fn deploy_command(&self, file_name: &str, kind: ArtifactKind) -> String {
    let class = match kind {
      ArtifactKind::Executable | ArtifactKind::Server => "exe",
      ArtifactKind::SharedLibrary => "lib",
      ArtifactKind::Archive => "archive",
      ArtifactKind::Bind => "bind",
    };
    format!("{} {} {}", crate::consts::DEPLOY_SCRIPT, file_name, class)
  }

  fn search_directives(&self, dirs: &[PathBuf]) -> String {
    dirs
      .iter()
      .map(|dir| self.library_path_directive(dir))
      .collect::<Vec<_>>()
      .join(" ")
  }

  fn library_directives(&self, libraries: &[String]) -> String {
    libraries
      .iter()
      .map(|lib| self.library_directive(lib))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Join non-empty fragments with single spaces.
fn compact(parts: &[&str]) -> String {
  parts
    .iter()
    .map(|p| p.trim())
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

fn join_paths(paths: &[PathBuf]) -> String {
  paths
    .iter()
    .map(|p| p.display().to_string())
    .collect::<Vec<_>>()
    .join(" ")
}
