//! Logical name to file name, path and target name transforms.
//!
//! All functions here are pure except [`Naming::unique_target_name`], which
//! advances a per-session sequence counter. Relative paths are resolved
//! against the session root captured when the session is created, so the
//! generated text does not depend on the process working directory later on.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{ARTIFACT_DIR, CROSS_OBJECT_SUFFIX, HEADER_DIR, OBJECT_SUFFIX};
use crate::platform::Toolchain;

/// The fixed set of artifact kinds atmake knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  Executable,
  SharedLibrary,
  Archive,
  Server,
  Bind,
}

impl ArtifactKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Executable => "executable",
      Self::SharedLibrary => "shared library",
      Self::Archive => "archive",
      Self::Server => "server",
      Self::Bind => "bind file",
    }
  }

  /// Whether other artifacts can link against this kind.
  pub fn is_library(&self) -> bool {
    matches!(self, Self::SharedLibrary | Self::Archive)
  }

  /// Canonical target name for a logical artifact name of this kind.
  pub fn target_name(&self, name: &str) -> String {
    match self {
      Self::Executable | Self::SharedLibrary => target_name(name),
      Self::Archive => archive_target_name(name),
      Self::Server => target_name(&format!("{name}_xatmi")),
      Self::Bind => format!("target_bind_{name}"),
    }
  }
}

impl fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

pub fn target_name(name: &str) -> String {
  format!("target_{name}")
}

pub fn archive_target_name(name: &str) -> String {
  format!("target_archive_{name}")
}

pub fn deploy_target_name(name: &str) -> String {
  format!("target_deploy_{name}")
}

/// `some/dir/file` -> `target_some_dir_file`
pub fn path_to_target_name(path: &str) -> String {
  let escaped: String = path
    .chars()
    .map(|c| match c {
      '/' | '\\' | ' ' | ':' => '_',
      c => c,
    })
    .collect();
  format!("target_{escaped}")
}

/// Strip `./` fragments from a directory name.
pub fn clean_directory_name(name: &str) -> String {
  name.replace("./", "")
}

/// `dir/x.o` -> `dir/x_crosscompile.o`
pub fn cross_object_name(object: &Path) -> PathBuf {
  replace_object_suffix(object, CROSS_OBJECT_SUFFIX)
}

fn replace_object_suffix(object: &Path, suffix: &str) -> PathBuf {
  let text = object.to_string_lossy();
  match text.strip_suffix(OBJECT_SUFFIX) {
    Some(stem) => PathBuf::from(format!("{stem}{suffix}")),
    None => PathBuf::from(format!("{text}{suffix}")),
  }
}

/// Lexically normalize a path: drop `.` components and fold `..` where possible.
pub fn normalize_lexically(path: &Path) -> PathBuf {
  let mut result = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !result.pop() {
          result.push("..");
        }
      }
      other => result.push(other.as_os_str()),
    }
  }
  result
}

/// Name and path transforms bound to one session root and toolchain.
#[derive(Debug, Clone)]
pub struct Naming {
  root: PathBuf,
  toolchain: &'static dyn Toolchain,
  sequence: u64,
}

impl Naming {
  /// `root` must already be absolute; it is never re-resolved.
  pub fn new(root: PathBuf, toolchain: &'static dyn Toolchain) -> Self {
    Self {
      root: normalize_lexically(&root),
      toolchain,
      sequence: 1,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn toolchain(&self) -> &'static dyn Toolchain {
    self.toolchain
  }

  /// Resolve `path` against the session root.
  pub fn normalize(&self, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
      normalize_lexically(path)
    } else {
      normalize_lexically(&self.root.join(path))
    }
  }

  /// On-disk file name for a logical artifact name.
  pub fn file_name(&self, kind: ArtifactKind, name: &str) -> String {
    self.toolchain.file_name(kind, name)
  }

  /// Absolute artifact path, always under the descriptor's `bin/`.
  pub fn artifact_path(&self, kind: ArtifactKind, name: &str) -> PathBuf {
    self.root.join(ARTIFACT_DIR).join(self.file_name(kind, name))
  }

  pub fn header_path(&self, name: &str) -> PathBuf {
    self.root.join(HEADER_DIR).join(name)
  }

  /// A fresh target name derived from `path`; never returns the same name twice.
  pub fn unique_target_name(&mut self, path: &str) -> String {
    let name = format!("{}_{}", path_to_target_name(path), self.sequence);
    self.sequence += 1;
    name
  }
}
