use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::ArtifactKind;

/// Public services of an XATMI server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Services {
  /// Explicit service names, advertised in the given order.
  Names(Vec<String>),
  /// A server definition file describing services and their semantics.
  DefinitionFile(PathBuf),
}

/// XA resources a server is linked with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
  /// Resource keys as named in the middleware's resource configuration.
  pub keys: Vec<String>,
  /// Resource properties file, used when building the middleware itself.
  pub configuration: Option<PathBuf>,
}

impl Resources {
  pub fn is_empty(&self) -> bool {
    self.keys.is_empty() && self.configuration.is_none()
  }
}

/// Identifies the action a recipe performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
  Link,
  CreateDirectory,
  Install,
  Deploy,
  RemoveFiles,
  RemoveMatching,
  Echo,
  Regenerate,
  Recurse,
}

impl ActionId {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Link => "link",
      Self::CreateDirectory => "create_directory",
      Self::Install => "install",
      Self::Deploy => "deploy",
      Self::RemoveFiles => "remove_files",
      Self::RemoveMatching => "remove_matching",
      Self::Echo => "echo",
      Self::Regenerate => "regenerate",
      Self::Recurse => "recurse",
    }
  }
}

impl fmt::Display for ActionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Recipe {
  Link {
    kind: ArtifactKind,
    destination: PathBuf,
    objects: Vec<PathBuf>,
    /// Logical library names, rendered as `-l<name>`.
    libraries: Vec<String>,
    directives: Vec<String>,
    services: Option<Services>,
    #[serde(default)]
    resources: Resources,
  },
  CreateDirectory {
    path: PathBuf,
  },
  Install {
    source: PathBuf,
    /// May reference environment variables (`$CASUAL_HOME/bin`).
    destination: String,
  },
  Deploy {
    file_name: String,
    kind: ArtifactKind,
  },
  RemoveFiles {
    paths: Vec<PathBuf>,
  },
  RemoveMatching {
    directory: PathBuf,
    extension: String,
  },
  /// Text with placeholders, written to stdout when realized.
  Echo {
    message: String,
  },
  /// Evaluate `descriptor` and write its rule file to `rules`.
  Regenerate {
    descriptor: PathBuf,
    rules: PathBuf,
  },
  /// Realize `target` in the session of another descriptor.
  Recurse {
    descriptor: PathBuf,
    rules: PathBuf,
    target: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("not a list - content: {0}")]
  NotAList(String),

  #[error("invalid name '{0}': names must be non-empty and free of whitespace and path separators")]
  InvalidName(String),

  #[error("{action} recipe is missing '{field}'")]
  MissingArgument { action: ActionId, field: &'static str },

  #[error("{kind} artifacts are not linked")]
  NotLinkable { kind: ArtifactKind },

  #[error("server '{0}' declares no services")]
  NoServices(String),

  #[error("services given for non-server artifact {0}")]
  UnexpectedServices(String),

  #[error("resources given for non-server artifact {0}")]
  UnexpectedResources(String),

  #[error("descriptor {0} cannot build itself")]
  SelfRecursion(PathBuf),

  #[error("{0}")]
  Inconsistent(String),
}

impl Recipe {
  pub fn id(&self) -> ActionId {
    match self {
      Self::Link { .. } => ActionId::Link,
      Self::CreateDirectory { .. } => ActionId::CreateDirectory,
      Self::Install { .. } => ActionId::Install,
      Self::Deploy { .. } => ActionId::Deploy,
      Self::RemoveFiles { .. } => ActionId::RemoveFiles,
      Self::RemoveMatching { .. } => ActionId::RemoveMatching,
      Self::Echo { .. } => ActionId::Echo,
      Self::Regenerate { .. } => ActionId::Regenerate,
      Self::Recurse { .. } => ActionId::Recurse,
    }
  }

  /// The file this recipe produces, if it is a writing recipe.
  pub fn writes(&self) -> Option<&Path> {
    match self {
      Self::Link { destination, .. } => Some(destination),
      Self::CreateDirectory { path } => Some(path),
      Self::Regenerate { rules, .. } => Some(rules),
      _ => None,
    }
  }

  pub fn is_writing(&self) -> bool {
    self.writes().is_some()
  }

  /// Check the argument mapping for this recipe.
  pub fn validate(&self) -> Result<(), ValidationError> {
    match self {
      Self::Link {
        kind,
        destination,
        services,
        resources,
        ..
      } => {
        if destination.as_os_str().is_empty() {
          return Err(ValidationError::MissingArgument {
            action: ActionId::Link,
            field: "destination",
          });
        }
        if *kind != ArtifactKind::Server && !resources.is_empty() {
          return Err(ValidationError::UnexpectedResources(destination.display().to_string()));
        }
        match (kind, services) {
          (ArtifactKind::Bind, _) => Err(ValidationError::NotLinkable { kind: *kind }),
          (ArtifactKind::Server, None) => Err(ValidationError::NoServices(destination.display().to_string())),
          (ArtifactKind::Server, Some(Services::Names(names))) if names.is_empty() => {
            Err(ValidationError::NoServices(destination.display().to_string()))
          }
          (ArtifactKind::Server, Some(_)) => Ok(()),
          (_, Some(_)) => Err(ValidationError::UnexpectedServices(destination.display().to_string())),
          (_, None) => Ok(()),
        }
      }
      Self::CreateDirectory { path } if path.as_os_str().is_empty() => Err(ValidationError::MissingArgument {
        action: ActionId::CreateDirectory,
        field: "path",
      }),
      Self::Install { destination, .. } if destination.trim().is_empty() => Err(ValidationError::MissingArgument {
        action: ActionId::Install,
        field: "destination",
      }),
      Self::RemoveMatching { extension, .. } if extension.is_empty() => Err(ValidationError::MissingArgument {
        action: ActionId::RemoveMatching,
        field: "extension",
      }),
      Self::Recurse { target, .. } if target.is_empty() => Err(ValidationError::MissingArgument {
        action: ActionId::Recurse,
        field: "target",
      }),
      _ => Ok(()),
    }
  }
}

/// Validate a logical artifact name.
pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
  if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
    return Err(ValidationError::InvalidName(name.to_string()));
  }
  Ok(())
}
