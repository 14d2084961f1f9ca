//! Recipe to command text.
//!
//! Link templates come from the toolchain with `$${name}` placeholders still
//! in them; the caller's [`Resolver`] decides whether those become make
//! variables or configured values.

use std::path::{Path, PathBuf};

use crate::consts::GENERATOR;
use crate::placeholder::{self, PlaceholderError, Resolver};
use crate::platform::{LinkSpec, Toolchain};

use super::Recipe;

const MKDIR: &str = "mkdir -p";
const REMOVE: &str = "rm -f";
const SYNC: &str = "rsync --checksum -i";

/// The shell command a recipe runs in direct mode, if it runs one at all.
///
/// Only linking and deployment shell out; everything else is carried out
/// in-process by the executor.
pub fn shell_command(
  recipe: &Recipe,
  toolchain: &dyn Toolchain,
  search_paths: &[PathBuf],
  resolver: &impl Resolver,
) -> Result<Option<String>, PlaceholderError> {
  let template = match recipe {
    Recipe::Link {
      kind,
      destination,
      objects,
      libraries,
      directives,
      services,
      resources,
    } => toolchain.link_command(&LinkSpec {
      kind: *kind,
      destination,
      objects,
      libraries,
      search_paths,
      directives,
      services: services.as_ref(),
      resource_keys: &resources.keys,
      configuration: resources.configuration.as_deref(),
    }),
    Recipe::Deploy { file_name, kind } => Some(toolchain.deploy_command(file_name, *kind)),
    _ => None,
  };

  template.map(|t| placeholder::substitute(&t, resolver)).transpose()
}

/// Recipe lines for a generated rule file, without the leading tab.
pub fn make_lines(
  recipe: &Recipe,
  toolchain: &dyn Toolchain,
  search_paths: &[PathBuf],
  resolver: &impl Resolver,
) -> Result<Vec<String>, PlaceholderError> {
  let lines = match recipe {
    Recipe::Link { .. } => shell_command(recipe, toolchain, search_paths, resolver)?
      .into_iter()
      .collect(),
    Recipe::Deploy { .. } => shell_command(recipe, toolchain, search_paths, resolver)?
      .into_iter()
      .map(|cmd| format!("-@{cmd}"))
      .collect(),
    Recipe::CreateDirectory { path } => vec![format!("{MKDIR} {}", path.display())],
    Recipe::Install { source, destination } => {
      let destination = escape_make_dollar(destination);
      let parent = parent_of(&destination);
      let mut lines = Vec::new();
      if !parent.is_empty() {
        lines.push(format!("@{MKDIR} {parent}"));
      }
      lines.push(format!("{SYNC} {} {destination}", source.display()));
      lines
    }
    Recipe::RemoveFiles { paths } => paths
      .iter()
      .map(|path| format!("-{REMOVE} {}", path.display()))
      .collect(),
    Recipe::RemoveMatching { directory, extension } => {
      vec![format!("-{REMOVE} {}/*.{extension}", directory.display())]
    }
    Recipe::Echo { message } => vec![format!("@echo {}", placeholder::substitute(message, resolver)?)],
    Recipe::Regenerate { descriptor, rules } => vec![
      format!("@echo generate {} from {}", rules.display(), descriptor.display()),
      format!(
        "@cd {} && {GENERATOR} {}",
        directory_of(descriptor).display(),
        descriptor.display()
      ),
    ],
    Recipe::Recurse {
      descriptor,
      rules,
      target,
    } => {
      let make = placeholder::substitute("$${make}", resolver)?;
      vec![
        format!("@echo {} {target}", descriptor.display()),
        format!(
          "@cd {} && {make} -f {} {target}",
          directory_of(descriptor).display(),
          rules.display()
        ),
      ]
    }
  };

  Ok(lines)
}

/// An install destination starting with `$` refers to an environment
/// variable; make needs it written as `$$`.
pub fn escape_make_dollar(destination: &str) -> String {
  if destination.starts_with('$') {
    format!("${destination}")
  } else {
    destination.to_string()
  }
}

fn parent_of(destination: &str) -> &str {
  destination.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn directory_of(path: &Path) -> &Path {
  path.parent().unwrap_or(Path::new("."))
}
