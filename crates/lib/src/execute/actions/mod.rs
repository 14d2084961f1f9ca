//! Recipe dispatch for direct execution.
//!
//! Link and deploy recipes run through the shell; everything else is carried
//! out in-process. Sub-descriptor recipes evaluate the sub-descriptor on a
//! blocking thread and realize it with the same settings.

pub mod cmd;
pub mod fs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::descriptor::Descriptor;
use crate::eval::evaluate_descriptor;
use crate::execute::resolver::ConfigResolver;
use crate::execute::types::{ExecuteConfig, ExecuteError};
use crate::graph::Target;
use crate::placeholder;
use crate::recipe::{Recipe, render};
use crate::session::Session;

pub use cmd::execute_cmd;

/// Run one recipe of `target`, returning any lines it prints.
pub async fn execute_recipe(
  recipe: &Recipe,
  target: &Target,
  session: &Session,
  config: &ExecuteConfig,
) -> Result<Vec<String>, ExecuteError> {
  let resolver = ConfigResolver::new(session.config());

  match recipe {
    Recipe::Link { .. } => {
      let search_paths = session.link_search_paths(target);
      let command = render::shell_command(recipe, session.naming().toolchain(), &search_paths, &resolver)?;
      if let Some(command) = command {
        execute_cmd(&target.name, &command, session.root(), config.shell.as_deref(), &config.cancel).await?;
      }
      Ok(Vec::new())
    }

    Recipe::Deploy { file_name, .. } => {
      let Some(command) = render::shell_command(recipe, session.naming().toolchain(), &[], &resolver)? else {
        return Ok(Vec::new());
      };
      match execute_cmd(&target.name, &command, session.root(), config.shell.as_deref(), &config.cancel).await {
        Ok(_) => {}
        Err(e @ ExecuteError::Cancelled { .. }) => return Err(e),
        Err(e) => session.warn(format!("deploy of {file_name} failed: {e}")),
      }
      Ok(Vec::new())
    }

    Recipe::CreateDirectory { path } => {
      fs::create_directory(path).await?;
      Ok(Vec::new())
    }

    Recipe::Install { source, destination } => {
      let destination = PathBuf::from(fs::expand_env(destination)?);
      let destination = session.naming().normalize(destination);
      fs::install(source, &destination).await?;
      Ok(Vec::new())
    }

    Recipe::RemoveFiles { paths } => {
      fs::remove_files(paths).await?;
      Ok(Vec::new())
    }

    Recipe::RemoveMatching { directory, extension } => {
      fs::remove_matching(directory, extension).await?;
      Ok(Vec::new())
    }

    Recipe::Echo { message } => Ok(vec![placeholder::substitute(message, &resolver)?]),

    Recipe::Regenerate { descriptor, .. } => {
      regenerate(descriptor, session).await?;
      Ok(Vec::new())
    }

    Recipe::Recurse {
      descriptor, target: name, ..
    } => recurse(descriptor, name, session, config).await,
  }
}

async fn regenerate(descriptor: &Path, session: &Session) -> Result<(), ExecuteError> {
  let descriptor = Descriptor::new(descriptor.to_path_buf());
  let config = session.config().clone();
  let path = descriptor.path().to_path_buf();

  let generated = tokio::task::spawn_blocking(move || descriptor.generate(&config))
    .await
    .map_err(|e| ExecuteError::Join(e.to_string()))?
    .map_err(|e| ExecuteError::Descriptor {
      descriptor: path,
      message: e.to_string(),
    })?;

  info!(rules = %generated.rules.display(), "rules regenerated");
  session.messages().extend(generated.warnings);
  Ok(())
}

/// Realize `name` in the sub-descriptor's own session.
async fn recurse(
  descriptor: &Path,
  name: &str,
  session: &Session,
  config: &ExecuteConfig,
) -> Result<Vec<String>, ExecuteError> {
  let path = descriptor.to_path_buf();
  let settings = session.config().clone();

  let sub = tokio::task::spawn_blocking(move || {
    evaluate_descriptor(&path, &settings).map(|mut sub| {
      sub.resolve_externals();
      sub
    })
  })
  .await
  .map_err(|e| ExecuteError::Join(e.to_string()))?
  .map_err(|e| ExecuteError::Descriptor {
    descriptor: descriptor.to_path_buf(),
    message: e.to_string(),
  })?;

  debug!(descriptor = %descriptor.display(), target = name, "recursing");
  let sub = Arc::new(sub);
  let result = super::realize_boxed(Arc::clone(&sub), vec![name.to_string()], config.clone()).await?;
  session.messages().extend(sub.messages().take());

  if !result.is_success() {
    let failed = if result.failed.is_empty() {
      result.skipped.values().cloned().collect::<Vec<_>>().join(", ")
    } else {
      result.failure_summary()
    };
    return Err(ExecuteError::Recursion {
      descriptor: descriptor.to_path_buf(),
      target: name.to_string(),
      failed,
    });
  }
  Ok(result.output)
}
