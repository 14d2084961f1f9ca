//! Implementation of the `atmake build` command.
//!
//! Realizes targets of a descriptor directly: no rule file is written and make
//! is not involved. Ctrl-C cancels running recipes.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};
use tracing::debug;

use atmake_lib::config::Config;
use atmake_lib::eval::evaluate_descriptor;
use atmake_lib::execute::{ExecuteConfig, RealizeResult, realize};

use super::generate::absolute;
use crate::output::{
  OutputFormat, flush_warnings, format_duration, print_error, print_json, print_stat, print_success, symbols,
};

pub fn cmd_build(
  descriptor: &Path,
  targets: Vec<String>,
  config: Config,
  keep_going: bool,
  output: OutputFormat,
) -> Result<()> {
  let path = absolute(descriptor)?;
  let started = Instant::now();

  let mut session =
    evaluate_descriptor(&path, &config).with_context(|| format!("Failed to evaluate {}", path.display()))?;
  session.resolve_externals();
  let session = Arc::new(session);

  let execute = ExecuteConfig {
    keep_going,
    ..ExecuteConfig::from_config(&config)
  };
  let cancel = execute.cancel.clone();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(async {
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        debug!("interrupted, cancelling recipes");
        cancel.cancel();
      }
    });
    realize(Arc::clone(&session), targets, execute).await
  });
  let warnings = session.messages().take();

  let result = match result {
    Ok(result) => result,
    Err(e) => {
      flush_warnings(&warnings);
      return Err(e).context("Build failed");
    }
  };

  for line in &result.output {
    println!("{}", line);
  }

  if output.is_json() {
    print_json(&summary(&result))?;
  } else {
    print_report(&result, started);
  }
  flush_warnings(&warnings);

  if !result.is_success() {
    bail!("Build failed: {}", result.failure_summary());
  }
  Ok(())
}

fn print_report(result: &RealizeResult, started: Instant) {
  for (name, error) in &result.failed {
    print_error(&format!("{}: {}", name, error));
  }
  for (name, cause) in &result.skipped {
    println!(
      "  {} {} {}",
      symbols::SKIP.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      name,
      format!("(after {})", cause).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }

  if result.is_success() {
    print_success(&format!("Build complete in {}", format_duration(started.elapsed())));
  }
  print_stat("Rebuilt", &result.rebuilt.len().to_string());
  print_stat("Up to date", &result.up_to_date.len().to_string());
  if !result.is_success() {
    print_stat("Failed", &result.failed.len().to_string());
    print_stat("Skipped", &result.skipped.len().to_string());
  }
}

fn summary(result: &RealizeResult) -> serde_json::Value {
  let failed: Vec<_> = result
    .failed
    .iter()
    .map(|(name, error)| serde_json::json!({ "target": name, "error": error.to_string() }))
    .collect();
  serde_json::json!({
    "success": result.is_success(),
    "rebuilt": result.rebuilt,
    "up_to_date": result.up_to_date,
    "failed": failed,
    "skipped": result.skipped,
  })
}
