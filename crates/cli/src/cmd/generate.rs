//! Implementation of the `atmake generate` command.
//!
//! Evaluates one descriptor and writes its rule file next to it, or prints
//! the rules with `--stdout`.

use std::path::Path;

use anyhow::{Context, Result};

use atmake_lib::config::Config;
use atmake_lib::descriptor::Descriptor;

use crate::output::{flush_warnings, print_success};

pub fn cmd_generate(descriptor: &Path, config: &Config, stdout: bool) -> Result<()> {
  let descriptor = Descriptor::new(absolute(descriptor)?);

  if stdout {
    let rendered = descriptor
      .render(config)
      .with_context(|| format!("Failed to generate rules for {}", descriptor.path().display()))?;
    print!("{}", rendered.text);
    flush_warnings(&rendered.warnings);
    return Ok(());
  }

  let generated = descriptor
    .generate(config)
    .with_context(|| format!("Failed to generate rules for {}", descriptor.path().display()))?;
  print_success(&format!("Generated {}", generated.rules.display()));
  flush_warnings(&generated.warnings);

  Ok(())
}

/// Canonical descriptor path; generated rules only ever hold absolute paths.
pub(crate) fn absolute(descriptor: &Path) -> Result<std::path::PathBuf> {
  dunce::canonicalize(descriptor).with_context(|| format!("Descriptor not found: {}", descriptor.display()))
}
