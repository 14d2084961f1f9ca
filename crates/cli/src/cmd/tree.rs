//! Implementation of the `atmake tree` command.
//!
//! Walks a source tree, regenerates the rule files whose descriptors changed
//! and optionally builds the top-level descriptor.

use std::path::Path;

use anyhow::{Context, Result, bail};

use atmake_lib::config::Config;
use atmake_lib::consts::DESCRIPTOR_FILE_NAME;
use atmake_lib::descriptor::regenerate_tree;

use super::build::cmd_build;
use crate::output::{OutputFormat, flush_warnings, print_info, print_json, print_stat, print_success, symbols};

pub fn cmd_tree(root: &Path, config: Config, force: bool, build: bool, output: OutputFormat) -> Result<()> {
  let root = dunce::canonicalize(root).with_context(|| format!("Directory not found: {}", root.display()))?;

  let report = regenerate_tree(&root, &config, force)
    .with_context(|| format!("Failed to regenerate rules below {}", root.display()))?;

  if output.is_json() {
    print_json(&report)?;
  } else if report.regenerated.is_empty() && report.fresh.is_empty() {
    print_info(&format!("No {} found below {}", DESCRIPTOR_FILE_NAME, root.display()));
  } else {
    for rules in &report.regenerated {
      println!("  {} {}", symbols::ARROW, rules.display());
    }
    print_success(&format!("Regenerated {} rule file(s)", report.regenerated.len()));
    print_stat("Fresh", &report.fresh.len().to_string());
  }
  flush_warnings(&report.warnings);

  if build {
    let top = root.join(DESCRIPTOR_FILE_NAME);
    if !top.is_file() {
      bail!("No top-level descriptor to build: {}", top.display());
    }
    cmd_build(&top, Vec::new(), config, false, output)?;
  }

  Ok(())
}
