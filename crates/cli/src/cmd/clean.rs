use std::path::Path;

use anyhow::Result;

use atmake_lib::config::Config;

use super::build::cmd_build;
use crate::output::OutputFormat;

/// `atmake clean`: realize the `clean` target, which removes every produced
/// file, object and dependency file the descriptor knows about.
pub fn cmd_clean(descriptor: &Path, config: Config) -> Result<()> {
  cmd_build(descriptor, vec!["clean".to_string()], config, true, OutputFormat::Text)
}
