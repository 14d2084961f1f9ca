//! Placeholder resolution for direct execution.

use crate::config::Config;
use crate::placeholder::{Placeholder, PlaceholderError, Resolver};

/// Resolves placeholders to the configured, toolchain-formatted values.
#[derive(Debug, Clone, Copy)]
pub struct ConfigResolver<'a> {
  config: &'a Config,
}

impl<'a> ConfigResolver<'a> {
  pub fn new(config: &'a Config) -> Self {
    Self { config }
  }
}

impl Resolver for ConfigResolver<'_> {
  fn resolve(&self, placeholder: Placeholder) -> Result<String, PlaceholderError> {
    Ok(
      self
        .config
        .variable(placeholder)
        .unwrap_or_else(|| "make".to_string()),
    )
  }
}
