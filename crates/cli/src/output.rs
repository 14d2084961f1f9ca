//! CLI output formatting utilities.
//!
//! Status lines go to stdout, warnings and errors to stderr. Rule text printed
//! by `generate --stdout` never passes through here, so it stays clean.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const SKIP: &str = "-";
}

/// Elapsed time at millisecond resolution, e.g. "1s 250ms".
pub fn format_duration(duration: Duration) -> String {
  let millis = duration - Duration::from_nanos(u64::from(duration.subsec_nanos() % 1_000_000));
  if millis.is_zero() {
    return "0ms".to_string();
  }
  humantime::format_duration(millis).to_string()
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// Flush buffered descriptor warnings, once, after all other output.
pub fn flush_warnings(warnings: &[String]) {
  for warning in warnings {
    print_warning(warning);
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
