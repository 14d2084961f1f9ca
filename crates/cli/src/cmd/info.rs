use anyhow::Result;

use atmake_lib::config::Config;
use atmake_lib::consts::APP_NAME;
use atmake_lib::placeholder::Placeholder;
use atmake_lib::platform::Host;

use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_info(config: &Config, output: OutputFormat) -> Result<()> {
  let host = Host::current().map(|h| h.triple());

  if output.is_json() {
    return print_json(&serde_json::json!({
      "version": env!("CARGO_PKG_VERSION"),
      "host": host,
      "config": config,
    }));
  }

  println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
  println!();
  println!("System:");
  match host {
    Some(triple) => print_stat("Host", &triple),
    None => print_stat("Host", "unknown"),
  }
  print_stat("Platform", config.platform.as_str());
  print_stat("Parallelism", &config.parallelism.to_string());

  println!();
  println!("Variables:");
  for placeholder in Placeholder::ALL {
    if let Some(value) = config.variable(placeholder) {
      print_stat(placeholder.make_variable(), &value);
    }
  }

  Ok(())
}
