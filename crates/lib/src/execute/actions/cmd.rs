//! Shell command execution for link and deploy recipes.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::execute::types::ExecuteError;

/// Run `cmd` through the shell in `cwd` on behalf of `target`.
///
/// Commands inherit the caller's environment; the toolchain is found on
/// `PATH`. Output is captured, returned on success and attached to the error
/// otherwise. Cancelling `cancel` kills the child.
pub async fn execute_cmd(
  target: &str,
  cmd: &str,
  cwd: &Path,
  shell: Option<&str>,
  cancel: &CancellationToken,
) -> Result<String, ExecuteError> {
  info!(target, cmd = %cmd, "executing command");

  let (shell_cmd, shell_args) = get_shell(shell);
  let child = Command::new(&shell_cmd)
    .args(&shell_args)
    .arg(cmd)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()
    .map_err(ExecuteError::io(cwd))?;

  debug!(shell = %shell_cmd, working_dir = ?cwd, "spawned process");

  let output = tokio::select! {
    output = child.wait_with_output() => output.map_err(ExecuteError::io(cwd))?,
    () = cancel.cancelled() => {
      debug!(target, "cancelled, killing child");
      return Err(ExecuteError::Cancelled { target: target.to_string() });
    }
  };

  let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
  captured.push_str(&String::from_utf8_lossy(&output.stderr));
  let captured = captured.trim().to_string();

  if !output.status.success() {
    return Err(ExecuteError::BuildAction {
      target: target.to_string(),
      command: cmd.to_string(),
      code: output.status.code(),
      output: captured,
    });
  }

  if !captured.is_empty() {
    debug!(output = %captured, "command output");
  }
  Ok(captured)
}

/// Shell and the flag passing it a command string.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  match override_shell {
    Some(shell) => (shell.to_string(), vec!["-c".to_string()]),
    None => ("/bin/sh".to_string(), vec!["-c".to_string()]),
  }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use std::time::Duration;

  use tempfile::TempDir;

  use super::*;

  #[tokio::test]
  async fn captures_output() {
    let temp = TempDir::new().unwrap();
    let output = execute_cmd("t", "echo hello", temp.path(), None, &CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(output, "hello");
  }

  #[tokio::test]
  async fn runs_in_working_directory() {
    let temp = TempDir::new().unwrap();
    let output = execute_cmd("t", "pwd", temp.path(), None, &CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(
      dunce::canonicalize(output).unwrap(),
      dunce::canonicalize(temp.path()).unwrap()
    );
  }

  #[tokio::test]
  async fn failure_carries_code_and_output() {
    let temp = TempDir::new().unwrap();
    let err = execute_cmd(
      "target_foo",
      "echo out; echo err >&2; exit 3",
      temp.path(),
      None,
      &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
      ExecuteError::BuildAction {
        target,
        code,
        output,
        ..
      } => {
        assert_eq!(target, "target_foo");
        assert_eq!(code, Some(3));
        assert!(output.contains("out"));
        assert!(output.contains("err"));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn cancellation_kills_the_child() {
    let temp = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = execute_cmd("target_slow", "sleep 30", temp.path(), None, &cancel)
      .await
      .unwrap_err();
    assert!(matches!(err, ExecuteError::Cancelled { target } if target == "target_slow"));
    assert!(started.elapsed() < Duration::from_secs(10));
  }
}
