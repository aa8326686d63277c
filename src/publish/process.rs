//! Subprocess execution for publish steps

use super::trait_def::{PublishError, PublishStep};
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Lines of stderr kept in a failure message
const STDERR_TAIL_LINES: usize = 20;

/// Run one pipeline step to completion, capturing its output.
///
/// `command_line` is what errors and logs show; callers keep secrets out
/// of it. `stdin` is written to the child and then closed.
pub(crate) fn run_step(
  mut cmd: Command,
  step: PublishStep,
  command_line: &str,
  stdin: Option<&str>,
) -> Result<Output, PublishError> {
  tracing::info!(step = %step, command = command_line, "running publish step");

  cmd
    .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

  let mut child = cmd
    .spawn()
    .map_err(|e| PublishError::new(PublishStep::Spawn, command_line, format!("failed to start: {}", e)))?;

  if let Some(input) = stdin
    && let Some(mut pipe) = child.stdin.take()
  {
    pipe
      .write_all(input.as_bytes())
      .map_err(|e| PublishError::new(step, command_line, format!("failed to write stdin: {}", e)))?;
    // pipe dropped here so the child sees EOF
  }

  let output = child
    .wait_with_output()
    .map_err(|e| PublishError::new(step, command_line, format!("failed to wait: {}", e)))?;

  if !output.status.success() {
    let tail = stderr_tail(&output.stderr);
    let message = if tail.is_empty() {
      output.status.to_string()
    } else {
      format!("{}\n{}", output.status, tail)
    };
    return Err(PublishError::new(step, command_line, message));
  }

  tracing::debug!(
    step = %step,
    command = command_line,
    stdout = %String::from_utf8_lossy(&output.stdout).trim_end(),
    "publish step finished"
  );

  Ok(output)
}

/// Last few lines of stderr, lossily decoded
fn stderr_tail(stderr: &[u8]) -> String {
  let text = String::from_utf8_lossy(stderr);
  let lines: Vec<&str> = text.lines().collect();
  let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
  lines[start..].join("\n")
}
