//! # Command Execution Module / 命令执行模块
//!
//! Builds test commands from command lines and runs them with their stdout
//! and stderr merged into one line stream, so step lines can be acted upon
//! while the test is still running.
//!
//! 从命令行构建测试命令，并将其 stdout 和 stderr 合并为一个行流运行，
//! 以便在测试仍在运行时处理步骤行。

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Expands `~` and environment variables in `command_line`, splits it
/// shell-style, and prepares a command that runs in `cwd` and is killed when
/// dropped.
///
/// # Returns
/// The command and the expanded command line (for logging).
pub fn build_command(command_line: &str, cwd: &Path) -> Result<(tokio::process::Command, String)> {
    let expanded = shellexpand::full(command_line)
        .with_context(|| format!("Failed to expand command: {command_line}"))?
        .to_string();

    let parts =
        shlex::split(&expanded).ok_or_else(|| anyhow!("Failed to parse command: {expanded}"))?;
    let Some((program, args)) = parts.split_first() else {
        return Err(anyhow!("Empty command after parsing."));
    };

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args).kill_on_drop(true).current_dir(cwd);
    Ok((cmd, expanded))
}

/// Lines of `reader`, decoded lossily. A read error is yielded once and ends
/// the stream.
fn raw_lines<R>(reader: R) -> impl Stream<Item = std::io::Result<String>>
where
    R: AsyncRead + Unpin,
{
    futures::stream::unfold(Some(BufReader::new(reader)), |reader| async move {
        let mut reader = reader?;
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                Some((Ok(String::from_utf8_lossy(&buf).into_owned()), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

/// Spawns a command and captures its stdout and stderr.
/// Both streams are read concurrently; every line is handed to `on_line` as
/// it arrives and also appended to the returned output. Bytes that are not
/// UTF-8 are replaced, never fatal.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`. A read error
///   on either stream turns it into an error once the child has exited.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 两个流被并发读取；每一行到达时都会交给 `on_line`，并追加到返回的输出中。
/// 任一流的读取错误都会使返回的状态变为错误。
pub async fn spawn_and_capture<F>(
    mut cmd: tokio::process::Command,
    mut on_line: F,
) -> (std::io::Result<ExitStatus>, String)
where
    F: FnMut(&str),
{
    let mut child = match cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other("failed to capture child output")),
            String::new(),
        );
    };

    // A failed stream ends on its own; the other keeps draining.
    let mut lines = Box::pin(raw_lines(stdout)).merge(Box::pin(raw_lines(stderr)));

    let mut output = String::new();
    let mut read_error = None;
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => {
                on_line(&line);
                output.push_str(&line);
                output.push('\n');
            }
            Err(e) => {
                warn!("failed to read child output: {e}");
                read_error.get_or_insert(e);
            }
        }
    }

    let status = child.wait().await;
    match read_error {
        Some(e) => (Err(e), output),
        None => (status, output),
    }
}
