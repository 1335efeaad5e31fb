//! Subprocess execution and lifecycle management.

use crate::error::CliError;
use crate::types::{RunConfig, RunResult};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinSet;
use tokio::time::timeout;

const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024; // 10 MB
const GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// Which stream, its collected lines, and whether truncation occurred.
type StreamOutput = (StreamKind, Vec<String>, bool);

/// Result of collecting all subprocess output: stdout lines, stderr lines, and exit status.
type CollectedOutput = (Vec<String>, Vec<String>, std::process::ExitStatus);

/// Timeout-wrapped result of the full collection phase.
type TimedCollectionResult =
    Result<Result<CollectedOutput, CliError>, tokio::time::error::Elapsed>;

/// Spawns `path` with `args` and collects its output under `config.timeout`.
///
/// A non-zero exit is not an error here; check [`RunResult::success`].
///
/// # Errors
/// Returns a [`CliError`] if the process cannot be spawned, times out,
/// produces truncated output, or encounters an I/O failure.
pub async fn run_process(
    path: &Path,
    args: &[OsString],
    config: &RunConfig,
) -> Result<RunResult, CliError> {
    let start_time = Instant::now();

    let mut child = spawn_child(path, args, config)?;

    let stdout = child.stdout.take().ok_or(CliError::MissingHandle("stdout"))?;
    let stderr = child.stderr.take().ok_or(CliError::MissingHandle("stderr"))?;
    let pid = child.id().ok_or(CliError::MissingHandle("pid"))?;
    tracing::debug!(pid, program = %path.display(), "spawned child process");

    let mut tasks = JoinSet::new();
    tasks.spawn(drain_stream_bounded(stdout, StreamKind::Stdout));
    tasks.spawn(drain_stream_bounded(stderr, StreamKind::Stderr));

    let process_result = timeout(config.timeout, collect_output(&mut child, &mut tasks)).await;
    let duration = start_time.elapsed();

    build_run_result(process_result, &mut child, pid, &mut tasks, duration).await
}

/// Spawns the child with null stdin and piped stdout/stderr.
fn spawn_child(
    path: &Path,
    args: &[OsString],
    config: &RunConfig,
) -> Result<tokio::process::Child, CliError> {
    let mut cmd = Command::new(path);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(ref dir) = config.cwd {
        cmd.current_dir(dir);
    }

    cmd.spawn().map_err(|e| CliError::SpawnFailed {
        stage: "spawn".to_string(),
        source: e,
    })
}

/// Collects stdout and stderr output from reader tasks and waits for the child.
async fn collect_output(
    child: &mut tokio::process::Child,
    tasks: &mut JoinSet<StreamOutput>,
) -> Result<CollectedOutput, CliError> {
    let mut stdout_lines = Vec::new();
    let mut stderr_lines = Vec::new();

    while let Some(result) = tasks.join_next().await {
        let (kind, lines, truncated) = result.map_err(|e| CliError::StreamFailed {
            stage: "join".to_string(),
            source: e,
        })?;

        if truncated {
            let captured: usize = lines.iter().map(String::len).sum();
            return Err(CliError::OutputTruncated {
                captured_bytes: captured,
                limit_bytes: MAX_OUTPUT_BYTES,
            });
        }

        match kind {
            StreamKind::Stdout => stdout_lines = lines,
            StreamKind::Stderr => stderr_lines = lines,
        }
    }

    let status = child.wait().await.map_err(|e| CliError::SpawnFailed {
        stage: "wait".to_string(),
        source: e,
    })?;

    Ok((stdout_lines, stderr_lines, status))
}

/// Converts the raw process outcome into a [`RunResult`] or an appropriate error.
async fn build_run_result(
    process_result: TimedCollectionResult,
    child: &mut tokio::process::Child,
    pid: u32,
    tasks: &mut JoinSet<StreamOutput>,
    duration: Duration,
) -> Result<RunResult, CliError> {
    let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

    match process_result {
        Ok(Ok((stdout_lines, stderr_lines, status))) => Ok(RunResult {
            stdout: stdout_lines.join("\n"),
            stderr: stderr_lines.join("\n"),
            exit_code: status.code().unwrap_or(-1),
            duration_ms,
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            tracing::warn!(pid, elapsed = ?duration, "child timed out, shutting down");
            if let Err(e) = graceful_shutdown(child, pid, tasks).await {
                tracing::warn!(pid, error = %e, "graceful shutdown failed");
            }

            Err(CliError::Timeout {
                elapsed: duration,
                pid,
            })
        }
    }
}

/// Drains a stream line by line, keeping at most [`MAX_OUTPUT_BYTES`].
async fn drain_stream_bounded(
    stream: impl tokio::io::AsyncRead + Unpin,
    kind: StreamKind,
) -> StreamOutput {
    let mut reader = BufReader::new(stream).lines();
    let mut lines = Vec::new();
    let mut total_bytes = 0usize;
    let mut truncated = false;

    loop {
        let Ok(Some(line)) = reader.next_line().await else {
            break;
        };

        let line_bytes = line.len();
        if total_bytes + line_bytes <= MAX_OUTPUT_BYTES {
            lines.push(line);
            total_bytes += line_bytes;
        } else {
            truncated = true;
        }
    }

    (kind, lines, truncated)
}

/// Graceful shutdown: `SIGTERM`, wait grace period, then `SIGKILL`.
#[cfg(unix)]
async fn graceful_shutdown(
    child: &mut tokio::process::Child,
    pid: u32,
    tasks: &mut JoinSet<StreamOutput>,
) -> Result<(), CliError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw_pid = i32::try_from(pid).map_err(|_| CliError::SignalFailed {
        signal: "SIGTERM".to_string(),
        pid,
        reason: "PID value exceeds i32::MAX".to_string(),
    })?;
    let nix_pid = Pid::from_raw(raw_pid);

    signal::kill(nix_pid, Signal::SIGTERM).map_err(|e| CliError::SignalFailed {
        signal: "SIGTERM".to_string(),
        pid,
        reason: e.to_string(),
    })?;

    match timeout(GRACE_PERIOD, child.wait()).await {
        Ok(Ok(_status)) => {}
        Ok(Err(e)) => {
            return Err(CliError::SpawnFailed {
                stage: "graceful_shutdown wait".to_string(),
                source: e,
            });
        }
        Err(_) => {
            child.kill().await.map_err(|e| CliError::SpawnFailed {
                stage: "SIGKILL".to_string(),
                source: e,
            })?;
            child.wait().await.map_err(|e| CliError::SpawnFailed {
                stage: "post-SIGKILL wait".to_string(),
                source: e,
            })?;
        }
    }

    tasks.abort_all();
    Ok(())
}

/// Windows: immediate termination, no graceful shutdown for console processes.
#[cfg(windows)]
async fn graceful_shutdown(
    child: &mut tokio::process::Child,
    _pid: u32,
    tasks: &mut JoinSet<StreamOutput>,
) -> Result<(), CliError> {
    child.kill().await.map_err(|e| CliError::SpawnFailed {
        stage: "TerminateProcess".to_string(),
        source: e,
    })?;
    child.wait().await.map_err(|e| CliError::SpawnFailed {
        stage: "post-kill wait".to_string(),
        source: e,
    })?;
    tasks.abort_all();
    Ok(())
}
