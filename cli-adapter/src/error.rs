use std::time::Duration;
use thiserror::Error;

/// Failures of a CLI subprocess run.
#[derive(Debug, Error)]
pub enum CliError {
    /// No usable executable was found.
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    /// An I/O operation on the child failed.
    #[error("Process I/O failed during {stage}: {source}")]
    SpawnFailed {
        /// Lifecycle stage (`spawn`, `wait`, ...).
        stage: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The child was spawned without the expected pipe.
    #[error("Child process has no {0} handle")]
    MissingHandle(&'static str),

    /// A stream reader task panicked or was cancelled.
    #[error("Stream reader failed during {stage}: {source}")]
    StreamFailed {
        /// Lifecycle stage.
        stage: String,
        /// Join failure.
        #[source]
        source: tokio::task::JoinError,
    },

    /// A stream exceeded the capture limit.
    #[error("Output truncated: captured {captured_bytes} bytes, limit {limit_bytes}")]
    OutputTruncated {
        /// Bytes kept before the limit was hit.
        captured_bytes: usize,
        /// Per-stream capture limit.
        limit_bytes: usize,
    },

    /// The child did not finish within its time budget.
    #[error("Process {pid} timed out after {elapsed:?}")]
    Timeout {
        /// Time spent before giving up.
        elapsed: Duration,
        /// Child process id.
        pid: u32,
    },

    /// Sending a termination signal failed.
    #[error("Failed to send {signal} to {pid}: {reason}")]
    SignalFailed {
        /// Signal name.
        signal: String,
        /// Target process id.
        pid: u32,
        /// OS error text.
        reason: String,
    },

    /// The child exited unsuccessfully.
    #[error("Process exited with non-zero status: {exit_code}\nSTDERR: {stderr}")]
    NonZeroExit {
        /// Exit code, `-1` when killed by a signal.
        exit_code: i32,
        /// Captured stdout.
        stdout: String,
        /// Captured stderr.
        stderr: String,
    },
}
