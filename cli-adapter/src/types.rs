use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CliError;

/// How a single subprocess is run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Hard time budget for the process.
    pub timeout: Duration,
    /// Working directory; inherits ours when `None`.
    pub cwd: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            cwd: None,
        }
    }
}

impl RunConfig {
    /// Set the time budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Captured outcome of a finished process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Stdout lines joined with `\n`.
    pub stdout: String,
    /// Stderr lines joined with `\n`.
    pub stderr: String,
    /// Exit code, `-1` when killed by a signal.
    pub exit_code: i32,
    /// Wall-clock run time.
    pub duration_ms: u64,
}

impl RunResult {
    /// Whether the process exited with status 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turns a non-zero exit into [`CliError::NonZeroExit`].
    ///
    /// # Errors
    ///
    /// Returns `CliError::NonZeroExit` with the captured output when the exit
    /// code is not 0.
    pub fn into_success(self) -> Result<Self, CliError> {
        if self.success() {
            Ok(self)
        } else {
            Err(CliError::NonZeroExit {
                exit_code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}
