//! [`LlmBackend`] driving the `claude` CLI in print mode.

use async_trait::async_trait;
use reel_recipe_extraction::{BackendError, LlmBackend};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::discovery::{discover, CLAUDE};
use crate::error::CliError;
use crate::process::run_process;
use crate::types::{RunConfig, RunResult};

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "429", "overloaded", "too many requests"];

/// Runs one `claude --print` process per completion.
///
/// Built-in tools are disabled so the model can only answer with text.
#[derive(Debug, Clone)]
pub struct ClaudeBackend {
    path: PathBuf,
    model: Option<String>,
    config: RunConfig,
}

impl ClaudeBackend {
    /// Creates a backend for the executable at `path`.
    #[must_use]
    pub const fn new(path: PathBuf, model: Option<String>, config: RunConfig) -> Self {
        Self {
            path,
            model,
            config,
        }
    }

    /// Locates the `claude` executable and creates a backend for it.
    ///
    /// # Errors
    ///
    /// Returns `CliError::ExecutableNotFound` when the CLI cannot be found.
    pub fn discover(
        explicit_path: Option<PathBuf>,
        model: Option<String>,
        config: RunConfig,
    ) -> Result<Self, CliError> {
        let path = discover(&CLAUDE, explicit_path)?;
        tracing::debug!(path = %path.display(), "using claude CLI");
        Ok(Self::new(path, model, config))
    }
}

/// Builds the argument list for a `claude --print` invocation.
#[must_use]
pub fn build_args(prompt: &str, model: Option<&str>) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("--print"),
        OsString::from("--output-format"),
        OsString::from("text"),
    ];

    if let Some(model) = model {
        args.push(OsString::from("--model"));
        args.push(OsString::from(model));
    }

    args.push(OsString::from("--tools"));
    args.push(OsString::from(""));
    args.push(OsString::from(prompt));
    args
}

/// Maps a process-level failure to a backend error.
#[must_use]
pub fn classify_cli_error(error: CliError) -> BackendError {
    match error {
        CliError::NonZeroExit { stdout, stderr, exit_code } => {
            let combined = format!("{stderr}\n{stdout}");
            if is_rate_limited(&combined) {
                BackendError::RateLimited {
                    retry_after: parse_retry_after(&combined),
                }
            } else {
                let detail = last_non_empty_line(&stderr)
                    .or_else(|| last_non_empty_line(&stdout))
                    .unwrap_or("no output");
                BackendError::Transport(format!("claude exited with status {exit_code}: {detail}"))
            }
        }
        other => BackendError::Transport(other.to_string()),
    }
}

fn is_rate_limited(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Reads `retry after N` / `retry-after: N` (seconds) from provider output.
fn parse_retry_after(text: &str) -> Option<Duration> {
    let lower = text.to_ascii_lowercase();
    let index = lower.find("retry-after").or_else(|| lower.find("retry after"))?;
    let rest = &lower[index + "retry after".len()..];
    let digits: String = rest
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok().map(Duration::from_secs)
}

fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rfind(|line| !line.is_empty())
}

fn into_completion(result: RunResult) -> Result<String, BackendError> {
    let result = result.into_success().map_err(classify_cli_error)?;
    let text = result.stdout.trim();
    if text.is_empty() {
        return Err(BackendError::Transport("claude returned an empty response".to_string()));
    }
    Ok(text.to_string())
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let args = build_args(prompt, self.model.as_deref());
        let result = run_process(&self.path, &args, &self.config)
            .await
            .map_err(classify_cli_error)?;
        tracing::debug!(
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "claude finished"
        );
        into_completion(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stdout: &str, stderr: &str) -> CliError {
        CliError::NonZeroExit {
            exit_code: 1,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_args_disable_tools_and_end_with_prompt() {
        let args = build_args("extract this", Some("sonnet"));
        let args: Vec<&str> = args.iter().filter_map(|a| a.to_str()).collect();

        assert_eq!(args[0], "--print");
        assert!(args.windows(2).any(|w| w[0] == "--output-format" && w[1] == "text"));
        assert!(args.windows(2).any(|w| w[0] == "--model" && w[1] == "sonnet"));
        assert!(args.windows(2).any(|w| w[0] == "--tools" && w[1].is_empty()));
        assert_eq!(args.last(), Some(&"extract this"));

        let without_model = build_args("p", None);
        assert!(!without_model.iter().any(|a| a == "--model"));
    }

    #[test]
    fn test_rate_limit_detected_with_retry_after() {
        let error = classify_cli_error(failed("", "API Error: 429 rate limit exceeded. Retry after 12 seconds"));
        assert_eq!(
            error,
            BackendError::RateLimited {
                retry_after: Some(Duration::from_secs(12))
            }
        );

        let error = classify_cli_error(failed("Overloaded", ""));
        assert_eq!(error, BackendError::RateLimited { retry_after: None });
    }

    #[test]
    fn test_other_failures_are_transport() {
        let error = classify_cli_error(failed("", "Invalid API key\n"));
        assert_eq!(
            error,
            BackendError::Transport("claude exited with status 1: Invalid API key".to_string())
        );

        let error = classify_cli_error(CliError::Timeout {
            elapsed: Duration::from_secs(5),
            pid: 42,
        });
        assert!(matches!(error, BackendError::Transport(ref m) if m.contains("timed out")));
    }

    #[test]
    fn test_empty_stdout_is_transport() {
        let result = RunResult {
            stdout: "  \n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 10,
        };
        assert!(matches!(into_completion(result), Err(BackendError::Transport(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_complete_against_stub_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("claude");
        std::fs::write(&script, "#!/bin/sh\necho '{\"ok\": true}'\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = ClaudeBackend::discover(Some(script), None, RunConfig::default()).unwrap();
        assert_eq!(backend.complete("hi").await.unwrap(), "{\"ok\": true}");
    }
}
