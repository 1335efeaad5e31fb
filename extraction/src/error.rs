//! Error types for fetching, LLM calls and the extraction run as a whole.

use std::time::Duration;
use thiserror::Error;

use crate::metrics::ExtractionMetrics;
use crate::types::ExtractionAttempt;

/// Failure of the metadata fetcher. Always terminal for a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The video exists but carries no usable text.
    #[error("no text content found for {url}")]
    NoContentFound {
        /// The URL that was fetched.
        url: String,
    },

    /// The video or its host could not be reached.
    #[error("video unreachable: {0}")]
    Unreachable(String),

    /// The URL is empty or not handled by the fetcher.
    #[error("unsupported video URL: {0}")]
    Unsupported(String),
}

/// Failure reported by an [`LlmBackend`](crate::invoker::LlmBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Network, process or provider failure.
    #[error("{0}")]
    Transport(String),

    /// The provider asked us to slow down.
    #[error("rate limited by provider")]
    RateLimited {
        /// Provider-supplied delay before retrying, if any.
        retry_after: Option<Duration>,
    },
}

/// Failure of a single extraction attempt. Every variant is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokerError {
    /// Transport failure or per-attempt timeout.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// Provider rate limit.
    #[error("LLM provider rate limited the request")]
    RateLimited {
        /// Provider-supplied delay before retrying, if any.
        retry_after: Option<Duration>,
    },

    /// The response did not contain a recipe-shaped JSON object.
    #[error("could not parse LLM response: {message}")]
    Parse {
        /// What was wrong with the response.
        message: String,
        /// The raw response text.
        raw: String,
    },
}

impl From<BackendError> for InvokerError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Transport(message) => Self::Transport(message),
            BackendError::RateLimited { retry_after } => Self::RateLimited { retry_after },
        }
    }
}

/// Errors that end an extraction run.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The metadata fetch failed; no LLM call was made.
    #[error("could not fetch video content: {0}")]
    ContentFetch(#[from] FetchError),

    /// The final attempt failed before producing a draft.
    #[error(transparent)]
    Invoker(#[from] InvokerError),

    /// The final draft failed validation.
    #[error("recipe failed validation: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Every allowed attempt failed.
    #[error("extraction failed after {attempts} attempts: {last_failure}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Instruction count of the most recent draft seen, or 0.
        steps: usize,
        /// Every attempt in order.
        history: Vec<ExtractionAttempt>,
        /// Metrics tracked across all attempts.
        metrics: ExtractionMetrics,
        /// Failure of the final attempt.
        #[source]
        last_failure: Box<ExtractionError>,
    },
}

impl ExtractionError {
    /// Human-readable reasons reported in a failed result.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.clone(),
            Self::RetriesExhausted { last_failure, .. } => last_failure.errors(),
            Self::ContentFetch(_) | Self::Invoker(_) => vec![self.to_string()],
        }
    }

    /// Step count reported in a failed result.
    #[must_use]
    pub const fn steps(&self) -> usize {
        match self {
            Self::RetriesExhausted { steps, .. } => *steps,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failure_message_prefix() {
        let error = ExtractionError::from(FetchError::NoContentFound {
            url: "https://example.com/v".to_string(),
        });
        let errors = error.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("could not fetch video content"));
        assert_eq!(error.steps(), 0);
    }

    #[test]
    fn test_exhausted_reports_final_attempt() {
        let error = ExtractionError::RetriesExhausted {
            attempts: 2,
            steps: 3,
            history: Vec::new(),
            metrics: ExtractionMetrics::default(),
            last_failure: Box::new(ExtractionError::Validation(vec![
                "recipe_overview.title: must not be empty".to_string(),
            ])),
        };
        assert_eq!(error.errors(), vec!["recipe_overview.title: must not be empty"]);
        assert_eq!(error.steps(), 3);
        assert!(error.to_string().contains("after 2 attempts"));
    }

    #[test]
    fn test_backend_error_maps_to_invoker_error() {
        let error: InvokerError = BackendError::RateLimited { retry_after: None }.into();
        assert_eq!(error, InvokerError::RateLimited { retry_after: None });

        let error: InvokerError = BackendError::Transport("boom".to_string()).into();
        assert_eq!(error.to_string(), "LLM transport error: boom");
    }
}
