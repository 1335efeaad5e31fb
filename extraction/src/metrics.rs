//! Metrics tracking and token estimation for extraction runs.

use std::time::Duration;

/// Metrics collected during an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionMetrics {
    /// Total number of attempts made.
    pub total_attempts: usize,
    /// Wall-clock time spent in the attempt loop.
    pub wall_time: Duration,
    /// Time spent sleeping after rate-limited attempts.
    pub rate_limit_wait: Duration,
    /// Estimated input tokens sent to the model, summed over attempts.
    pub estimated_input_tokens: usize,
    /// Estimated output tokens received from the model, summed over attempts.
    pub estimated_output_tokens: usize,
}

/// Estimate token count from text using the standard 4-chars-per-token heuristic.
///
/// Counts chars rather than bytes and rounds up.
///
/// # Examples
///
/// ```
/// use reel_recipe_extraction::metrics::estimate_tokens;
///
/// assert_eq!(estimate_tokens("hello"), 2);
/// assert_eq!(estimate_tokens("hello world"), 3);
/// ```
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_estimate_tokens_utf8() {
        // "½ cup" is 5 chars but 6 bytes
        assert_eq!(estimate_tokens("½ cup"), 2);
        assert_eq!(estimate_tokens("crème brûlée"), 3);
    }
}
