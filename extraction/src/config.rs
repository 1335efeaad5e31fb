//! Configuration for the extraction pipeline.

use std::time::Duration;

use crate::normalize::ConversionTable;
use crate::prompt::DEFAULT_PREAMBLE;

/// Immutable configuration shared by every run of a pipeline.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Retries after the first attempt when the caller does not specify any (default: 2).
    pub default_max_retries: usize,
    /// Upper bound applied to caller-supplied retries (default: 5).
    pub retry_ceiling: usize,
    /// Time budget for a single LLM call (default: 120s).
    pub attempt_timeout: Duration,
    /// First delay after a rate-limited attempt without `retry_after` (default: 1s).
    pub initial_backoff: Duration,
    /// Cap for the exponential rate-limit backoff (default: 30s).
    pub max_backoff: Duration,
    /// Whether to include the full schema in validation feedback (default: true).
    pub include_schema_in_feedback: bool,
    /// Persona and instructions placed at the top of every prompt.
    pub preamble: String,
    /// Imperial-to-metric factors used by the normalizer.
    pub units: ConversionTable,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_max_retries: 2,
            retry_ceiling: 5,
            attempt_timeout: Duration::from_secs(120),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            include_schema_in_feedback: true,
            preamble: DEFAULT_PREAMBLE.to_string(),
            units: ConversionTable::default(),
        }
    }
}

impl ExtractionConfig {
    /// Set the default number of retries.
    #[must_use]
    pub const fn with_default_max_retries(mut self, retries: usize) -> Self {
        self.default_max_retries = retries;
        self
    }

    /// Set the ceiling applied to requested retries.
    #[must_use]
    pub const fn with_retry_ceiling(mut self, ceiling: usize) -> Self {
        self.retry_ceiling = ceiling;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Set the initial and maximum rate-limit backoff.
    #[must_use]
    pub const fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Set whether to include the schema in validation feedback.
    #[must_use]
    pub const fn with_schema_in_feedback(mut self, include: bool) -> Self {
        self.include_schema_in_feedback = include;
        self
    }

    /// Replace the prompt preamble.
    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Replace the unit conversion table.
    #[must_use]
    pub fn with_units(mut self, units: ConversionTable) -> Self {
        self.units = units;
        self
    }

    /// Resolves a caller-supplied retry count against the default and ceiling.
    #[must_use]
    pub fn resolve_max_retries(&self, requested: Option<usize>) -> usize {
        let requested = requested.unwrap_or(self.default_max_retries);
        if requested > self.retry_ceiling {
            tracing::warn!(
                requested,
                ceiling = self.retry_ceiling,
                "max_retries above ceiling, clamping"
            );
            return self.retry_ceiling;
        }
        requested
    }

    /// Backoff before the attempt following the `consecutive`-th rate limit (1-based).
    #[must_use]
    pub fn backoff_for(&self, consecutive: u32) -> Duration {
        let exponent = consecutive.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_max_retries() {
        let config = ExtractionConfig::default();
        assert_eq!(config.resolve_max_retries(None), 2);
        assert_eq!(config.resolve_max_retries(Some(0)), 0);
        assert_eq!(config.resolve_max_retries(Some(5)), 5);
        assert_eq!(config.resolve_max_retries(Some(50)), 5);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = ExtractionConfig::default()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(350));
        assert_eq!(config.backoff_for(40), Duration::from_millis(350));
    }
}
