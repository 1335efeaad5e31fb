//! Bounded retry loop around the extraction invoker.
//!
//! One [`RetryController`] drives one run through
//! `Idle → Attempting → {Succeeded, Exhausted}`. Each attempt calls the invoker,
//! normalizes the draft and validates it. Failures are turned into feedback
//! blocks that are appended to the next prompt. `run` consumes the controller,
//! so a terminal state cannot be left.

use tokio::time::Instant;

use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, InvokerError};
use crate::invoker::ExtractionInvoker;
use crate::metrics::{estimate_tokens, ExtractionMetrics};
use crate::normalize::UnitNormalizer;
use crate::prompt::Feedback;
use crate::schema::validate;
use crate::types::{ExtractionAttempt, RawContext, RecipeDraft};

/// Lifecycle state of a [`RetryController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Created, no attempt made.
    Idle,
    /// Running the given 1-based attempt.
    Attempting {
        /// Current attempt number.
        attempt: usize,
    },
    /// A draft passed validation.
    Succeeded,
    /// Every allowed attempt failed.
    Exhausted,
}

impl ControllerState {
    /// Whether the controller takes no further action in this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }
}

/// A validated recipe and the metrics of the run that produced it.
#[derive(Debug, Clone)]
pub struct ExtractedRecipe {
    /// Normalized draft that passed validation.
    pub recipe: RecipeDraft,
    /// Attempt count, timing and token estimates.
    pub metrics: ExtractionMetrics,
}

/// Runs up to `max_retries + 1` extraction attempts for one context.
#[derive(Debug)]
pub struct RetryController<'a> {
    invoker: &'a ExtractionInvoker,
    normalizer: &'a UnitNormalizer,
    config: &'a ExtractionConfig,
    max_attempts: usize,
    state: ControllerState,
    feedback: Vec<String>,
    history: Vec<ExtractionAttempt>,
    metrics: ExtractionMetrics,
    last_steps: usize,
}

impl<'a> RetryController<'a> {
    /// Creates an idle controller. `max_retries = 0` means exactly one attempt.
    #[must_use]
    pub const fn new(
        invoker: &'a ExtractionInvoker,
        normalizer: &'a UnitNormalizer,
        config: &'a ExtractionConfig,
        max_retries: usize,
    ) -> Self {
        Self {
            invoker,
            normalizer,
            config,
            max_attempts: max_retries.saturating_add(1),
            state: ControllerState::Idle,
            feedback: Vec::new(),
            history: Vec::new(),
            metrics: ExtractionMetrics {
                total_attempts: 0,
                wall_time: std::time::Duration::ZERO,
                rate_limit_wait: std::time::Duration::ZERO,
                estimated_input_tokens: 0,
                estimated_output_tokens: 0,
            },
            last_steps: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Runs attempts until a draft validates or the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::RetriesExhausted` carrying the attempt history
    /// and the failure of the final attempt.
    pub async fn run(mut self, context: &RawContext) -> Result<ExtractedRecipe, ExtractionError> {
        let start = Instant::now();
        let mut last_failure: Option<ExtractionError> = None;
        let mut consecutive_rate_limits: u32 = 0;

        for attempt in 1..=self.max_attempts {
            self.enter(ControllerState::Attempting { attempt });
            let has_attempts_left = attempt < self.max_attempts;

            let prompt = self.invoker.build_prompt(context, &self.feedback);
            self.metrics.total_attempts = attempt;
            self.metrics.estimated_input_tokens += estimate_tokens(&prompt);

            match self.invoker.invoke(&prompt).await {
                Ok(invocation) => {
                    consecutive_rate_limits = 0;
                    self.metrics.estimated_output_tokens += estimate_tokens(&invocation.raw);

                    let draft = self.normalizer.normalize_draft(invocation.draft);
                    let verdict = validate(&draft);
                    self.last_steps = draft.steps();

                    if verdict.is_valid {
                        tracing::info!(attempt, max_attempts = self.max_attempts, "draft validated");
                        self.history.push(ExtractionAttempt {
                            attempt_number: attempt,
                            draft: Some(draft.clone()),
                            verdict: Some(verdict),
                            failure_reason: None,
                        });
                        self.metrics.wall_time = start.elapsed();
                        self.enter(ControllerState::Succeeded);
                        return Ok(ExtractedRecipe {
                            recipe: draft,
                            metrics: self.metrics,
                        });
                    }

                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        violations = verdict.errors.len(),
                        "draft failed validation"
                    );
                    if has_attempts_left {
                        let feedback = Feedback::Validation {
                            attempt,
                            max_attempts: self.max_attempts,
                            errors: verdict.errors.clone(),
                            submission: invocation.submission,
                        };
                        self.push_feedback(&feedback);
                    }
                    last_failure = Some(ExtractionError::Validation(verdict.errors.clone()));
                    self.history.push(ExtractionAttempt {
                        attempt_number: attempt,
                        draft: Some(draft),
                        verdict: Some(verdict),
                        failure_reason: None,
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "extraction attempt failed"
                    );
                    self.history.push(ExtractionAttempt {
                        attempt_number: attempt,
                        draft: None,
                        verdict: None,
                        failure_reason: Some(error.to_string()),
                    });

                    match &error {
                        InvokerError::Parse { message, raw } => {
                            consecutive_rate_limits = 0;
                            self.metrics.estimated_output_tokens += estimate_tokens(raw);
                            if has_attempts_left {
                                let feedback = Feedback::Parse {
                                    attempt,
                                    max_attempts: self.max_attempts,
                                    message: message.clone(),
                                    raw: raw.clone(),
                                };
                                self.push_feedback(&feedback);
                            }
                        }
                        InvokerError::RateLimited { retry_after } => {
                            consecutive_rate_limits = consecutive_rate_limits.saturating_add(1);
                            if has_attempts_left {
                                let delay = retry_after
                                    .unwrap_or_else(|| self.config.backoff_for(consecutive_rate_limits));
                                tracing::info!(attempt, delay = ?delay, "backing off after rate limit");
                                self.metrics.rate_limit_wait += delay;
                                tokio::time::sleep(delay).await;
                            }
                        }
                        InvokerError::Transport(_) => consecutive_rate_limits = 0,
                    }
                    last_failure = Some(ExtractionError::Invoker(error));
                }
            }
        }

        self.metrics.wall_time = start.elapsed();
        self.enter(ControllerState::Exhausted);
        let last_failure = last_failure.unwrap_or_else(|| {
            ExtractionError::Invoker(InvokerError::Transport("no attempt was made".to_string()))
        });

        Err(ExtractionError::RetriesExhausted {
            attempts: self.max_attempts,
            steps: self.last_steps,
            history: self.history,
            metrics: self.metrics,
            last_failure: Box::new(last_failure),
        })
    }

    fn push_feedback(&mut self, feedback: &Feedback) {
        let invoker = self.invoker;
        let schema = self
            .config
            .include_schema_in_feedback
            .then(|| invoker.schema());
        self.feedback.push(feedback.render(schema));
    }

    fn enter(&mut self, next: ControllerState) {
        tracing::debug!(from = ?self.state, to = ?next, "retry controller transition");
        self.state = next;
    }
}
