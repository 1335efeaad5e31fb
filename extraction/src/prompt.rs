//! Prompt construction and retry feedback for extraction attempts.

use serde_json::Value;

use crate::types::RawContext;

/// Persona and rules placed at the top of every extraction prompt.
pub const DEFAULT_PREAMBLE: &str = "\
You are a professional chef who extracts recipe information from cooking videos.
Read the video content below carefully and identify:
- the exact recipe being prepared
- every ingredient used, with measurements if shown or mentioned
- step-by-step cooking instructions
- preparation and cooking times if mentioned
- difficulty level (Easy, Intermediate or Advanced) and cuisine type

Be accurate: only extract information that is clearly shown or mentioned.
Use metric units (g, kg, ml, l, °C) for every quantity and temperature.
Leave `unit` null for countable items such as eggs.";

const JSON_ONLY_INSTRUCTION: &str = "\
Respond with only a single JSON object matching the schema above. \
Do not wrap it in markdown and do not add any other text.";

const RAW_ECHO_LIMIT: usize = 500;

/// Feedback from one failed attempt, rendered into later prompts.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    /// The response parsed but the draft broke recipe rules.
    Validation {
        /// 1-based attempt that produced the draft.
        attempt: usize,
        /// Total attempts allowed for the run.
        max_attempts: usize,
        /// Every violation reported by the validator.
        errors: Vec<String>,
        /// The submitted JSON, echoed back.
        submission: Value,
    },
    /// The response could not be read as a recipe.
    Parse {
        /// 1-based attempt that produced the response.
        attempt: usize,
        /// Total attempts allowed for the run.
        max_attempts: usize,
        /// Parse failure description.
        message: String,
        /// Raw response text.
        raw: String,
    },
}

impl Feedback {
    /// Renders the feedback block. `schema` is repeated in the block when given.
    #[must_use]
    pub fn render(&self, schema: Option<&Value>) -> String {
        match self {
            Self::Validation {
                attempt,
                max_attempts,
                errors,
                submission,
            } => build_validation_feedback(schema, submission, errors, *attempt, *max_attempts),
            Self::Parse {
                attempt,
                max_attempts,
                message,
                raw,
            } => build_parse_error_feedback(raw, message, *attempt, *max_attempts, schema),
        }
    }
}

/// Builds the full prompt for one attempt.
///
/// `feedback` holds the rendered blocks of earlier failed attempts, oldest first.
#[must_use]
pub fn build_extraction_prompt(
    preamble: &str,
    context: &RawContext,
    schema: &Value,
    feedback: &[String],
) -> String {
    let mut prompt = String::from(preamble.trim_end());
    prompt.push_str("\n\n## Video\n");
    prompt.push_str("Source: ");
    prompt.push_str(&context.source_url);
    prompt.push('\n');
    if let Some(creator) = context.creator.as_deref().filter(|c| !c.trim().is_empty()) {
        prompt.push_str("Creator: @");
        prompt.push_str(creator.trim().trim_start_matches('@'));
        prompt.push('\n');
    }

    for (label, text) in context.blobs() {
        prompt.push_str("\n### ");
        prompt.push_str(label);
        prompt.push('\n');
        prompt.push_str(text);
        prompt.push('\n');
    }

    prompt.push_str("\n## Output schema\n");
    prompt.push_str(&pretty(schema));

    if !feedback.is_empty() {
        prompt.push_str("\n\n## Previous attempts\n");
        for block in feedback {
            prompt.push('\n');
            prompt.push_str(block);
            prompt.push('\n');
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(JSON_ONLY_INSTRUCTION);
    prompt
}

/// Build validation feedback with the attempt counter, every violation and the
/// echoed submission.
///
/// # Examples
///
/// ```
/// use reel_recipe_extraction::prompt::build_validation_feedback;
/// use serde_json::json;
///
/// let submission = json!({"recipe_overview": {"title": ""}});
/// let errors = vec!["recipe_overview.title: must not be empty".to_string()];
///
/// let feedback = build_validation_feedback(None, &submission, &errors, 1, 3);
/// assert!(feedback.contains("Attempt 1/3"));
/// assert!(feedback.contains("recipe_overview.title"));
/// ```
#[must_use]
pub fn build_validation_feedback(
    schema: Option<&Value>,
    submission: &Value,
    errors: &[String],
    attempt: usize,
    max_attempts: usize,
) -> String {
    let mut feedback =
        format!("Attempt {attempt}/{max_attempts}: the recipe failed validation.\n\n");

    feedback.push_str("Errors:\n");
    for error in errors {
        feedback.push_str("  - ");
        feedback.push_str(error);
        feedback.push('\n');
    }

    if let Some(schema) = schema {
        feedback.push_str("\nExpected schema:\n");
        feedback.push_str(&pretty(schema));
        feedback.push('\n');
    }

    feedback.push_str("\nYour submission:\n");
    feedback.push_str(&pretty(submission));

    feedback.push_str("\n\nPlease fix all errors and resubmit.");
    feedback
}

/// Build parse error feedback for a response that was not a recipe JSON object.
///
/// The raw response is echoed up to 500 characters.
#[must_use]
pub fn build_parse_error_feedback(
    raw_text: &str,
    parse_error: &str,
    attempt: usize,
    max_attempts: usize,
    schema: Option<&Value>,
) -> String {
    let mut feedback = format!(
        "Attempt {attempt}/{max_attempts}: could not parse your response as a recipe.\n\n"
    );

    feedback.push_str("Parse error: ");
    feedback.push_str(parse_error);
    feedback.push_str("\n\n");

    feedback.push_str("Your response (first 500 chars):\n");
    let mut chars = raw_text.chars();
    let truncated: String = chars.by_ref().take(RAW_ECHO_LIMIT).collect();
    feedback.push_str(&truncated);
    if chars.next().is_some() {
        feedback.push_str("...");
    }

    if let Some(schema) = schema {
        feedback.push_str("\n\nExpected schema:\n");
        feedback.push_str(&pretty(schema));
    }

    feedback.push_str("\n\nPlease respond with valid JSON matching the schema.");
    feedback
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
