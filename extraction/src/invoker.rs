//! Single structured-extraction call against an LLM backend.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ExtractionConfig;
use crate::error::{BackendError, InvokerError};
use crate::prompt::build_extraction_prompt;
use crate::schema::{collect_shape_errors, recipe_schema};
use crate::types::{RawContext, RecipeDraft};

/// Text-in, text-out LLM transport.
///
/// Implementations own authentication and wire details. They should map
/// provider throttling to [`BackendError::RateLimited`].
#[async_trait]
pub trait LlmBackend: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Sends one prompt and returns the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

/// A response that parsed into a draft. The draft has not been validated yet.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The parsed draft.
    pub draft: RecipeDraft,
    /// The JSON object found in the response.
    pub submission: Value,
    /// The raw response text.
    pub raw: String,
}

/// Builds extraction prompts and turns backend responses into drafts.
#[derive(Debug, Clone)]
pub struct ExtractionInvoker {
    backend: Arc<dyn LlmBackend>,
    schema: Value,
    preamble: String,
    timeout: Duration,
}

impl ExtractionInvoker {
    /// Creates an invoker using the recipe schema and the prompt settings of `config`.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, config: &ExtractionConfig) -> Self {
        Self {
            backend,
            schema: recipe_schema(),
            preamble: config.preamble.clone(),
            timeout: config.attempt_timeout,
        }
    }

    /// The JSON Schema sent with every prompt.
    #[must_use]
    pub const fn schema(&self) -> &Value {
        &self.schema
    }

    /// Name of the underlying backend.
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Builds the prompt for one attempt, including earlier feedback blocks.
    #[must_use]
    pub fn build_prompt(&self, context: &RawContext, feedback: &[String]) -> String {
        build_extraction_prompt(&self.preamble, context, &self.schema, feedback)
    }

    /// Sends `prompt` to the backend under the per-attempt timeout and parses the reply.
    ///
    /// # Errors
    ///
    /// Returns `InvokerError::Transport` on backend failure or timeout,
    /// `InvokerError::RateLimited` when the provider throttles, and
    /// `InvokerError::Parse` when the reply is not a recipe-shaped JSON object.
    pub async fn invoke(&self, prompt: &str) -> Result<Invocation, InvokerError> {
        let raw = tokio::time::timeout(self.timeout, self.backend.complete(prompt))
            .await
            .map_err(|_| {
                InvokerError::Transport(format!(
                    "{} did not answer within {}s",
                    self.backend.name(),
                    self.timeout.as_secs_f64()
                ))
            })??;

        let (draft, submission) = self.parse_response(&raw)?;
        Ok(Invocation {
            draft,
            submission,
            raw,
        })
    }

    /// Locates the JSON object in `raw`, checks its shape and deserializes it.
    ///
    /// # Errors
    ///
    /// Returns `InvokerError::Parse` describing the first problem found.
    pub fn parse_response(&self, raw: &str) -> Result<(RecipeDraft, Value), InvokerError> {
        let parse_error = |message: String| InvokerError::Parse {
            message,
            raw: raw.to_string(),
        };

        let mut value = extract_json_object(raw)
            .ok_or_else(|| parse_error("response contains no JSON object".to_string()))?;
        rename_overview_alias(&mut value);

        let shape_errors = collect_shape_errors(&self.schema, &value);
        if !shape_errors.is_empty() {
            return Err(parse_error(format!(
                "response does not match the recipe schema: {}",
                shape_errors.join("; ")
            )));
        }

        let draft = serde_json::from_value::<RecipeDraft>(value.clone())
            .map_err(|e| parse_error(format!("response is not a recipe: {e}")))?;
        Ok((draft, value))
    }
}

/// Moves a top-level `overview` key to `recipe_overview` unless the latter is present.
fn rename_overview_alias(value: &mut Value) {
    if let Some(object) = value.as_object_mut() {
        if !object.contains_key("recipe_overview") {
            if let Some(overview) = object.remove("overview") {
                object.insert("recipe_overview".to_string(), overview);
            }
        }
    }
}

/// Finds the first balanced `{...}` span in `text` that parses as a JSON object.
///
/// Handles markdown fences and prose around the object.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(start, _)| {
        let end = balanced_object_end(&text[start..])?;
        serde_json::from_str::<Value>(&text[start..start + end])
            .ok()
            .filter(Value::is_object)
    })
}

/// Byte length of the object starting at `text[0] == '{'`, honouring strings.
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
