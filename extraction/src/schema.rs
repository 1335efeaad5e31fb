//! Target recipe shape and the schema validator.
//!
//! Two layers of checking live here:
//!
//! - [`collect_shape_errors`] checks a raw JSON value against the JSON Schema
//!   derived from [`RecipeDraft`]. Shape failures are parse errors.
//! - [`validate`] checks the semantic rules of a deserialized draft and reports
//!   every violation, so the next attempt can be told exactly what to fix.

use schemars::schema_for;
use serde_json::Value;

use crate::normalize::{UnitKind, classify_unit};
use crate::types::{RecipeDraft, ValidationVerdict};

/// Accepted values of `recipe_overview.difficulty`.
pub const DIFFICULTY_LEVELS: [&str; 3] = ["Easy", "Intermediate", "Advanced"];

/// JSON Schema of [`RecipeDraft`], as sent to the model and used for shape checks.
#[must_use]
pub fn recipe_schema() -> Value {
    serde_json::to_value(schema_for!(RecipeDraft)).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Collects every JSON Schema violation for `instance`.
///
/// Returns formatted error strings with instance paths. An uncompilable schema
/// is reported as a single error rather than a panic.
#[must_use]
pub fn collect_shape_errors(schema: &Value, instance: &Value) -> Vec<String> {
    match jsonschema::Validator::new(schema) {
        Ok(validator) => validator
            .iter_errors(instance)
            .map(|error| format!("At path '{}': {}", error.instance_path, error))
            .collect(),
        Err(e) => vec![format!("Schema compilation error: {e}")],
    }
}

/// Checks the semantic rules of a draft and lists every violation found.
///
/// The draft is expected to have been normalized already; an ingredient that
/// still carries an imperial unit is reported.
#[must_use]
pub fn validate(draft: &RecipeDraft) -> ValidationVerdict {
    let mut errors = Vec::new();
    let overview = &draft.overview;

    if overview.title.trim().is_empty() {
        errors.push("recipe_overview.title: must not be empty".to_string());
    }
    if overview.servings == 0 {
        errors.push("recipe_overview.servings: must be at least 1".to_string());
    }
    if let Some(difficulty) = overview.difficulty.as_deref() {
        if !DIFFICULTY_LEVELS
            .iter()
            .any(|level| level.eq_ignore_ascii_case(difficulty.trim()))
        {
            errors.push(format!(
                "recipe_overview.difficulty: \"{difficulty}\" is not one of {}",
                DIFFICULTY_LEVELS.join(", ")
            ));
        }
    }

    if draft.ingredients.is_empty() {
        errors.push("ingredients: must contain at least one ingredient".to_string());
    }
    for (i, ingredient) in draft.ingredients.iter().enumerate() {
        if ingredient.item.trim().is_empty() {
            errors.push(format!("ingredients[{i}].item: must not be empty"));
        }
        if !ingredient.amount.is_numeric() {
            errors.push(format!(
                "ingredients[{i}].amount: \"{}\" is not a number, fraction or range",
                ingredient.amount
            ));
        }
        if let Some(unit) = ingredient.unit.as_deref() {
            if matches!(classify_unit(unit), UnitKind::Imperial(_)) {
                errors.push(format!(
                    "ingredients[{i}].unit: \"{unit}\" is imperial; use g, kg, ml or l"
                ));
            }
        }
    }

    if draft.instructions.is_empty() {
        errors.push("instructions: must contain at least one step".to_string());
    }
    for (i, step) in draft.instructions.iter().enumerate() {
        if step.trim().is_empty() {
            errors.push(format!("instructions[{i}]: step {} must not be empty", i + 1));
        }
    }

    ValidationVerdict::from_errors(errors)
}
