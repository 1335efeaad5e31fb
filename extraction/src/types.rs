//! Recipe data model and the request/result envelope of the extraction pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::amount::{parse_amount, ParsedAmount};

/// Video hosting platform, inferred from the URL host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// `tiktok.com` and its short-link hosts.
    TikTok,
    /// `youtube.com` and `youtu.be`.
    YouTube,
    /// `instagram.com`.
    Instagram,
    /// Any other host.
    Other,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TikTok => "tiktok",
            Self::YouTube => "youtube",
            Self::Instagram => "instagram",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Immutable reference to the video a request is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    /// The URL as supplied by the caller (trimmed).
    pub url: String,
    /// Platform inferred from the URL host.
    pub platform: Platform,
}

impl VideoReference {
    /// Builds a reference from a raw URL, inferring the platform from its host.
    #[must_use]
    pub fn new(url: &str) -> Self {
        let url = url.trim().to_string();
        let platform = infer_platform(&url);
        Self { url, platform }
    }

    /// Host portion of the URL, lowercased, without port or credentials.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        host_of(&self.url)
    }

    /// Creator handle embedded in the path (`/@handle/...`), without the `@`.
    ///
    /// Short links (`vm.tiktok.com/ZM...`) carry no handle and return `None`.
    #[must_use]
    pub fn creator_handle(&self) -> Option<String> {
        let start = self.url.find("/@")? + 2;
        let handle: String = self.url[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
            .collect();
        (!handle.is_empty()).then_some(handle)
    }
}

fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

fn infer_platform(url: &str) -> Platform {
    let Some(host) = host_of(url) else {
        return Platform::Other;
    };
    let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

    if matches("tiktok.com") {
        Platform::TikTok
    } else if matches("youtube.com") || matches("youtu.be") {
        Platform::YouTube
    } else if matches("instagram.com") {
        Platform::Instagram
    } else {
        Platform::Other
    }
}

/// Raw textual context produced once by a metadata fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContext {
    /// The URL the context was fetched from.
    pub source_url: String,
    /// Video title, if the platform exposes one separately from the caption.
    #[serde(default)]
    pub title: Option<String>,
    /// Short caption text attached to the video.
    #[serde(default)]
    pub caption: Option<String>,
    /// Spoken transcript or subtitles.
    #[serde(default)]
    pub transcript: Option<String>,
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Creator handle, if known.
    #[serde(default)]
    pub creator: Option<String>,
}

impl RawContext {
    /// Creates an empty context for the given source URL.
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    /// Labelled text blobs that carry content, in prompt order.
    #[must_use]
    pub fn blobs(&self) -> Vec<(&'static str, &str)> {
        [
            ("Title", self.title.as_deref()),
            ("Caption", self.caption.as_deref()),
            ("Transcript", self.transcript.as_deref()),
            ("Description", self.description.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, text)| {
            text.map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| (label, t))
        })
        .collect()
    }

    /// Returns `true` when no text blob carries any content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs().is_empty()
    }
}

/// Headline information about a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecipeOverview {
    /// Recipe name.
    #[serde(default)]
    pub title: String,
    /// Number of servings the quantities are written for.
    #[serde(default = "default_servings", deserialize_with = "servings_or_default")]
    #[schemars(with = "Option<u32>")]
    pub servings: u32,
    /// Preparation time as stated by the source (e.g. "10 minutes").
    #[serde(default)]
    pub prep_time: Option<String>,
    /// Cooking time as stated by the source.
    #[serde(default)]
    pub cook_time: Option<String>,
    /// One of `Easy`, `Intermediate` or `Advanced`.
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Cuisine label (e.g. "Korean").
    #[serde(default)]
    pub cuisine_type: Option<String>,
}

const fn default_servings() -> u32 {
    4
}

fn servings_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(default_servings))
}

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RecipeOverview {
    /// Creates an overview with only a title set and default servings.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            servings: default_servings(),
            prep_time: None,
            cook_time: None,
            difficulty: None,
            cuisine_type: None,
        }
    }
}

/// Ingredient quantity as emitted by the model: either a JSON number or free text
/// such as `"1 1/2"` or `"3-4"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Amount {
    /// Plain numeric quantity.
    Number(f64),
    /// Textual quantity, parsed on demand.
    Text(String),
}

impl Amount {
    /// Parses the amount into a single value or a range.
    #[must_use]
    pub fn parse(&self) -> Option<ParsedAmount> {
        match self {
            Self::Number(n) if n.is_finite() => Some(ParsedAmount::Single(*n)),
            Self::Number(_) => None,
            Self::Text(text) => parse_amount(text),
        }
    }

    /// Returns `true` when the amount parses to a number or range.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.parse().is_some()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One ingredient line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Ingredient {
    /// Ingredient name (e.g. "unsalted butter").
    #[serde(default)]
    pub item: String,
    /// Quantity, numeric or textual.
    pub amount: Amount,
    /// Unit token (e.g. "g", "ml", "cup"); `null` for countable items.
    #[serde(default)]
    pub unit: Option<String>,
    /// Preparation notes (e.g. "finely chopped").
    #[serde(default)]
    pub notes: Option<String>,
}

impl Ingredient {
    /// Creates an ingredient without notes.
    #[must_use]
    pub fn new(item: impl Into<String>, amount: impl Into<Amount>, unit: Option<&str>) -> Self {
        Self {
            item: item.into(),
            amount: amount.into(),
            unit: unit.map(str::to_string),
            notes: None,
        }
    }
}

/// Candidate recipe emitted by one extraction attempt, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecipeDraft {
    /// Headline information.
    #[serde(rename = "recipe_overview", alias = "overview")]
    pub overview: RecipeOverview,
    /// Ingredient list.
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Option<Vec<Ingredient>>")]
    pub ingredients: Vec<Ingredient>,
    /// Ordered steps; step numbers are the 1-based positions.
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Option<Vec<String>>")]
    pub instructions: Vec<String>,
    /// Tools and cookware; may be empty.
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Option<Vec<String>>")]
    pub equipment: Vec<String>,
}

impl RecipeDraft {
    /// Number of instruction steps.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.instructions.len()
    }
}

/// Outcome of schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// `true` iff `errors` is empty.
    pub is_valid: bool,
    /// Field-scoped violation descriptions.
    pub errors: Vec<String>,
}

impl ValidationVerdict {
    /// Builds a verdict from a list of violations.
    #[must_use]
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Record of one retry-controller iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionAttempt {
    /// 1-based attempt number.
    pub attempt_number: usize,
    /// Normalized draft, when the invoker returned one.
    pub draft: Option<RecipeDraft>,
    /// Validation verdict for `draft`.
    pub verdict: Option<ValidationVerdict>,
    /// Invoker failure, when no draft was produced.
    pub failure_reason: Option<String>,
}

/// Caller input for one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// URL of the cooking video.
    pub video_url: String,
    /// Retries after the first attempt; `None` uses the configured default.
    #[serde(default)]
    pub max_retries: Option<usize>,
}

/// Diagnostic metadata of an [`ExtractionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Instruction count of the returned (or last seen) draft.
    pub steps: usize,
    /// Whether the returned recipe passed validation.
    pub is_valid: bool,
    /// Failure reasons; `None` on success.
    pub errors: Option<Vec<String>>,
}

/// The pipeline's externally visible output envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Whether a validated recipe was produced.
    pub success: bool,
    /// The validated recipe; always `None` when `success` is `false`.
    pub recipe: Option<RecipeDraft>,
    /// Step count, validity and failure reasons.
    pub metadata: ResultMetadata,
    /// Wall-clock seconds spent on the whole call.
    pub processing_time: f64,
}

impl ExtractionResult {
    /// Successful envelope around a validated recipe.
    #[must_use]
    pub fn succeeded(recipe: RecipeDraft, processing_time: f64) -> Self {
        Self {
            success: true,
            metadata: ResultMetadata {
                steps: recipe.steps(),
                is_valid: true,
                errors: None,
            },
            recipe: Some(recipe),
            processing_time,
        }
    }

    /// Failed envelope. An empty `errors` list is replaced by a generic reason so
    /// that failures always explain themselves.
    #[must_use]
    pub fn failed(steps: usize, mut errors: Vec<String>, processing_time: f64) -> Self {
        if errors.is_empty() {
            errors.push("extraction failed for an unknown reason".to_string());
        }
        Self {
            success: false,
            recipe: None,
            metadata: ResultMetadata {
                steps,
                is_valid: false,
                errors: Some(errors),
            },
            processing_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_inference() {
        let cases = [
            ("https://www.tiktok.com/@khanhong/video/7557275818255273234", Platform::TikTok),
            ("https://vm.tiktok.com/ZMabc/", Platform::TikTok),
            ("https://youtu.be/dQw4w9WgXcQ", Platform::YouTube),
            ("https://m.youtube.com/shorts/abc", Platform::YouTube),
            ("https://www.instagram.com/reel/xyz/", Platform::Instagram),
            ("https://notyoutube.com/watch", Platform::Other),
            ("not a url", Platform::Other),
        ];
        for (url, expected) in cases {
            assert_eq!(VideoReference::new(url).platform, expected, "{url}");
        }
    }

    #[test]
    fn test_creator_handle() {
        let video = VideoReference::new("https://www.tiktok.com/@cooking.with.jane/video/123");
        assert_eq!(video.creator_handle().as_deref(), Some("cooking.with.jane"));

        let short = VideoReference::new("https://vm.tiktok.com/ZMxxx/");
        assert_eq!(short.creator_handle(), None);
    }

    #[test]
    fn test_raw_context_blobs_skip_blank() {
        let mut context = RawContext::new("https://example.com/v");
        context.caption = Some("  ".to_string());
        context.description = Some("Garlic noodles".to_string());

        assert_eq!(context.blobs(), vec![("Description", "Garlic noodles")]);
        assert!(!context.is_empty());
        assert!(RawContext::new("u").is_empty());
    }

    #[test]
    fn test_draft_wire_format() {
        let draft: RecipeDraft = serde_json::from_value(json!({
            "recipe_overview": {"title": "Spicy Garlic Noodles"},
            "ingredients": [
                {"item": "Garlic", "amount": "3-4", "unit": "cloves", "notes": "minced"},
                {"item": "Noodles", "amount": 200, "unit": "g"}
            ],
            "instructions": ["Boil noodles", "Toss with sauce"]
        }))
        .unwrap();

        assert_eq!(draft.overview.servings, 4);
        assert!(draft.equipment.is_empty());
        assert_eq!(draft.ingredients[1].amount, Amount::Number(200.0));
        assert_eq!(draft.steps(), 2);

        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("recipe_overview").is_some());
    }

    #[test]
    fn test_overview_alias_accepted() {
        let draft: RecipeDraft = serde_json::from_value(json!({
            "overview": {"title": "Toast", "servings": 1},
            "ingredients": [],
            "instructions": []
        }))
        .unwrap();
        assert_eq!(draft.overview.title, "Toast");
        assert_eq!(draft.overview.servings, 1);
    }

    #[test]
    fn test_null_servings_and_lists_take_defaults() {
        let draft: RecipeDraft = serde_json::from_value(json!({
            "recipe_overview": {"title": "Toast", "servings": null},
            "ingredients": [{"item": "bread", "amount": 2}],
            "instructions": ["Toast the bread"],
            "equipment": null
        }))
        .unwrap();
        assert_eq!(draft.overview.servings, 4);
        assert!(draft.equipment.is_empty());

        let empty: RecipeDraft = serde_json::from_value(json!({
            "recipe_overview": {"title": "Toast"},
            "ingredients": null,
            "instructions": null
        }))
        .unwrap();
        assert!(empty.ingredients.is_empty());
        assert_eq!(empty.steps(), 0);
    }

    #[test]
    fn test_failed_result_always_has_reason() {
        let result = ExtractionResult::failed(0, Vec::new(), 0.5);
        assert!(!result.success);
        assert!(result.recipe.is_none());
        assert_eq!(result.metadata.errors.as_ref().map(Vec::len), Some(1));
    }
}
