//! Validated recipe extraction from cooking-video text.
//!
//! This crate turns the raw text attached to a short cooking video into a
//! structured, metric recipe:
//!
//! - [`ExtractionPipeline`] - fetch once, then extract with bounded retries
//! - [`RetryController`] - the attempt loop with validation feedback
//! - [`ExtractionInvoker`] - one prompt/response round trip through an [`LlmBackend`]
//! - [`UnitNormalizer`] - imperial to metric conversion
//! - [`schema::validate`] - semantic checks with field-scoped violations
//!
//! Fetching and LLM transport are traits ([`MetadataFetcher`], [`LlmBackend`]);
//! concrete implementations live in other crates. [`testing`] provides scripted
//! doubles for both.

pub mod amount;
pub mod config;
pub mod controller;
pub mod error;
pub mod invoker;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod schema;
pub mod testing;
pub mod types;

pub use config::ExtractionConfig;
pub use controller::{ControllerState, ExtractedRecipe, RetryController};
pub use error::{BackendError, ExtractionError, FetchError, InvokerError};
pub use invoker::{ExtractionInvoker, LlmBackend};
pub use metrics::ExtractionMetrics;
pub use normalize::{ConversionTable, UnitNormalizer};
pub use pipeline::{ExtractionPipeline, MetadataFetcher};
pub use types::{
    Amount, ExtractionAttempt, ExtractionRequest, ExtractionResult, Ingredient, Platform,
    RawContext, RecipeDraft, RecipeOverview, ResultMetadata, ValidationVerdict, VideoReference,
};

/// Common traits and types for wiring a pipeline.
pub mod prelude {
    pub use crate::{
        BackendError, ExtractionConfig, ExtractionError, ExtractionPipeline, ExtractionRequest,
        ExtractionResult, FetchError, LlmBackend, MetadataFetcher, RawContext, RecipeDraft,
        VideoReference,
    };
}
