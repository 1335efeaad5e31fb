//! The externally visible extraction operation.
//!
//! [`ExtractionPipeline`] fetches the video's text once, then hands it to a
//! [`RetryController`]. Every outcome, including fetch failures, resolves to a
//! well-formed [`ExtractionResult`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ExtractionConfig;
use crate::controller::{ExtractedRecipe, RetryController};
use crate::error::{ExtractionError, FetchError};
use crate::invoker::{ExtractionInvoker, LlmBackend};
use crate::normalize::UnitNormalizer;
use crate::types::{ExtractionRequest, ExtractionResult, RawContext, VideoReference};

/// Source of a video's raw text (caption, transcript, description).
#[async_trait]
pub trait MetadataFetcher: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetches the text attached to `video`.
    async fn fetch(&self, video: &VideoReference) -> Result<RawContext, FetchError>;
}

/// Fetch, then extract with bounded retries.
///
/// Immutable after construction; share it through an `Arc` to run many
/// extractions concurrently.
#[derive(Debug)]
pub struct ExtractionPipeline {
    config: ExtractionConfig,
    fetcher: Arc<dyn MetadataFetcher>,
    invoker: ExtractionInvoker,
    normalizer: UnitNormalizer,
}

impl ExtractionPipeline {
    /// Wires a fetcher and an LLM backend under `config`.
    #[must_use]
    pub fn new(
        config: ExtractionConfig,
        fetcher: Arc<dyn MetadataFetcher>,
        backend: Arc<dyn LlmBackend>,
    ) -> Self {
        let invoker = ExtractionInvoker::new(backend, &config);
        let normalizer = UnitNormalizer::new(config.units.clone());
        Self {
            config,
            fetcher,
            invoker,
            normalizer,
        }
    }

    /// The configuration this pipeline was built with.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Handles a request, applying the configured default and ceiling to `max_retries`.
    pub async fn handle(&self, request: ExtractionRequest) -> ExtractionResult {
        let max_retries = self.config.resolve_max_retries(request.max_retries);
        self.extract(&request.video_url, max_retries).await
    }

    /// Extracts a recipe and wraps the outcome in a result envelope.
    ///
    /// Never fails: errors become `success = false` with at least one reason.
    pub async fn extract(&self, video_url: &str, max_retries: usize) -> ExtractionResult {
        let start = Instant::now();
        let outcome = self.try_extract(video_url, max_retries).await;
        let processing_time = start.elapsed().as_secs_f64();

        match outcome {
            Ok(extracted) => ExtractionResult::succeeded(extracted.recipe, processing_time),
            Err(error) => ExtractionResult::failed(error.steps(), error.errors(), processing_time),
        }
    }

    /// Extracts a recipe, returning the typed error on failure.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::ContentFetch` when the URL is empty or the fetch
    /// fails (no LLM call is made), and `ExtractionError::RetriesExhausted` when
    /// no attempt produced a valid recipe.
    pub async fn try_extract(
        &self,
        video_url: &str,
        max_retries: usize,
    ) -> Result<ExtractedRecipe, ExtractionError> {
        let video = VideoReference::new(video_url);
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "extraction",
            %run_id,
            url = %video.url,
            platform = %video.platform,
        );

        async move {
            tracing::info!(
                max_retries,
                fetcher = self.fetcher.name(),
                backend = self.invoker.backend_name(),
                "starting extraction"
            );

            let context = self.fetch(&video).await?;
            let result = RetryController::new(&self.invoker, &self.normalizer, &self.config, max_retries)
                .run(&context)
                .await;

            match &result {
                Ok(extracted) => tracing::info!(
                    attempts = extracted.metrics.total_attempts,
                    steps = extracted.recipe.steps(),
                    input_tokens = extracted.metrics.estimated_input_tokens,
                    output_tokens = extracted.metrics.estimated_output_tokens,
                    "recipe extracted"
                ),
                Err(error) => tracing::error!(error = %error, "extraction failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn fetch(&self, video: &VideoReference) -> Result<RawContext, ExtractionError> {
        if video.url.is_empty() {
            return Err(FetchError::Unsupported("video URL is empty".to_string()).into());
        }

        let context = self.fetcher.fetch(video).await.map_err(|error| {
            tracing::error!(error = %error, "metadata fetch failed");
            ExtractionError::ContentFetch(error)
        })?;

        if context.is_empty() {
            tracing::error!("metadata fetch returned no text");
            return Err(FetchError::NoContentFound {
                url: video.url.clone(),
            }
            .into());
        }

        tracing::debug!(blobs = context.blobs().len(), "metadata fetched");
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, StaticFetcher};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_pipeline_is_send_sync() {
        assert_send_sync::<ExtractionPipeline>();
    }

    #[tokio::test]
    async fn test_empty_url_rejected_without_fetch() {
        let fetcher = Arc::new(StaticFetcher::with_caption("toast"));
        let backend = Arc::new(ScriptedBackend::default());
        let pipeline =
            ExtractionPipeline::new(ExtractionConfig::default(), fetcher.clone(), backend.clone());

        let result = pipeline.extract("   ", 2).await;

        assert!(!result.success);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(backend.calls(), 0);
        let errors = result.metadata.errors.unwrap();
        assert!(errors[0].starts_with("could not fetch video content"));
    }

    #[tokio::test]
    async fn test_blank_context_is_no_content() {
        let fetcher = Arc::new(StaticFetcher::returning(RawContext::new("https://example.com/v")));
        let backend = Arc::new(ScriptedBackend::default());
        let pipeline = ExtractionPipeline::new(ExtractionConfig::default(), fetcher, backend.clone());

        let error = pipeline
            .try_extract("https://example.com/v", 1)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ExtractionError::ContentFetch(FetchError::NoContentFound { .. })
        ));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_handle_clamps_requested_retries() {
        let fetcher = Arc::new(StaticFetcher::with_caption("toast"));
        let backend = Arc::new(ScriptedBackend::default());
        let config = ExtractionConfig::default().with_retry_ceiling(1);
        let pipeline = ExtractionPipeline::new(config, fetcher, backend.clone());

        let result = pipeline
            .handle(ExtractionRequest {
                video_url: "https://example.com/v".to_string(),
                max_retries: Some(10),
            })
            .await;

        assert!(!result.success);
        assert_eq!(backend.calls(), 2);
    }
}
