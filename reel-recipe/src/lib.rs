#![deny(missing_docs)]
//! Wiring for the `reel-recipe` command-line tool.
//!
//! Builds an [`ExtractionPipeline`] from [`ClientSettings`] using the `yt-dlp`
//! fetcher and the `claude` backend, and sets up logging.

/// Error types for the binary.
pub mod errors;
/// Command-line and environment settings.
pub mod settings;

use std::sync::Arc;

use reel_recipe_cli_adapter::{ClaudeBackend, YtDlpFetcher};
use reel_recipe_extraction::{ExtractionPipeline, ExtractionRequest, ExtractionResult};
use tracing_subscriber::EnvFilter;

pub use errors::AppError;
pub use settings::{Cli, ClientSettings, Commands, LogFormat};

/// Installs the global tracing subscriber, writing to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
///
/// # Errors
///
/// Returns `AppError::Init` when a subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| AppError::Init(e.to_string()))
}

/// Builds a pipeline backed by the `yt-dlp` and `claude` CLIs.
///
/// # Errors
///
/// Returns `AppError::Cli` when either executable cannot be found.
pub fn build_pipeline(settings: &ClientSettings) -> Result<ExtractionPipeline, AppError> {
    let fetcher = YtDlpFetcher::discover(settings.yt_dlp_bin.clone(), settings.fetch_run_config())?;
    let backend = ClaudeBackend::discover(
        settings.claude_bin.clone(),
        settings.model.clone(),
        settings.llm_run_config(),
    )?;

    Ok(ExtractionPipeline::new(
        settings.extraction_config(),
        Arc::new(fetcher),
        Arc::new(backend),
    ))
}

/// Runs one extraction request.
pub async fn run_extract(
    pipeline: &ExtractionPipeline,
    video_url: String,
    max_retries: Option<usize>,
) -> ExtractionResult {
    pipeline
        .handle(ExtractionRequest {
            video_url,
            max_retries,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use reel_recipe_extraction::ExtractionConfig;
    use reel_recipe_extraction::testing::{ScriptedBackend, StaticFetcher};

    #[tokio::test]
    async fn test_run_extract_applies_default_retries() {
        let backend = Arc::new(ScriptedBackend::default());
        let pipeline = ExtractionPipeline::new(
            ExtractionConfig::default(),
            Arc::new(StaticFetcher::with_caption("pancakes")),
            backend.clone(),
        );

        let result = run_extract(&pipeline, "https://youtu.be/abc".to_string(), None).await;

        assert!(!result.success);
        assert_eq!(backend.calls(), 3);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["recipe"], serde_json::Value::Null);
        assert!(json["processing_time"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_missing_binaries_are_reported() {
        let settings = Cli::try_parse_from([
            "reel-recipe",
            "--yt-dlp-bin",
            "/nonexistent/yt-dlp",
            "schema",
        ])
        .unwrap()
        .settings;

        let error = build_pipeline(&settings).unwrap_err();
        assert!(matches!(error, AppError::Cli(_)));
    }
}
