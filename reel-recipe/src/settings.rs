use clap::{Args, Parser, Subcommand, ValueEnum};
use reel_recipe_cli_adapter::RunConfig;
use reel_recipe_extraction::ExtractionConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line interface of the `reel-recipe` binary.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings shared by every subcommand.
    #[command(flatten)]
    pub settings: ClientSettings,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract a recipe from a cooking video and print it as JSON
    Extract {
        /// URL of the video (TikTok, YouTube, Instagram, ...)
        video_url: String,
        /// Retries after the first attempt (default 2, capped at 5)
        #[arg(long)]
        max_retries: Option<usize>,
    },
    /// Print the JSON Schema of the extracted recipe
    Schema,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Settings taken from flags, falling back to environment variables.
#[derive(Debug, Clone, Args)]
pub struct ClientSettings {
    /// Model passed to the claude CLI
    #[arg(long, global = true, env = "REEL_RECIPE_MODEL")]
    pub model: Option<String>,

    /// Time budget for one LLM attempt, in seconds
    #[arg(long, global = true, env = "REEL_RECIPE_ATTEMPT_TIMEOUT_SECS", default_value_t = 120)]
    pub attempt_timeout_secs: u64,

    /// Time budget for fetching video metadata, in seconds
    #[arg(long, global = true, env = "REEL_RECIPE_FETCH_TIMEOUT_SECS", default_value_t = 60)]
    pub fetch_timeout_secs: u64,

    /// Path to the claude executable (else $REEL_RECIPE_CLAUDE_BIN, then $PATH)
    #[arg(long, global = true)]
    pub claude_bin: Option<PathBuf>,

    /// Path to the yt-dlp executable (else $REEL_RECIPE_YT_DLP_BIN, then $PATH)
    #[arg(long = "yt-dlp-bin", global = true)]
    pub yt_dlp_bin: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, env = "REEL_RECIPE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ClientSettings {
    /// Pipeline configuration derived from these settings.
    #[must_use]
    pub fn extraction_config(&self) -> ExtractionConfig {
        ExtractionConfig::default()
            .with_attempt_timeout(Duration::from_secs(self.attempt_timeout_secs))
    }

    /// Subprocess configuration for the LLM CLI.
    #[must_use]
    pub fn llm_run_config(&self) -> RunConfig {
        RunConfig::default().with_timeout(Duration::from_secs(self.attempt_timeout_secs))
    }

    /// Subprocess configuration for the metadata fetcher.
    #[must_use]
    pub fn fetch_run_config(&self) -> RunConfig {
        RunConfig::default().with_timeout(Duration::from_secs(self.fetch_timeout_secs))
    }
}
