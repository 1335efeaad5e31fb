//! [`MetadataFetcher`] backed by `yt-dlp --dump-single-json`.
//!
//! Only the JSON info dump is read; nothing is downloaded. Subtitle tracks are
//! exposed by yt-dlp as URLs, so no transcript is produced here.

use async_trait::async_trait;
use reel_recipe_extraction::{FetchError, MetadataFetcher, RawContext, VideoReference};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::discovery::{discover, YT_DLP};
use crate::error::CliError;
use crate::process::run_process;
use crate::types::RunConfig;

/// Subset of the yt-dlp info dump we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    /// Video title; TikTok puts the (truncated) caption here.
    #[serde(default)]
    pub title: Option<String>,
    /// Untruncated title when the platform provides one.
    #[serde(default)]
    pub fulltitle: Option<String>,
    /// Full description or caption.
    #[serde(default)]
    pub description: Option<String>,
    /// Display name of the uploader.
    #[serde(default)]
    pub uploader: Option<String>,
    /// Handle of the uploader.
    #[serde(default)]
    pub uploader_id: Option<String>,
    /// Canonical page URL.
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl VideoInfo {
    /// Converts the dump into the text context used for extraction.
    #[must_use]
    pub fn into_context(self, video: &VideoReference) -> RawContext {
        let title = self.fulltitle.or(self.title).filter(|t| !t.trim().is_empty());
        let description = self.description.filter(|d| !d.trim().is_empty());

        // TikTok titles are the caption cut short; keep only the full text then.
        let truncated_caption = matches!(
            (&title, &description),
            (Some(t), Some(d)) if d.starts_with(t.trim_end_matches("...").trim())
        );
        let title = if truncated_caption { None } else { title };

        RawContext {
            source_url: self.webpage_url.unwrap_or_else(|| video.url.clone()),
            title,
            caption: None,
            transcript: None,
            description,
            creator: self
                .uploader_id
                .or(self.uploader)
                .or_else(|| video.creator_handle()),
        }
    }
}

/// Fetches video metadata by running `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    path: PathBuf,
    config: RunConfig,
}

impl YtDlpFetcher {
    /// Creates a fetcher for the executable at `path`.
    #[must_use]
    pub const fn new(path: PathBuf, config: RunConfig) -> Self {
        Self { path, config }
    }

    /// Locates `yt-dlp` and creates a fetcher for it.
    ///
    /// # Errors
    ///
    /// Returns `CliError::ExecutableNotFound` when yt-dlp cannot be found.
    pub fn discover(explicit_path: Option<PathBuf>, config: RunConfig) -> Result<Self, CliError> {
        let path = discover(&YT_DLP, explicit_path)?;
        tracing::debug!(path = %path.display(), "using yt-dlp");
        Ok(Self::new(path, config))
    }
}

/// Builds the argument list for a metadata-only yt-dlp run.
#[must_use]
pub fn build_args(url: &str) -> Vec<OsString> {
    [
        "--dump-single-json",
        "--skip-download",
        "--no-playlist",
        "--no-warnings",
        "--",
        url,
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

/// Maps a failed yt-dlp run to a fetch error.
#[must_use]
pub fn classify_cli_error(error: CliError) -> FetchError {
    match error {
        CliError::NonZeroExit { stderr, exit_code, .. } => {
            let detail = stderr
                .lines()
                .map(str::trim)
                .rfind(|line| line.starts_with("ERROR"))
                .or_else(|| stderr.lines().map(str::trim).rfind(|line| !line.is_empty()))
                .map_or_else(|| format!("yt-dlp exited with status {exit_code}"), str::to_string);
            if detail.contains("Unsupported URL") {
                FetchError::Unsupported(detail)
            } else {
                FetchError::Unreachable(detail)
            }
        }
        other => FetchError::Unreachable(other.to_string()),
    }
}

/// Parses a yt-dlp JSON dump into a context.
///
/// # Errors
///
/// Returns `FetchError::Unreachable` for malformed output and
/// `FetchError::NoContentFound` when the video carries no text.
pub fn parse_dump(stdout: &str, video: &VideoReference) -> Result<RawContext, FetchError> {
    let info: VideoInfo = serde_json::from_str(stdout)
        .map_err(|e| FetchError::Unreachable(format!("invalid yt-dlp output: {e}")))?;
    let context = info.into_context(video);
    if context.is_empty() {
        return Err(FetchError::NoContentFound {
            url: video.url.clone(),
        });
    }
    Ok(context)
}

#[async_trait]
impl MetadataFetcher for YtDlpFetcher {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(&self, video: &VideoReference) -> Result<RawContext, FetchError> {
        let result = run_process(&self.path, &build_args(&video.url), &self.config)
            .await
            .and_then(crate::types::RunResult::into_success)
            .map_err(classify_cli_error)?;
        tracing::debug!(duration_ms = result.duration_ms, "yt-dlp finished");
        parse_dump(&result.stdout, video)
    }
}
