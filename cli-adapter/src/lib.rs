//! CLI-backed collaborators for the reel-recipe extraction pipeline.
//!
//! - [`ClaudeBackend`] implements `LlmBackend` by running `claude --print`.
//! - [`YtDlpFetcher`] implements `MetadataFetcher` by running `yt-dlp`.
//!
//! Both go through [`run_process`]: bounded output capture, a hard timeout, and
//! SIGTERM then SIGKILL on expiry.

pub mod claude;
pub mod discovery;
pub mod error;
pub mod process;
pub mod types;
pub mod ytdlp;

pub use claude::ClaudeBackend;
pub use discovery::{discover, BinarySpec, CLAUDE, YT_DLP};
pub use error::CliError;
pub use process::run_process;
pub use types::{RunConfig, RunResult};
pub use ytdlp::YtDlpFetcher;
