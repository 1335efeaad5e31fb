//! Locates CLI binaries on the host system.

use crate::error::CliError;
use std::path::PathBuf;
use which::which;

/// How to find one executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarySpec {
    /// Executable name looked up on `$PATH`.
    pub name: &'static str,
    /// Environment variable that overrides the path.
    pub env_var: &'static str,
    /// Shown when nothing is found.
    pub install_hint: &'static str,
}

/// The Claude Code CLI.
pub const CLAUDE: BinarySpec = BinarySpec {
    name: "claude",
    env_var: "REEL_RECIPE_CLAUDE_BIN",
    install_hint: "npm install -g @anthropic-ai/claude-code",
};

/// The yt-dlp downloader.
pub const YT_DLP: BinarySpec = BinarySpec {
    name: "yt-dlp",
    env_var: "REEL_RECIPE_YT_DLP_BIN",
    install_hint: "pipx install yt-dlp",
};

/// Locates an executable.
///
/// Resolution order:
/// 1. `explicit_path` if provided and the file exists.
/// 2. The path in `spec.env_var`.
/// 3. `spec.name` resolved via `$PATH`.
/// 4. Common install locations.
///
/// # Errors
///
/// Returns `CliError::ExecutableNotFound` when no valid executable can be
/// located.
pub fn discover(spec: &BinarySpec, explicit_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(path);
        }
        return Err(CliError::ExecutableNotFound(format!(
            "Explicit path does not exist: {}",
            path.display()
        )));
    }

    if let Ok(path_str) = std::env::var(spec.env_var) {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(env_var = spec.env_var, path = %path.display(), "ignoring missing override");
    }

    if let Ok(path) = which(spec.name) {
        return Ok(path);
    }

    if let Some(location) = fallback_locations(spec.name)
        .into_iter()
        .find(|location| location.exists())
    {
        return Ok(location);
    }

    Err(CliError::ExecutableNotFound(format!(
        "{} not found. Install: {}\nSearched: {}, PATH, common install locations.",
        spec.name, spec.install_hint, spec.env_var
    )))
}

#[cfg(unix)]
fn fallback_locations(name: &str) -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".local/bin").join(name));
        locations.push(home.join(".npm/bin").join(name));
        locations.push(home.join(".claude/local").join(name));
    }
    locations.push(PathBuf::from("/usr/local/bin").join(name));
    locations.push(PathBuf::from("/opt/homebrew/bin").join(name));
    locations
}

#[cfg(windows)]
fn fallback_locations(name: &str) -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join("AppData/Roaming/npm").join(format!("{name}.cmd")));
        locations.push(home.join("scoop/shims").join(format!("{name}.exe")));
    }
    locations
}
