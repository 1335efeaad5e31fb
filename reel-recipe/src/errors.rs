use thiserror::Error;

/// Errors of the `reel-recipe` binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// A CLI collaborator could not be set up.
    #[error("CLI adapter error: {0}")]
    Cli(#[from] reel_recipe_cli_adapter::CliError),

    /// Output could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be initialised.
    #[error("Initialization error: {0}")]
    Init(String),
}
