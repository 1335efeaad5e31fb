//! The `reel-recipe` binary turns a cooking video URL into a structured recipe.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use reel_recipe::{build_pipeline, init_tracing, run_extract, AppError, Cli, Commands};
use reel_recipe_extraction::schema::recipe_schema;

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    let cli = Cli::parse();
    init_tracing(cli.settings.log_format)?;

    match cli.command {
        Commands::Schema => {
            print_json(&recipe_schema())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Extract {
            video_url,
            max_retries,
        } => {
            let pipeline = build_pipeline(&cli.settings)?;
            let result = run_extract(&pipeline, video_url, max_retries).await;
            print_json(&result)?;

            if result.success {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
