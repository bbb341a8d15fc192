use crate::app_error::AppError;
use crate::services::model_runner_manager::{ModelRunnerManager, RUNNER_NAME};
use std::io::Write;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = "\
Usage:  docker model COMMAND

Commands:
  list        List models available locally
  pull        Download a model
  rm          Remove a downloaded model
  run         Run a model interactively or with a prompt
  status      Check if the model runner is running
  version     Show the current version
";

/// Reports whether the runner container is up without starting it.
pub async fn status(manager: &ModelRunnerManager, out: &mut dyn Write) -> Result<(), AppError> {
    if manager.is_running().await {
        writeln!(out, "{} is active", RUNNER_NAME)?;
    } else {
        writeln!(out, "{} is not running", RUNNER_NAME)?;
    }
    Ok(())
}

pub fn help(out: &mut dyn Write) -> Result<(), AppError> {
    out.write_all(HELP.as_bytes())?;
    Ok(())
}

pub async fn version(manager: &ModelRunnerManager, out: &mut dyn Write) -> Result<(), AppError> {
    manager.ensure_running(out).await?;
    let engine_version = manager.engine_version().await?;
    writeln!(out, "Mocker version: {}", APP_VERSION)?;
    writeln!(out, "Ollama version: {}", engine_version)?;
    Ok(())
}
