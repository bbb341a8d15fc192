mod app_error;
mod cli;
mod config;
mod controllers;
mod model;
mod process_events;
mod repositories;
mod services;

use crate::app_error::AppError;
use crate::cli::{Cli, Command};
use crate::config::config::Config;
use crate::controllers::{metadata, models, runner};
use crate::repositories::command_runner::TokioCommandRunner;
use crate::repositories::docker_repository::DockerRepository;
use crate::services::model_runner_manager::ModelRunnerManager;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::from_plugin_args(std::env::args_os());
    enable_logging(cli.verbose);

    let mut out = io::stdout();
    let result = execute(cli.command, cli.config_path.as_deref(), &mut out).await;

    match result.and_then(|()| out.flush().map_err(AppError::from)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => app_error::report(err),
    }
}

/// Runs one command. Configuration is only loaded by commands that talk to
/// the container runtime.
async fn execute(
    command: Command,
    config_path: Option<&Path>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    match command {
        Command::Metadata => metadata::metadata(out),
        Command::Help => runner::help(out),
        Command::Status => runner::status(&manager(config_path)?, out).await,
        Command::Version => runner::version(&manager(config_path)?, out).await,
        Command::List => models::list(&manager(config_path)?, out).await,
        Command::Pull { model } => models::pull(&manager(config_path)?, &model, out).await,
        Command::Rm { model } => models::rm(&manager(config_path)?, &model, out).await,
        Command::Run { model, prompt } => {
            models::run(&manager(config_path)?, &model, &prompt, out).await
        }
    }
}

fn manager(config_path: Option<&Path>) -> Result<ModelRunnerManager, AppError> {
    let config = Config::load(config_path)?;
    let docker_repository = DockerRepository::new(Arc::new(TokioCommandRunner::new()), &config);
    Ok(ModelRunnerManager::new(docker_repository, &config))
}

fn enable_logging(verbose: u8) {
    let log_level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::ConfigError;
    use std::fs;
    use tempfile::tempdir;

    fn broken_config() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "docker:\n  startup_delay: whenever\n").unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn help_and_metadata_ignore_the_configuration() {
        let (_dir, path) = broken_config();

        let mut out = Vec::new();
        execute(Command::Help, Some(path.as_path()), &mut out)
            .await
            .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("Usage:"));

        let mut out = Vec::new();
        execute(Command::Metadata, Some(path.as_path()), &mut out)
            .await
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\"SchemaVersion\""));
    }

    #[tokio::test]
    async fn engine_commands_fail_on_a_broken_configuration() {
        let (_dir, path) = broken_config();

        let mut out = Vec::new();
        let error = execute(Command::Status, Some(path.as_path()), &mut out)
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::Config(ConfigError::Confy(_))));
        assert_eq!(error.exit_code(), ExitCode::FAILURE);
        assert!(out.is_empty());
    }
}
