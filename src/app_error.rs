use crate::config::config::ConfigError;
use crate::repositories::command_runner::RelayError;
use crate::services::model_runner_manager::RunnerError;
use std::io;
use std::process::ExitCode;
use thiserror::Error;
use tracing::error;

/// Everything a command can fail with, as seen by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("Unable to write output: {0}")]
    Output(#[from] io::Error),
    #[error("Unable to encode plugin metadata: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<RunnerError> for AppError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Relay(err) => AppError::Relay(err),
            RunnerError::Output(err) => AppError::Output(err),
        }
    }
}

impl AppError {
    /// Exit code of the relayed process when there is one, otherwise a
    /// generic failure.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::Relay(RelayError::Failed {
                code: Some(code), ..
            }) => u8::try_from(*code)
                .ok()
                .filter(|code| *code != 0)
                .map(ExitCode::from)
                .unwrap_or(ExitCode::FAILURE),
            _ => ExitCode::FAILURE,
        }
    }
}

pub fn report(err: AppError) -> ExitCode {
    error!("{}", err);
    err.exit_code()
}
