use crate::config::config::Config;
use crate::model::{ModelDetails, ModelRecord};
use crate::process_events::ProcessEvent;
use crate::repositories::command_runner::RelayError;
use crate::repositories::docker_repository::DockerRepository;
use crate::services::output_scraper::{
    PullProgress, parse_engine_version, parse_model_details, parse_model_list,
};
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

pub const RUNNER_NAME: &str = "Mocker Model Runner";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("Unable to write output: {0}")]
    Output(#[from] io::Error),
}

/// Keeps the runner container alive and relays engine commands into it.
pub struct ModelRunnerManager {
    docker_repository: DockerRepository,
    engine_binary: String,
    startup_delay: Duration,
}

impl ModelRunnerManager {
    pub fn new(docker_repository: DockerRepository, config: &Config) -> Self {
        Self {
            docker_repository,
            engine_binary: config.engine().binary().to_string(),
            startup_delay: config.docker().startup_delay().duration(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.docker_repository.is_running().await
    }

    /// Starts the runner container unless it is already up. Returns whether
    /// a container had to be started.
    pub async fn ensure_running(&self, out: &mut dyn Write) -> Result<bool, RunnerError> {
        if self.is_running().await {
            debug!("{} already running", self.docker_repository.container_name());
            return Ok(false);
        }

        writeln!(out, "Starting {}...", RUNNER_NAME)?;
        self.docker_repository.remove_container().await;
        self.docker_repository.create_volume().await;
        self.docker_repository.run_container().await?;

        // Give the engine a moment to initialize
        sleep(self.startup_delay).await;
        info!("{} started", RUNNER_NAME);
        Ok(true)
    }

    pub async fn engine_version(&self) -> Result<String, RunnerError> {
        let output = self
            .docker_repository
            .exec(&self.engine_args(&["--version"]))
            .await?;
        Ok(parse_engine_version(&output))
    }

    pub async fn list_models(&self) -> Result<Vec<(ModelRecord, ModelDetails)>, RunnerError> {
        let output = self
            .docker_repository
            .exec(&self.engine_args(&["list"]))
            .await?;

        let mut models = Vec::new();
        for record in parse_model_list(&output) {
            let details = self.model_details(&record.name).await;
            models.push((record, details));
        }
        Ok(models)
    }

    /// Falls back to placeholder details if the engine cannot describe the model.
    pub async fn model_details(&self, model_name: &str) -> ModelDetails {
        match self
            .docker_repository
            .exec(&self.engine_args(&["show", model_name]))
            .await
        {
            Ok(output) => parse_model_details(&output),
            Err(e) => {
                warn!("Unable to fetch details for {}: {}", model_name, e);
                ModelDetails::default()
            }
        }
    }

    /// Pulls a model, echoing the engine's progress output to `out`.
    pub async fn pull_model(
        &self,
        model_name: &str,
        out: &mut dyn Write,
    ) -> Result<PullProgress, RunnerError> {
        let args = self.engine_args(&["pull", model_name]);
        let command = self.docker_repository.describe_exec(&args);
        let mut events = self.docker_repository.exec_streaming(&args)?;
        let mut progress = PullProgress::default();

        while let Some(event) = events.next().await {
            let event = event.map_err(|source| RelayError::Read {
                command: command.clone(),
                source,
            })?;
            match event {
                ProcessEvent::Line(line) => {
                    writeln!(out, "{}", line)?;
                    progress.observe(&line);
                }
                ProcessEvent::Exited(status) if status.is_success() => return Ok(progress),
                ProcessEvent::Exited(status) => {
                    return Err(RelayError::Failed {
                        command,
                        code: status.code,
                        output: String::new(),
                    }
                    .into());
                }
            }
        }

        Err(RelayError::Interrupted { command }.into())
    }

    pub async fn remove_model(&self, model_name: &str) -> Result<(), RunnerError> {
        self.docker_repository
            .exec(&self.engine_args(&["rm", model_name]))
            .await?;
        Ok(())
    }

    /// Attaches the terminal to an engine session, one-shot when a prompt is given.
    pub async fn run_model(
        &self,
        model_name: &str,
        prompt: Option<&str>,
        tty: bool,
    ) -> Result<(), RunnerError> {
        let mut args = self.engine_args(&["run", model_name]);
        if let Some(prompt) = prompt {
            args.push(prompt.to_string());
        }
        self.docker_repository.exec_interactive(&args, tty).await?;
        Ok(())
    }

    fn engine_args(&self, args: &[&str]) -> Vec<String> {
        let mut cmd = vec![self.engine_binary.clone()];
        cmd.extend(args.iter().map(|arg| arg.to_string()));
        cmd
    }
}
