use crate::config::config::{Config, DockerConfig};
use crate::process_events::{ExitInfo, ProcessEvents};
use crate::repositories::command_runner::{CapturedOutput, CommandRunner, RelayError, command_line};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Talks to the container runtime through its command-line interface.
pub struct DockerRepository {
    runner: Arc<dyn CommandRunner>,
    config: DockerConfig,
}

impl DockerRepository {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        Self {
            runner,
            config: config.docker().clone(),
        }
    }

    pub fn container_name(&self) -> &str {
        self.config.container_name()
    }

    /// A failing listing counts as "not running".
    pub async fn is_running(&self) -> bool {
        let args = list_names_args();
        match self.runner.capture(self.config.binary(), &args).await {
            Ok(captured) if captured.status.is_success() => captured
                .output
                .lines()
                .any(|name| name.trim() == self.config.container_name()),
            Ok(captured) => {
                debug!("Listing containers failed: {}", captured.output.trim());
                false
            }
            Err(e) => {
                debug!("Listing containers failed: {}", e);
                false
            }
        }
    }

    /// Removes a stale container of the same name; a missing one is fine.
    pub async fn remove_container(&self) {
        info!("Removing stale container: {}", self.config.container_name());
        self.run_ignoring_failure(remove_container_args(&self.config)).await;
    }

    pub async fn create_volume(&self) {
        info!("Ensuring volume: {}", self.config.volume_name());
        self.run_ignoring_failure(create_volume_args(&self.config)).await;
    }

    pub async fn run_container(&self) -> Result<(), RelayError> {
        info!(
            "Starting container {} from {}",
            self.config.container_name(),
            self.config.image()
        );
        self.capture_checked(run_container_args(&self.config)).await?;
        Ok(())
    }

    /// Runs `args` inside the container and returns the combined output.
    pub async fn exec(&self, args: &[String]) -> Result<String, RelayError> {
        let captured = self
            .capture_checked(exec_args(self.config.container_name(), args))
            .await?;
        Ok(captured.output)
    }

    /// Runs `args` inside the container, yielding output as it is produced.
    pub fn exec_streaming(&self, args: &[String]) -> Result<ProcessEvents, RelayError> {
        self.runner.stream(
            self.config.binary(),
            &exec_args(self.config.container_name(), args),
        )
    }

    /// Runs `args` inside the container with the terminal attached.
    pub async fn exec_interactive(&self, args: &[String], tty: bool) -> Result<(), RelayError> {
        let args = interactive_exec_args(self.config.container_name(), args, tty);
        let status = self.runner.attach(self.config.binary(), &args).await?;
        self.check_status(&args, status, String::new())
    }

    pub fn describe_exec(&self, args: &[String]) -> String {
        command_line(
            self.config.binary(),
            &exec_args(self.config.container_name(), args),
        )
    }

    async fn capture_checked(&self, args: Vec<String>) -> Result<CapturedOutput, RelayError> {
        let captured = self.runner.capture(self.config.binary(), &args).await?;
        self.check_status(&args, captured.status, captured.output.clone())?;
        Ok(captured)
    }

    fn check_status(
        &self,
        args: &[String],
        status: ExitInfo,
        output: String,
    ) -> Result<(), RelayError> {
        if status.is_success() {
            return Ok(());
        }
        Err(RelayError::Failed {
            command: command_line(self.config.binary(), args),
            code: status.code,
            output,
        })
    }

    async fn run_ignoring_failure(&self, args: Vec<String>) {
        match self.runner.capture(self.config.binary(), &args).await {
            Ok(captured) if !captured.status.is_success() => {
                debug!(
                    "Ignoring failure of `{}`: {}",
                    command_line(self.config.binary(), &args),
                    captured.output.trim()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("{}", e),
        }
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

pub fn list_names_args() -> Vec<String> {
    to_args(&["ps", "--format", "{{.Names}}"])
}

pub fn remove_container_args(config: &DockerConfig) -> Vec<String> {
    to_args(&["rm", "-f", config.container_name()])
}

pub fn create_volume_args(config: &DockerConfig) -> Vec<String> {
    to_args(&["volume", "create", config.volume_name()])
}

pub fn run_container_args(config: &DockerConfig) -> Vec<String> {
    let volume = format!("{}:{}", config.volume_name(), config.volume_mount());
    let ports = format!("{port}:{port}", port = config.port());
    to_args(&[
        "run",
        "-d",
        "--name",
        config.container_name(),
        "-v",
        &volume,
        "-p",
        &ports,
        "--pull",
        config.pull_policy(),
        config.image(),
    ])
}

pub fn exec_args(container_name: &str, args: &[String]) -> Vec<String> {
    let mut cmd = to_args(&["exec", container_name]);
    cmd.extend_from_slice(args);
    cmd
}

pub fn interactive_exec_args(container_name: &str, args: &[String], tty: bool) -> Vec<String> {
    let mut cmd = vec!["exec".to_string()];
    cmd.push(if tty { "-it" } else { "-i" }.to_string());
    cmd.push(container_name.to_string());
    cmd.extend_from_slice(args);
    cmd
}
