use crate::process_events::{ExitInfo, ProcessEvents};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::io;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Output of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub status: ExitInfo,
    /// Stdout followed by stderr.
    pub output: String,
}

impl CapturedOutput {
    pub fn new(status: ExitInfo, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read output of `{command}`: {source}")]
    Read {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed with {}\nOutput: {output}", describe_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
    #[error("`{command}` ended without reporting an exit status")]
    Interrupted { command: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Seam between the relay and the operating system.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs to completion and captures both output streams.
    async fn capture(&self, program: &str, args: &[String]) -> Result<CapturedOutput, RelayError>;

    /// Runs with the invoking process's stdin, stdout and stderr attached.
    async fn attach(&self, program: &str, args: &[String]) -> Result<ExitInfo, RelayError>;

    /// Starts the process and hands back its combined output as it arrives.
    fn stream(&self, program: &str, args: &[String]) -> Result<ProcessEvents, RelayError>;
}

#[derive(Debug, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> TokioCommandRunner {
        Self
    }

    fn command(program: &str, args: &[String]) -> Command {
        debug!("Running: {}", command_line(program, args));
        let mut command = Command::new(program);
        command.args(args);
        command
    }

    fn spawn_error(program: &str, args: &[String], source: io::Error) -> RelayError {
        RelayError::Spawn {
            command: command_line(program, args),
            source,
        }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn capture(&self, program: &str, args: &[String]) -> Result<CapturedOutput, RelayError> {
        let output = Self::command(program, args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::spawn_error(program, args, e))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CapturedOutput::new(output.status.into(), combined))
    }

    async fn attach(&self, program: &str, args: &[String]) -> Result<ExitInfo, RelayError> {
        let status = Self::command(program, args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Self::spawn_error(program, args, e))?;
        Ok(status.into())
    }

    fn stream(&self, program: &str, args: &[String]) -> Result<ProcessEvents, RelayError> {
        ProcessEvents::spawn(Self::command(program, args))
            .map_err(|e| Self::spawn_error(program, args, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn command_line_joins_program_and_args() {
        assert_eq!(
            command_line("docker", &args(&["exec", "runner", "ollama", "list"])),
            "docker exec runner ollama list"
        );
        assert_eq!(command_line("docker", &[]), "docker");
    }

    #[test]
    fn failed_error_includes_code_and_output() {
        let error = RelayError::Failed {
            command: "docker exec runner ollama rm foo".to_string(),
            code: Some(1),
            output: "Error: model 'foo' not found".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("exit status 1"));
        assert!(message.contains("Output: Error: model 'foo' not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_combines_stdout_and_stderr() {
        let runner = TokioCommandRunner::new();
        let captured = runner
            .capture("sh", &args(&["-c", "echo out; echo err 1>&2; exit 2"]))
            .await
            .unwrap();

        assert_eq!(captured.status, ExitInfo::failure(2));
        assert_eq!(captured.output, "out\nerr\n");
    }

    #[tokio::test]
    async fn capture_reports_missing_binary_as_spawn_error() {
        let runner = TokioCommandRunner::new();
        let error = runner
            .capture("definitely-not-a-real-binary-4711", &[])
            .await
            .unwrap_err();

        assert!(matches!(error, RelayError::Spawn { .. }));
    }
}
