use crate::config::startup_delay::StartupDelay;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const APP_NAME: &str = "mocker";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DockerConfig {
    binary: String,
    container_name: String,
    image: String,
    volume_name: String,
    volume_mount: String,
    port: u16,
    pull_policy: String,
    startup_delay: StartupDelay,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            container_name: "mocker-model-runner".to_string(),
            image: "ollama/ollama:latest".to_string(),
            volume_name: "ollama".to_string(),
            volume_mount: "/root/.ollama".to_string(),
            port: 11434,
            pull_policy: "always".to_string(),
            startup_delay: StartupDelay::default(),
        }
    }
}

impl DockerConfig {
    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn volume_mount(&self) -> &str {
        &self.volume_mount
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pull_policy(&self) -> &str {
        &self.pull_policy
    }

    pub fn startup_delay(&self) -> &StartupDelay {
        &self.startup_delay
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    binary: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "ollama".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    docker: DockerConfig,
    engine: EngineConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error reading config: {0}")]
    Confy(#[from] confy::ConfyError),
}

impl Config {
    /// Loads the configuration from `path`, or from the user's configuration
    /// directory when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let cfg = match path {
            Some(path) => Config::load_or_create(path)?,
            None => confy::load(APP_NAME, "config")?,
        };
        debug!("Loaded configuration: {:?}", cfg);
        Ok(cfg)
    }

    fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        if path.exists() {
            let cfg: Self = confy::load_path(path)?;
            Ok(cfg)
        } else {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let cfg = Config::default();
            confy::store_path(path, &cfg)?;
            Ok(cfg)
        }
    }

    pub fn docker(&self) -> &DockerConfig {
        &self.docker
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    #[cfg(test)]
    pub fn with_startup_delay(mut self, startup_delay: StartupDelay) -> Self {
        self.docker.startup_delay = startup_delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let cfg = Config::load(Some(path.as_path())).unwrap();

        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("container_name: mocker-model-runner"));
        assert!(written.contains("startup_delay: 2s"));
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "docker:\n  image: ollama/ollama:0.6.2\n  startup_delay: 500ms\n",
        )
        .unwrap();

        let cfg = Config::load(Some(path.as_path())).unwrap();

        assert_eq!(cfg.docker().image(), "ollama/ollama:0.6.2");
        assert_eq!(cfg.docker().startup_delay(), &StartupDelay::from_millis(500));
        assert_eq!(cfg.docker().container_name(), "mocker-model-runner");
        assert_eq!(cfg.docker().port(), 11434);
        assert_eq!(cfg.engine().binary(), "ollama");
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "docker:\n  startup_delay: whenever\n").unwrap();

        let error = Config::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(error, ConfigError::Confy(_)), "{error:?}");
    }
}
