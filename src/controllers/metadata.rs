use crate::controllers::runner::APP_VERSION;
use crate::app_error::AppError;
use serde::Serialize;
use std::io::Write;

/// Printed when the Docker CLI calls `docker-cli-plugin-metadata`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginMetadata {
    schema_version: &'static str,
    vendor: &'static str,
    version: &'static str,
    short_description: &'static str,
    #[serde(rename = "URL")]
    url: &'static str,
}

impl Default for PluginMetadata {
    fn default() -> Self {
        Self {
            schema_version: "0.1.0",
            vendor: "Mocker",
            version: APP_VERSION,
            short_description: "Run and manage AI models using open-source technologies",
            url: "https://github.com/richardkiene/mocker",
        }
    }
}

pub fn metadata(out: &mut dyn Write) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, &PluginMetadata::default())?;
    writeln!(out)?;
    Ok(())
}
