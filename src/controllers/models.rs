use crate::app_error::AppError;
use crate::services::model_runner_manager::ModelRunnerManager;
use crate::services::output_scraper::{format_model_row, table_header};
use std::io::{IsTerminal, Write};

pub async fn list(manager: &ModelRunnerManager, out: &mut dyn Write) -> Result<(), AppError> {
    manager.ensure_running(out).await?;
    let models = manager.list_models().await?;

    writeln!(out, "{}", table_header())?;
    for (record, details) in &models {
        writeln!(out, "{}", format_model_row(record, details))?;
    }
    Ok(())
}

pub async fn pull(
    manager: &ModelRunnerManager,
    model_name: &str,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    writeln!(
        out,
        "Pulling model {} (this is just Ollama in disguise, but don't tell anyone)...",
        model_name
    )?;
    manager.ensure_running(out).await?;

    let progress = manager.pull_model(model_name, out).await?;
    writeln!(out, "{}", progress.summary())?;
    writeln!(
        out,
        "Model {} pulled successfully (just like some other tools do, but we're honest about it)",
        model_name
    )?;
    Ok(())
}

pub async fn rm(
    manager: &ModelRunnerManager,
    model_name: &str,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    manager.ensure_running(out).await?;
    manager.remove_model(model_name).await?;
    writeln!(
        out,
        "Model {} removed successfully (and we didn't charge you a subscription for it)",
        model_name
    )?;
    Ok(())
}

/// Without a prompt this opens an interactive chat; otherwise the words are
/// joined into a single prompt.
pub async fn run(
    manager: &ModelRunnerManager,
    model_name: &str,
    prompt: &[String],
    out: &mut dyn Write,
) -> Result<(), AppError> {
    manager.ensure_running(out).await?;

    let prompt = (!prompt.is_empty()).then(|| prompt.join(" "));
    if prompt.is_some() {
        writeln!(
            out,
            "Running with prompt (Ollama is doing all the work, but we'll take credit)..."
        )?;
    } else {
        writeln!(out, "Interactive chat mode started. Type 'Ctrl+C' to exit.")?;
        writeln!(
            out,
            "(What you're about to use is just Ollama's interface with our name on it)"
        )?;
    }
    out.flush()?;

    let tty = std::io::stdin().is_terminal();
    manager.run_model(model_name, prompt.as_deref(), tty).await?;
    Ok(())
}
