use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Name under which Docker invokes the plugin (`docker model ...`).
pub const PLUGIN_NAME: &str = "model";

#[derive(Parser, Clone, Debug)]
#[command(
    name = "docker model",
    about = "Run and manage AI models",
    long_about = "Run and manage AI models using open-source tools",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Enable verbose logging (-v for info, -vv for debug, -vvv for trace)"
    )]
    pub verbose: u8,

    /// Path to the YAML configuration file
    #[arg(
        short = 'c',
        long = "config",
        value_name = "CONFIG_PATH",
        global = true,
        help = "Configuration file path (defaults to the user configuration directory)"
    )]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Command {
    /// Check if the model runner is running
    Status,
    /// Show the custom help
    Help,
    /// Show the current version
    Version,
    /// List models available locally
    List,
    /// Download a model
    Pull { model: String },
    /// Remove a downloaded model
    Rm { model: String },
    /// Run a model interactively or with a prompt
    Run {
        model: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Print the Docker CLI plugin metadata
    #[command(name = "docker-cli-plugin-metadata", hide = true)]
    Metadata,
}

impl Cli {
    /// Parses the process arguments, accepting both direct invocation and
    /// invocation through the Docker CLI.
    pub fn from_plugin_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Cli::parse_from(strip_plugin_name(args))
    }
}

/// Docker runs plugins as `docker-model model <args>`; drop that leading
/// plugin name.
pub fn strip_plugin_name<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.get(1).is_some_and(|arg| arg == PLUGIN_NAME) {
        args.remove(1);
    }
    args
}
