use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the fortune-teller binary.
#[derive(Debug, Parser)]
#[command(
    name = "fortune-teller",
    version,
    about = "Discord bot that reads fortunes"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FORTUNE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the interactions endpoint.
    Serve(Box<ServeArgs>),
    /// Push the command catalog to Discord.
    Register(RegisterArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the directory holding background templates.
    #[arg(long = "templates-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub templates_dir: Option<PathBuf>,

    /// Override the fortune catalog file.
    #[arg(long = "fortunes-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub fortunes_file: Option<PathBuf>,

    /// Override the directory used for temporary rendered cards.
    #[arg(long = "artifact-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub artifact_dir: Option<PathBuf>,

    /// Override the ImageMagick executable path.
    #[arg(long = "render-cli-path", value_name = "PATH")]
    pub render_cli_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Register into a single guild instead of globally.
    #[arg(long = "guild", value_name = "GUILD_ID")]
    pub guild_id: Option<String>,
}
