//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    env, fmt,
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CliArgs, Command, LoggingOverrides, RegisterArgs, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fortune-teller";
const ENV_PREFIX: &str = "FORTUNE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_API_BASE: &str = "https://discord.com/api/v10/";
const DEFAULT_TEMPLATES_DIR: &str = "assets/templates";
const DEFAULT_ARTIFACT_DIRNAME: &str = "fortune-teller";
const DEFAULT_RENDER_CLI_PATH: &str = "magick";
const DEFAULT_RENDER_FONT: &str = "assets/rubik.ttf";
const DEFAULT_RENDER_POINT_SIZE: u32 = 64;
const DEFAULT_RENDER_FILL: &str = "white";
const DEFAULT_TEXT_BOX: TextBox = TextBox {
    x: 240,
    y: 20,
    width: 630,
    height: 390,
};
const PUBLIC_KEY_HEX_LEN: usize = 64;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub discord: DiscordSettings,
    pub assets: AssetSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub max_body_bytes: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Credentials and endpoint for the Discord API.
#[derive(Clone)]
pub struct DiscordSettings {
    pub application_id: String,
    pub bot_token: String,
    /// Hex-encoded Ed25519 key; only required when serving interactions.
    pub public_key: Option<String>,
    pub api_base: Url,
}

impl fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("application_id", &self.application_id)
            .field("bot_token", &"[redacted]")
            .field("public_key", &self.public_key)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub templates_dir: PathBuf,
    pub fortunes_file: Option<PathBuf>,
    pub artifact_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub cli_path: PathBuf,
    pub font: PathBuf,
    pub point_size: NonZeroU32,
    pub text_box: TextBox,
    pub fill: String,
}

/// Region of the background the fortune text is centred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TextBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    let require_public_key = match cli.command.as_ref() {
        Some(Command::Serve(args)) => {
            raw.apply_serve_overrides(&args.overrides);
            true
        }
        Some(Command::Register(args)) => {
            raw.apply_logging_overrides(&args.logging);
            false
        }
        None => {
            raw.apply_serve_overrides(&ServeOverrides::default());
            true
        }
    };

    Settings::from_raw(raw, require_public_key)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    discord: RawDiscordSettings,
    assets: RawAssetSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_logging_overrides(&overrides.logging);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(dir) = overrides.templates_dir.as_ref() {
            self.assets.templates_dir = Some(dir.clone());
        }
        if let Some(file) = overrides.fortunes_file.as_ref() {
            self.assets.fortunes_file = Some(file.clone());
        }
        if let Some(dir) = overrides.artifact_dir.as_ref() {
            self.assets.artifact_dir = Some(dir.clone());
        }
        if let Some(path) = overrides.render_cli_path.as_ref() {
            self.render.cli_path = Some(path.clone());
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings, require_public_key: bool) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            discord,
            assets,
            render,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            discord: build_discord_settings(discord, require_public_key)?,
            assets: build_asset_settings(assets),
            render: build_render_settings(render)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let max_body_bytes = server.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES as u64);
    let max_body_bytes = usize::try_from(max_body_bytes)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid(
                "server.max_body_bytes",
                "must be greater than zero and fit in usize",
            )
        })?;

    Ok(ServerSettings {
        addr,
        max_body_bytes,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_discord_settings(
    discord: RawDiscordSettings,
    require_public_key: bool,
) -> Result<DiscordSettings, LoadError> {
    let application_id = required_secret(discord.application_id, "discord.application_id")?;
    let bot_token = required_secret(discord.bot_token, "discord.bot_token")?;

    let public_key = non_blank(discord.public_key);
    match public_key.as_deref() {
        Some(key) => validate_public_key(key)?,
        None if require_public_key => {
            return Err(LoadError::invalid(
                "discord.public_key",
                "is required to verify interaction signatures",
            ));
        }
        None => {}
    }

    let api_base = discord
        .api_base
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let api_base = parse_api_base(&api_base)?;

    Ok(DiscordSettings {
        application_id,
        bot_token,
        public_key,
        api_base,
    })
}

fn build_asset_settings(assets: RawAssetSettings) -> AssetSettings {
    let templates_dir = assets
        .templates_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));
    let artifact_dir = assets
        .artifact_dir
        .unwrap_or_else(|| env::temp_dir().join(DEFAULT_ARTIFACT_DIRNAME));

    AssetSettings {
        templates_dir,
        fortunes_file: assets.fortunes_file,
        artifact_dir,
    }
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let cli_path = render
        .cli_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_CLI_PATH));
    if cli_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.cli_path",
            "path must not be empty",
        ));
    }

    let font = render
        .font
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_FONT));
    if font.as_os_str().is_empty() {
        return Err(LoadError::invalid("render.font", "path must not be empty"));
    }

    let point_size = NonZeroU32::new(render.point_size.unwrap_or(DEFAULT_RENDER_POINT_SIZE))
        .ok_or_else(|| LoadError::invalid("render.point_size", "must be greater than zero"))?;

    let text_box = render.text_box.unwrap_or(DEFAULT_TEXT_BOX);
    if text_box.width == 0 || text_box.height == 0 {
        return Err(LoadError::invalid(
            "render.text_box",
            "width and height must be greater than zero",
        ));
    }

    let fill = render
        .fill
        .and_then(|value| non_blank(Some(value)))
        .unwrap_or_else(|| DEFAULT_RENDER_FILL.to_string());

    Ok(RenderSettings {
        cli_path,
        font,
        point_size,
        text_box,
        fill,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    max_body_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawDiscordSettings {
    application_id: Option<String>,
    bot_token: Option<String>,
    public_key: Option<String>,
    api_base: Option<String>,
}

impl fmt::Debug for RawDiscordSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDiscordSettings")
            .field("application_id", &self.application_id)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[redacted]"))
            .field("public_key", &self.public_key)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    templates_dir: Option<PathBuf>,
    fortunes_file: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    cli_path: Option<PathBuf>,
    font: Option<PathBuf>,
    point_size: Option<u32>,
    text_box: Option<TextBox>,
    fill: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn required_secret(value: Option<String>, key: &'static str) -> Result<String, LoadError> {
    non_blank(value).ok_or_else(|| LoadError::invalid(key, "is required"))
}

fn validate_public_key(key: &str) -> Result<(), LoadError> {
    if key.len() != PUBLIC_KEY_HEX_LEN || !key.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(LoadError::invalid(
            "discord.public_key",
            format!("expected {PUBLIC_KEY_HEX_LEN} hexadecimal characters"),
        ));
    }
    Ok(())
}

fn parse_api_base(value: &str) -> Result<Url, LoadError> {
    // A trailing slash keeps relative joins inside the versioned prefix.
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    let url = Url::parse(&normalized)
        .map_err(|err| LoadError::invalid("discord.api_base", err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "discord.api_base",
            "must be an absolute http(s) URL",
        ));
    }
    Ok(url)
}
