//! Server configuration loading from file and environment variables.

use parley_agent::{AgentConfig, LlmConfig, PlatformConfig, SessionConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Voice-agent platform credentials.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Chat completion backend.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Prompt and greeting.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation store bounds.
    #[serde(default)]
    pub sessions: SessionConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parley_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PARLEY_HOST` / `PARLEY_PORT` override `server.host` / `server.port`
/// - `PARLEY_LOG_LEVEL` overrides `logging.level`
/// - `PARLEY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `LAYERCODE_API_KEY`, `LAYERCODE_WEBHOOK_SECRET` and
///   `LAYERCODE_AUTHORIZE_URL` override the `platform` section
/// - `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `PARLEY_MODEL` override `llm`
/// - `PARLEY_SESSION_TTL_SECS` and `PARLEY_MAX_CONVERSATIONS` override
///   `sessions`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("PARLEY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("PARLEY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("PARLEY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("PARLEY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    if let Some(key) = lookup("LAYERCODE_API_KEY") {
        config.platform.api_key = key;
    }
    if let Some(secret) = lookup("LAYERCODE_WEBHOOK_SECRET") {
        config.platform.webhook_secret = secret;
    }
    if let Some(url) = lookup("LAYERCODE_AUTHORIZE_URL") {
        config.platform.authorize_url = url;
    }

    if let Some(key) = lookup("OPENAI_API_KEY") {
        config.llm.api_key = key;
    }
    if let Some(url) = lookup("OPENAI_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Some(model) = lookup("PARLEY_MODEL") {
        config.llm.model = model;
    }

    if let Some(ttl) = lookup("PARLEY_SESSION_TTL_SECS") {
        if let Ok(parsed) = ttl.parse() {
            config.sessions.ttl_seconds = parsed;
        }
    }
    if let Some(max) = lookup("PARLEY_MAX_CONVERSATIONS") {
        if let Ok(parsed) = max.parse() {
            config.sessions.max_conversations = parsed;
        }
    }
}
