use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration loaded from `~/.config/webtty/config.toml`,
/// then overridden by `WEBTTY_*` environment variables, then by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pty: PtyConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub session_log: SessionLogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pty: PtyConfig::default(),
            history: HistoryConfig::default(),
            logging: LoggingConfig::default(),
            tls: TlsConfig::default(),
            ui: UiConfig::default(),
            session_log: SessionLogConfig::default(),
        }
    }
}

impl Config {
    /// Load from a specific path. `wt_core::settings::SettingsManager` wraps
    /// this for the CLI's default-path load/save flow.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(cfg)
    }

    /// Apply `WEBTTY_*` environment variable overrides on top of whatever
    /// was loaded from file/defaults. CLI flags are applied by callers on
    /// top of the result, since flags outrank everything.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("WEBTTY_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("WEBTTY_PORT") {
            if let Ok(port) = v.parse() {
                self.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("WEBTTY_UNSECURE") {
            self.tls.enabled = !matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("WEBTTY_LOG_DIR") {
            self.session_log.dir = Some(v);
        }
        if let Ok(v) = std::env::var("WEBTTY_THEME") {
            self.ui.theme = v;
        }
        self
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            prefix: default_prefix(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    7681
}
fn default_prefix() -> String {
    "ws".into()
}

/// Controls the default command run inside a freshly-created session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtyConfig {
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default)]
    pub shell_args: Vec<String>,
    #[serde(default = "default_cols")]
    pub default_cols: u16,
    #[serde(default = "default_rows")]
    pub default_rows: u16,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_args: Vec::new(),
            default_cols: default_cols(),
            default_rows: default_rows(),
        }
    }
}

fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".into())
}
fn default_cols() -> u16 {
    80
}
fn default_rows() -> u16 {
    24
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity_bytes: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: default_history_capacity(),
        }
    }
}

/// Default history buffer capacity: 50 KiB.
fn default_history_capacity() -> usize {
    50 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cert_dir")]
    pub cert_dir: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_dir: default_cert_dir(),
        }
    }
}

fn default_cert_dir() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webtty")
        .join("certs")
        .to_string_lossy()
        .into_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub motd_path: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            motd_path: None,
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLogConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub dir: Option<String>,
}

impl Default for SessionLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
        }
    }
}
