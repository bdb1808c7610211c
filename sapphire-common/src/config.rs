//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. `SAPPHIRE_ROOT` environment variable
/// 3. `root_folder` key in the user config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("SAPPHIRE_ROOT") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file in the user config directory
    if let Ok(config_path) = user_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get the user-level configuration file path for the platform
fn user_config_file() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .map(|d| d.join("sapphire").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sapphire"))
        .unwrap_or_else(|| PathBuf::from("./sapphire_data"))
}

/// Root folder holding the database, uploads, and sapphire.toml
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create the root folder (and uploads subfolder) if missing
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        std::fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database_path(&self) -> PathBuf {
        self.path.join("sapphire.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.path.join("uploads")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join("sapphire.toml")
    }
}

/// Application configuration, loaded from `<root>/sapphire.toml` with
/// environment variable overrides for deployment knobs and secrets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub reminders: ReminderConfig,
    pub ai: AiConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Sweep interval for the reminder job
    pub poll_seconds: u64,
    /// Reminders whose deadline falls within this window beyond "now" are
    /// fetched for trigger evaluation
    pub grace_seconds: i64,
    pub from_address: String,
    /// Used when neither the deadline nor the task owner carries an email
    pub fallback_recipient: String,
    /// SMTP transport settings; absent means stub mode (log only)
    pub smtp: Option<SmtpConfig>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_seconds: 60,
            grace_seconds: 60,
            from_address: "no-reply@sapphire.local".to_string(),
            fallback_recipient: "test@example.com".to_string(),
            smtp: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

/// Transcription backend mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    /// Return canned transcript/summary text without calling the vendor API
    Mock,
    /// Call the configured transcription API
    Live,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub mode: AiMode,
    pub api_key: Option<String>,
    pub base_url: String,
    pub summary_model: String,
    pub summary_type: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            mode: AiMode::Mock,
            api_key: None,
            base_url: "https://api.assemblyai.com/v2".to_string(),
            summary_model: "informative".to_string(),
            summary_type: "bullets".to_string(),
            poll_interval_ms: 3000,
            max_poll_attempts: 100,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_size_mb: 500 }
    }
}

impl Config {
    /// Load configuration from `<root>/sapphire.toml`, falling back to
    /// defaults when the file is missing, then apply environment overrides.
    pub fn load(root: &RootFolder) -> Result<Self> {
        let mut config = match std::fs::read_to_string(root.config_path()) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse sapphire.toml: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        config.apply_env_overrides();
        config.resolve_ai_mode();
        Ok(config)
    }

    /// Environment overrides keep parity with the deployment variables the
    /// platform has always honored.
    fn apply_env_overrides(&mut self) {
        if let Some(port) = env_parse::<u16>("PORT") {
            self.server.port = port;
        }
        if let Some(seconds) = env_parse::<u64>("REMINDER_POLL_SECONDS") {
            self.reminders.poll_seconds = seconds;
        }
        if let Some(from) = env_nonempty("EMAIL_FROM") {
            self.reminders.from_address = from;
        }
        if let Some(notify) = env_nonempty("NOTIFY_EMAIL") {
            self.reminders.fallback_recipient = notify;
        }
        if let Some(host) = env_nonempty("SMTP_HOST") {
            let smtp = self.reminders.smtp.get_or_insert(SmtpConfig {
                host: String::new(),
                port: default_smtp_port(),
                username: None,
                password: None,
            });
            smtp.host = host;
            if let Some(port) = env_parse::<u16>("SMTP_PORT") {
                smtp.port = port;
            }
            if let Some(user) = env_nonempty("SMTP_USER") {
                smtp.username = Some(user);
            }
            if let Some(pass) = env_nonempty("SMTP_PASS") {
                smtp.password = Some(pass);
            }
        }
        if let Some(key) = env_nonempty("ASSEMBLYAI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(mode) = env_nonempty("AI_MODE") {
            match mode.to_lowercase().as_str() {
                "live" => self.ai.mode = AiMode::Live,
                "mock" => self.ai.mode = AiMode::Mock,
                other => warn!("Ignoring unrecognized AI_MODE value: {}", other),
            }
        }
        if let Some(mock) = env_nonempty("MEETINGS_MOCK") {
            if matches!(mock.to_lowercase().as_str(), "1" | "true") {
                self.ai.mode = AiMode::Mock;
            }
        }
        if let Some(mb) = env_parse::<u64>("MAX_UPLOAD_SIZE_MB") {
            if mb > 0 {
                self.uploads.max_size_mb = mb;
            }
        }
    }

    /// Live mode without an API key cannot work; fall back to mock with a
    /// warning rather than failing at upload time.
    fn resolve_ai_mode(&mut self) {
        if self.ai.mode == AiMode::Live && self.ai.api_key.is_none() {
            warn!("AI mode is 'live' but no API key is configured; falling back to mock mode");
            self.ai.mode = AiMode::Mock;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.uploads.max_size_mb as usize) * 1024 * 1024
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_nonempty(name).and_then(|v| v.parse().ok())
}
