//! StillOnTime configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StillOnTimeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub imap: ImapConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
}

impl StillOnTimeConfig {
    /// Load config from the default path (~/.stillontime/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::StillOnTimeError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::StillOnTimeError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::StillOnTimeError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the StillOnTime home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stillontime")
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// API key required in X-Api-Key for /api routes. Empty = open.
    #[serde(default)]
    pub api_key: String,
    /// Max requests per client per minute before 429.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_rate_limit() -> u32 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            api_key: String::new(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

/// SQLite database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "~/.stillontime/stillontime.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    /// Resolve `~` against the home directory.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(rest) = self.path.strip_prefix("~/") {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(rest)
        } else {
            PathBuf::from(&self.path)
        }
    }
}

/// Outbound SMTP (email notifications).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_from() -> String {
    "noreply@stillontime.app".into()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: default_from(),
            display_name: None,
        }
    }
}

/// Twilio SMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// Sender phone number in E.164 form.
    #[serde(default)]
    pub from_number: String,
    #[serde(default = "default_twilio_base")]
    pub base_url: String,
}

fn default_twilio_base() -> String {
    "https://api.twilio.com".into()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            base_url: default_twilio_base(),
        }
    }
}

/// Firebase Cloud Messaging push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub server_key: String,
    #[serde(default = "default_fcm_base")]
    pub base_url: String,
}

fn default_fcm_base() -> String {
    "https://fcm.googleapis.com".into()
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_key: String::new(),
            base_url: default_fcm_base(),
        }
    }
}

/// Inbound IMAP (call-sheet email ingestion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_imap_host")]
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_true")]
    pub mark_as_read: bool,
}

fn default_imap_host() -> String {
    "imap.gmail.com".into()
}
fn default_imap_port() -> u16 {
    993
}
fn default_mailbox() -> String {
    "INBOX".into()
}
fn default_poll_interval() -> u64 {
    300
}
fn default_true() -> bool {
    true
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_imap_host(),
            port: default_imap_port(),
            email: String::new(),
            password: String::new(),
            mailbox: default_mailbox(),
            poll_interval_secs: default_poll_interval(),
            mark_as_read: true,
        }
    }
}

/// Weather provider endpoint (Open-Meteo compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_weather_base")]
    pub base_url: String,
    #[serde(default = "default_geocode_base")]
    pub geocode_url: String,
    #[serde(default = "default_weather_refresh")]
    pub refresh_interval_secs: u64,
}

fn default_weather_base() -> String {
    "https://api.open-meteo.com".into()
}
fn default_geocode_base() -> String {
    "https://geocoding-api.open-meteo.com".into()
}
fn default_weather_refresh() -> u64 {
    1800
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_weather_base(),
            geocode_url: default_geocode_base(),
            refresh_interval_secs: default_weather_refresh(),
        }
    }
}

/// Notification outbox sweep tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_sweep_interval() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            max_retries: default_max_retries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = StillOnTimeConfig::default();
        assert_eq!(cfg.gateway.port, 3000);
        assert_eq!(cfg.outbox.max_retries, 3);
        assert!(!cfg.smtp.enabled);
        assert!(cfg.weather.enabled);
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: StillOnTimeConfig = toml::from_str(
            r#"
            [gateway]
            port = 8080
            api_key = "secret"

            [sms]
            enabled = true
            account_sid = "AC123"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gateway.port, 8080);
        assert_eq!(cfg.gateway.api_key, "secret");
        assert!(cfg.sms.enabled);
        assert_eq!(cfg.sms.base_url, "https://api.twilio.com");
        assert_eq!(cfg.weather.geocode_url, "https://geocoding-api.open-meteo.com");
        assert_eq!(cfg.imap.mailbox, "INBOX");
    }
}
