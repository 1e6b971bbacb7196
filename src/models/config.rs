//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Status document locations and retry behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Polling cadence and notice suppression
    #[serde(default)]
    pub poll: PollConfig,

    /// Cleanup of previously posted notifications
    #[serde(default)]
    pub purge: PurgeConfig,

    /// Where notifications are delivered
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `FS22_BOT_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply `FS22_BOT_*` overrides using the given variable lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| text(key).map(|v| v.trim().eq_ignore_ascii_case("true"));
        let number = |key: &str| {
            text(key).and_then(|v| match v.trim().parse::<i64>() {
                Ok(n) => Some(n),
                Err(e) => {
                    log::warn!("Ignoring {}={:?}: {}", key, v, e);
                    None
                }
            })
        };

        if let Some(v) = text("FS22_BOT_URL_SERVER_STATS") {
            self.fetch.server_stats_url = v;
        }
        if let Some(v) = text("FS22_BOT_URL_CAREER_SAVEGAME") {
            self.fetch.career_savegame_url = v;
        }
        if let Some(n) = number("FS22_BOT_FETCH_RETRIES") {
            self.fetch.retries = n.clamp(1, i64::from(u32::MAX)) as u32;
        }
        if let Some(n) = number("FS22_BOT_FETCH_RETRY_DELAY_MS") {
            self.fetch.retry_delay_ms = n.max(1) as u64;
        }
        if let Some(v) = flag("FS22_BOT_DISABLE_CERTIFICATE_VERIFICATION") {
            self.fetch.accept_invalid_certs = v;
        }
        if let Some(n) = number("FS22_BOT_POLL_INTERVAL_MINUTES") {
            self.poll.interval_minutes = n.max(1) as u64;
        }
        if let Some(v) = flag("FS22_BOT_DISABLE_UNREACHABLE_FOUND_MESSAGES") {
            self.poll.suppress_unreachable_notices = v;
        }
        if let Some(n) = number("FS22_BOT_PURGE_DISCORD_CHANNEL_AFTER_DAYS") {
            self.purge.after_days = (n > 0).then(|| u32::try_from(n).unwrap_or(u32::MAX));
        }
        if let Some(n) = number("FS22_BOT_PURGE_DISCORD_CHANNEL_AFTER_LINES") {
            self.purge.after_lines = (n > 0).then(|| usize::try_from(n).unwrap_or(usize::MAX));
        }
        if let Some(n) = number("FS22_BOT_PURGE_DISCORD_CHANNEL_HOUR") {
            self.purge.hour = n.clamp(0, 23) as u32;
        }
        if let Some(v) = flag("FS22_BOT_PURGE_DISCORD_CHANNEL_ON_STARTUP") {
            self.purge.on_startup = v;
        }
        if let Some(v) = text("FS22_BOT_DISCORD_SERVER_NAME") {
            self.delivery.server_name = Some(v);
        }
        if let Some(v) = text("FS22_BOT_DISCORD_CHANNEL_NAME") {
            self.delivery.channel_name = Some(v);
        }
        if let Some(v) = text("FS22_BOT_WEBHOOK_URL") {
            self.delivery.webhook_url = Some(v);
        }
        if let Some(v) = text("FS22_BOT_DB_PATH") {
            self.paths.state_file = PathBuf::from(v);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("fetch.server_stats_url", &self.fetch.server_stats_url),
            ("fetch.career_savegame_url", &self.fetch.career_savegame_url),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{key} is empty")));
            }
            Url::parse(value)?;
        }
        if let Some(webhook) = &self.delivery.webhook_url {
            Url::parse(webhook)?;
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self
            .purge
            .after_days
            .is_some_and(|days| days > defaults::MAX_PURGE_AFTER_DAYS)
        {
            return Err(AppError::validation(format!(
                "purge.after_days must be at most {}",
                defaults::MAX_PURGE_AFTER_DAYS
            )));
        }
        if self.purge.hour > 23 {
            return Err(AppError::validation("purge.hour must be between 0 and 23"));
        }
        if self.paths.state_file.as_os_str().is_empty() {
            return Err(AppError::validation("paths.state_file is empty"));
        }
        Ok(())
    }
}

/// Status document locations and retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// URL of the dedicated server's stats XML
    #[serde(default)]
    pub server_stats_url: String,

    /// URL of the career savegame XML
    #[serde(default)]
    pub career_savegame_url: String,

    /// Retries after a failed attempt
    #[serde(default = "defaults::retries")]
    pub retries: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept self-signed certificates on the status host
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl FetchConfig {
    /// Retry count, never below one.
    pub fn retries(&self) -> u32 {
        self.retries.max(1)
    }

    /// Delay between attempts, never below one millisecond.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.max(1))
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            server_stats_url: String::new(),
            career_savegame_url: String::new(),
            retries: defaults::retries(),
            retry_delay_ms: defaults::retry_delay(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            accept_invalid_certs: false,
        }
    }
}

/// Polling cadence and notice suppression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Minutes between polls
    #[serde(default = "defaults::interval")]
    pub interval_minutes: u64,

    /// Do not announce "unreachable" and "found" transitions
    #[serde(default)]
    pub suppress_unreachable_notices: bool,
}

impl PollConfig {
    /// Poll interval, never below one minute.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1).saturating_mul(60))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_minutes: defaults::interval(),
            suppress_unreachable_notices: false,
        }
    }
}

/// Cleanup of previously posted notifications.
///
/// Purging is enabled as soon as either retention limit is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    /// Delete notifications older than this many days
    #[serde(default)]
    pub after_days: Option<u32>,

    /// Keep at most this many of the newest notifications
    #[serde(default)]
    pub after_lines: Option<usize>,

    /// Hour of the day (UTC) at which purges run
    #[serde(default = "defaults::purge_hour")]
    pub hour: u32,

    /// Purge once immediately after startup
    #[serde(default)]
    pub on_startup: bool,
}

impl PurgeConfig {
    pub fn is_enabled(&self) -> bool {
        self.after_days.is_some() || self.after_lines.is_some()
    }
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            after_days: None,
            after_lines: None,
            hour: defaults::purge_hour(),
            on_startup: false,
        }
    }
}

/// Where notifications are delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Only deliver to servers (guilds) with this name
    #[serde(default)]
    pub server_name: Option<String>,

    /// Only deliver to channels with this name
    #[serde(default)]
    pub channel_name: Option<String>,

    /// Post notifications to this webhook instead of the log
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON file holding the last observed snapshot
    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: defaults::state_file(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Fetch defaults
    pub fn retries() -> u32 {
        5
    }
    pub fn retry_delay() -> u64 {
        2000
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; fs-watch/0.1)".into()
    }

    // Poll defaults
    pub fn interval() -> u64 {
        1
    }

    // Purge defaults
    pub fn purge_hour() -> u32 {
        4
    }
    /// Roughly a century
    pub const MAX_PURGE_AFTER_DAYS: u32 = 36_500;

    // Path defaults
    pub fn state_file() -> PathBuf {
        PathBuf::from("data/db.json")
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
