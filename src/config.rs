use std::path::Path;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::{ConfigBuilder, File, FileFormat};
use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::http::RetryPolicy;
use crate::paths::default_config_path;

const PLACEHOLDER_MARKER: &str = "YOUR_";
const PLACEHOLDER_CHANNEL: &str = "target_twitch_channel_name";
const MAX_LOGIN_LEN: usize = 25;
const MAX_LOOKBACK_MINUTES: u64 = 60 * 24 * 365;

const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("twitch.client_id", "TWITCH_CLIENT_ID"),
    ("twitch.client_secret", "TWITCH_CLIENT_SECRET"),
    ("twitch.channel", "TWITCH_CHANNEL_NAME"),
    ("discord.webhook_url", "DISCORD_WEBHOOK_URL"),
    ("poll.interval_secs", "CHECK_INTERVAL_SECONDS"),
    ("poll.lookback_minutes", "CLIP_LOOKBACK_MINUTES"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{key}` (set it in the config file or via {env})")]
    Missing {
        key: &'static str,
        env: &'static str,
    },
    #[error("placeholder value detected for `{0}`; replace it with a real value")]
    Placeholder(&'static str),
    #[error("invalid channel name `{0}`: expected 1-25 letters, digits or underscores")]
    InvalidChannel(String),
    #[error("`{0}` is not a valid http(s) URL")]
    InvalidUrl(&'static str),
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    #[error("`twitch.page_size` must be between 1 and 100, got {0}")]
    PageSize(u32),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub twitch: TwitchConfig,
    pub discord: DiscordConfig,
    pub poll: PollConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    pub channel: String,
    pub auth_url: String,
    pub api_base_url: String,
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            channel: String::new(),
            auth_url: "https://id.twitch.tv/oauth2/token".to_string(),
            api_base_url: "https://api.twitch.tv/helix".to_string(),
            page_size: 20,
            max_pages: 5,
        }
    }
}

impl TwitchConfig {
    pub fn login(&self) -> String {
        self.channel.trim().to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub username: Option<String>,
    pub notify_delay_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            username: None,
            notify_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub lookback_minutes: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            lookback_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub attempts: usize,
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
            attempts: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl HttpConfig {
    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            attempts: self.attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Config {
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit_path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_path()?, false),
        };
        if path.exists() {
            info!(path = %path.display(), "loading config file");
        } else if !required {
            info!(path = %path.display(), "no config file found, using environment only");
        }

        let builder = ::config::Config::builder().add_source(
            File::from(path.as_path())
                .format(FileFormat::Toml)
                .required(required),
        );
        let config = Self::load(builder, |key| std::env::var(key).ok())
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(test)]
    pub fn from_toml_str(raw: &str) -> Result<Self, ::config::ConfigError> {
        Self::load(toml_builder(raw), |_| None)
    }

    // Legacy environment names are applied as overrides, so they win over the file.
    fn load<F>(
        builder: ConfigBuilder<DefaultState>,
        lookup: F,
    ) -> Result<Self, ::config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = builder;
        for (key, env) in ENV_OVERRIDES {
            let value = lookup(env)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
            builder = builder.set_override_option(key, value)?;
        }
        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require(&self.twitch.client_id, "twitch.client_id", "TWITCH_CLIENT_ID")?;
        require(
            &self.twitch.client_secret,
            "twitch.client_secret",
            "TWITCH_CLIENT_SECRET",
        )?;
        require(&self.twitch.channel, "twitch.channel", "TWITCH_CHANNEL_NAME")?;
        require(
            &self.discord.webhook_url,
            "discord.webhook_url",
            "DISCORD_WEBHOOK_URL",
        )?;

        if self.twitch.client_id.contains(PLACEHOLDER_MARKER) {
            return Err(ConfigError::Placeholder("twitch.client_id"));
        }
        if self.twitch.client_secret.contains(PLACEHOLDER_MARKER) {
            return Err(ConfigError::Placeholder("twitch.client_secret"));
        }
        if self.discord.webhook_url.contains(PLACEHOLDER_MARKER) {
            return Err(ConfigError::Placeholder("discord.webhook_url"));
        }
        let login = self.twitch.login();
        if login == PLACEHOLDER_CHANNEL {
            return Err(ConfigError::Placeholder("twitch.channel"));
        }
        if !is_valid_login(&login) {
            return Err(ConfigError::InvalidChannel(self.twitch.channel.clone()));
        }

        require_http_url(&self.discord.webhook_url, "discord.webhook_url")?;
        require_http_url(&self.twitch.auth_url, "twitch.auth_url")?;
        require_http_url(&self.twitch.api_base_url, "twitch.api_base_url")?;

        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Zero("poll.interval_secs"));
        }
        if self.poll.lookback_minutes == 0 {
            return Err(ConfigError::Zero("poll.lookback_minutes"));
        }
        if !(1..=100).contains(&self.twitch.page_size) {
            return Err(ConfigError::PageSize(self.twitch.page_size));
        }
        if self.twitch.max_pages == 0 {
            return Err(ConfigError::Zero("twitch.max_pages"));
        }
        if self.http.attempts == 0 {
            return Err(ConfigError::Zero("http.attempts"));
        }

        if self.poll.lookback_minutes.saturating_mul(60) < self.poll.interval_secs {
            warn!(
                interval_secs = self.poll.interval_secs,
                lookback_minutes = self.poll.lookback_minutes,
                "lookback window is shorter than the poll interval; clips may be missed"
            );
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    pub fn lookback(&self) -> TimeDelta {
        let minutes = self.poll.lookback_minutes.min(MAX_LOOKBACK_MINUTES);
        TimeDelta::minutes(i64::try_from(minutes).unwrap_or_default())
    }

    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.discord.notify_delay_ms)
    }
}

fn toml_builder(raw: &str) -> ConfigBuilder<DefaultState> {
    ::config::Config::builder().add_source(File::from_str(raw, FileFormat::Toml))
}

fn require(value: &str, key: &'static str, env: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing { key, env });
    }
    Ok(())
}

fn require_http_url(value: &str, key: &'static str) -> Result<(), ConfigError> {
    match url::Url::parse(value.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(ConfigError::InvalidUrl(key)),
    }
}

fn is_valid_login(login: &str) -> bool {
    !login.is_empty()
        && login.len() <= MAX_LOGIN_LEN
        && login
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
