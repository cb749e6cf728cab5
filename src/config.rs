use dotenvy::dotenv;
use std::env;
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub log_file: PathBuf,
    pub version_file: PathBuf,
    pub version_poll_interval: Duration,
    pub filter_dir: PathBuf,
    pub locale_dir: PathBuf,
    pub default_locale: String,
    pub owner_id: Option<NonZeroU64>,
    pub dev_guild_id: Option<NonZeroU64>,
    pub status_activity: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let poll = env::var("VERSION_POLL_INTERVAL").unwrap_or_else(|_| "10s".to_string());
        let version_poll_interval = humantime::parse_duration(&poll).map_err(|e| {
            anyhow::anyhow!("VERSION_POLL_INTERVAL must be a duration like `10s`: {}", e)
        })?;
        if version_poll_interval.is_zero() {
            anyhow::bail!("VERSION_POLL_INTERVAL must be greater than zero");
        }

        let owner_id = optional_snowflake("OWNER_ID")?;
        let dev_guild_id = optional_snowflake("DEV_GUILD_ID")?;

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/guppi.db".to_string()),
            log_file: env::var("LOG_FILE")
                .unwrap_or_else(|_| "data/bot.log".to_string())
                .into(),
            version_file: env::var("VERSION_FILE")
                .unwrap_or_else(|_| "VERSION".to_string())
                .into(),
            version_poll_interval,
            filter_dir: env::var("FILTER_DIR")
                .unwrap_or_else(|_| "data/guilds".to_string())
                .into(),
            locale_dir: env::var("LOCALE_DIR")
                .unwrap_or_else(|_| "locales".to_string())
                .into(),
            default_locale: env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en-US".to_string()),
            owner_id,
            dev_guild_id,
            status_activity: env::var("STATUS_ACTIVITY").unwrap_or_else(|_| "Users".to_string()),
        })
    }
}

/// Discord ids are non-zero 64-bit integers.
pub fn parse_snowflake(raw: &str) -> Option<NonZeroU64> {
    raw.trim().parse().ok()
}

fn optional_snowflake(var: &str) -> anyhow::Result<Option<NonZeroU64>> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => parse_snowflake(&raw)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("{} must be a non-zero Discord id, got `{}`", var, raw)),
        _ => Ok(None),
    }
}

/// Values collected through the settings store at bootstrap.
#[derive(Clone)]
pub struct Credentials {
    pub bot_token: String,
    pub status_channel_id: NonZeroU64,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"[REDACTED]")
            .field("status_channel_id", &self.status_channel_id)
            .finish()
    }
}
