//! bossbot-config: process-environment configuration.
//!
//! All settings come from the environment (a `.env` file is honored via
//! dotenvy), matching how the bot has always been deployed.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DISCORD_TOKEN is not set")]
    MissingToken,
    #[error("Unknown timezone: {0}")]
    BadTimezone(String),
    #[error("Unknown fire policy: {0} (expected \"retain\" or \"consume\")")]
    BadFirePolicy(String),
}

/// What to do with a one-shot schedule when its firing fails before the
/// message could be delivered (channel gone, send rejected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirePolicy {
    /// Keep the record armed; it will be retried at the next occurrence.
    #[default]
    Retain,
    /// Delete the record anyway: one attempt consumes the schedule.
    Consume,
}

impl FromStr for FirePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retain" => Ok(FirePolicy::Retain),
            "consume" => Ok(FirePolicy::Consume),
            other => Err(ConfigError::BadFirePolicy(other.to_string())),
        }
    }
}

/// Runtime configuration for the bot process.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token. Optional here so offline subcommands can still
    /// load a config; the gateway path calls [`BotConfig::require_token`].
    pub discord_token: Option<String>,
    /// Timezone all `HH:MM` schedule times are interpreted in.
    pub timezone: Tz,
    /// Path to the schedule store file.
    pub schedule_file: PathBuf,
    /// Path to the boss catalog file.
    pub bosses_file: PathBuf,
    /// Policy for failed scheduled firings.
    pub fire_policy: FirePolicy,
}

fn default_timezone() -> Tz {
    chrono_tz::America::Sao_Paulo
}

impl BotConfig {
    /// Load configuration from the process environment.
    ///
    /// `TIMEZONE` defaults to `America/Sao_Paulo`, `SCHEDULE_FILE` to
    /// `schedules.json`, `BOSSES_FILE` to `bosses.json`, `FIRE_POLICY`
    /// to `retain`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env if present
        let _ = dotenvy::dotenv();

        let timezone = match env::var("TIMEZONE") {
            Ok(tz) => tz
                .parse::<Tz>()
                .map_err(|_| ConfigError::BadTimezone(tz))?,
            Err(_) => default_timezone(),
        };

        let fire_policy = match env::var("FIRE_POLICY") {
            Ok(p) => p.parse()?,
            Err(_) => FirePolicy::default(),
        };

        let config = Self {
            discord_token: env::var("DISCORD_TOKEN").ok(),
            timezone,
            schedule_file: env::var("SCHEDULE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("schedules.json")),
            bosses_file: env::var("BOSSES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("bosses.json")),
            fire_policy,
        };

        tracing::debug!(
            timezone = %config.timezone,
            schedule_file = %config.schedule_file.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// The bot token, or an error if it was not supplied.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.discord_token
            .as_deref()
            .ok_or(ConfigError::MissingToken)
    }
}
