//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Engine configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Pause after each resolved action so observers can animate
    pub action_delay: Duration,
    /// Buffer size of the match command channel
    pub command_channel_capacity: usize,
    /// Buffer size of the event broadcast channel
    pub event_channel_capacity: usize,

    /// Rounds the headless driver plays before giving up
    pub max_rounds: u32,
    /// Optional JSON script of rounds for the headless driver
    pub match_script: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            action_delay: Duration::from_millis(600),
            command_channel_capacity: 64,
            event_channel_capacity: 128,
            max_rounds: 20,
            match_script: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),

            action_delay: parse_var::<u64>("ACTION_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.action_delay),
            command_channel_capacity: parse_var("COMMAND_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.command_channel_capacity),
            event_channel_capacity: parse_var("EVENT_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.event_channel_capacity),

            max_rounds: parse_var("MAX_ROUNDS")?.unwrap_or(defaults.max_rounds),
            match_script: env::var_os("MATCH_SCRIPT").map(PathBuf::from),
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
