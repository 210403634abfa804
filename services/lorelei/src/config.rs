//! Application Configuration Module
//!
//! Loads every setting from environment variables (and `.env`) into a single
//! struct that `main` splits between the transport, the generator adapter,
//! and the conversation engine.

use lorelei_core::config::EngineConfig;
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// How often the chat loop runs the inactivity check when chat is quiet.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const DEFAULT_MEMORY_FILE: &str = "lorelei_memory.json";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorProvider {
    Gemini,
    OpenAI,
}

impl GeneratorProvider {
    fn default_model(self) -> &'static str {
        match self {
            GeneratorProvider::Gemini => "gemini-1.5-flash",
            GeneratorProvider::OpenAI => "gpt-4o",
        }
    }
}

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub bot_nick: String,
    pub channel: String,
    pub twitch_token: SecretString,
    pub twitch_url: String,
    pub provider: GeneratorProvider,
    pub api_key: SecretString,
    pub chat_model: String,
    pub memory_file: PathBuf,
    pub generator_timeout: Duration,
    pub reconnect_delay: Duration,
    pub voice_command: Option<String>,
    pub log_level: Level,
    pub engine: EngineConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    // *   `BOT_NICK`, `CHANNEL_NAME`, `TWITCH_ACCESS_TOKEN`: chat credentials. Required.
    // *   `GENERATOR_PROVIDER`: "gemini" (default) or "openai".
    // *   `GEMINI_API_KEY` / `OPENAI_API_KEY`: required for the selected provider.
    // *   Timing knobs are whole seconds, e.g. `AI_CALL_COOLDOWN_SECS=10`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        let provider = match var("GENERATOR_PROVIDER").map(|p| p.to_lowercase()).as_deref() {
            None | Some("gemini") => GeneratorProvider::Gemini,
            Some("openai") => GeneratorProvider::OpenAI,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "GENERATOR_PROVIDER".to_string(),
                    value: other.to_string(),
                });
            }
        };
        let api_key = match provider {
            GeneratorProvider::Gemini => required("GEMINI_API_KEY")?,
            GeneratorProvider::OpenAI => required("OPENAI_API_KEY")?,
        };

        let defaults = EngineConfig::default();
        let wake_words = match var("BOT_NICKNAMES") {
            Some(list) => list
                .split(',')
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            None => defaults.wake_words,
        };
        let engine = EngineConfig {
            command_prefix: var("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),
            wake_words,
            streamer: var("PRIVILEGED_USER").unwrap_or(defaults.streamer),
            bootstrap_topic: defaults.bootstrap_topic,
            chat_silence_threshold: secs(&var, "CHAT_SILENCE_THRESHOLD_SECS", defaults.chat_silence_threshold)?,
            inactivity_threshold: secs(&var, "INACTIVITY_THRESHOLD_SECS", defaults.inactivity_threshold)?,
            ai_call_cooldown: secs(&var, "AI_CALL_COOLDOWN_SECS", defaults.ai_call_cooldown)?,
            reply_timeout: secs(&var, "REPLY_TIMEOUT_SECS", defaults.reply_timeout)?,
            max_history: parse(&var, "MAX_HISTORY_LENGTH", defaults.max_history)?,
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            bot_nick: required("BOT_NICK")?,
            channel: required("CHANNEL_NAME")?.trim_start_matches('#').to_string(),
            twitch_token: SecretString::from(required("TWITCH_ACCESS_TOKEN")?),
            twitch_url: var("TWITCH_IRC_URL").unwrap_or_else(|| twitch_chat::DEFAULT_URL.to_string()),
            provider,
            api_key: SecretString::from(api_key),
            chat_model: var("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            memory_file: PathBuf::from(
                var("MEMORY_FILE").unwrap_or_else(|| DEFAULT_MEMORY_FILE.to_string()),
            ),
            generator_timeout: secs(&var, "GENERATOR_TIMEOUT_SECS", Duration::from_secs(30))?,
            reconnect_delay: secs(&var, "RECONNECT_DELAY_SECS", twitch_chat::DEFAULT_RECONNECT_DELAY)?,
            voice_command: var("VOICE_COMMAND"),
            log_level,
            engine,
        })
    }
}

fn parse<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: key.to_string(),
            value,
        }),
    }
}

fn secs(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parse(var, key, default.as_secs()).map(Duration::from_secs)
}
