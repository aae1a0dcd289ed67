//! Console configuration loaded from environment variables.
//!
//! Session settings come from [`SessionConfig::from_env`]; the console adds
//! the channel to join and where to keep the trust list.

use std::path::PathBuf;

use chatservice_client::SessionConfig;
use chatservice_shared::constants::{DEFAULT_MESSAGE_LIMIT, DEFAULT_TRUST_FILE};

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub session: SessionConfig,

    /// Channel to join.
    /// Env: `CHAT_CHANNEL`
    /// Default: `general`
    pub channel: String,

    /// Trust list location.
    /// Env: `CHAT_TRUST_FILE`
    /// Default: `trustedusers.json`
    pub trust_file: PathBuf,

    /// Messages printed on start.
    /// Env: `CHAT_HISTORY`
    /// Default: `10`
    pub history: u32,
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        let mut config = Self::with_session(SessionConfig::from_env());

        if let Ok(channel) = std::env::var("CHAT_CHANNEL") {
            if !channel.trim().is_empty() {
                config.channel = channel.trim().to_string();
            }
        }

        if let Ok(path) = std::env::var("CHAT_TRUST_FILE") {
            config.trust_file = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("CHAT_HISTORY") {
            match val.parse::<u32>() {
                Ok(n) => config.history = n,
                Err(_) => tracing::warn!(value = %val, "Invalid CHAT_HISTORY, using default"),
            }
        }

        config
    }

    pub fn with_session(session: SessionConfig) -> Self {
        Self {
            session,
            channel: "general".to_string(),
            trust_file: PathBuf::from(DEFAULT_TRUST_FILE),
            history: DEFAULT_MESSAGE_LIMIT,
        }
    }
}
