//! Session configuration.
//!
//! A [`SessionConfig`] is built once before the session starts and moved into
//! [`crate::ChatClient`]; it cannot change afterwards. Every field has a
//! default so a console client can start from the environment alone.

use std::sync::Arc;
use std::time::Duration;

use chatservice_shared::constants::{
    DEFAULT_LIVE_UPDATE_ADDR, DEFAULT_SERVER_ADDR, RECONNECT_INITIAL_DELAY_MS,
    RECONNECT_MAX_DELAY_MS,
};
use chatservice_shared::identity;

/// Receives one plain-text line per session lifecycle event, in addition to
/// the structured `tracing` output.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Delay schedule between live-update connection attempts.
///
/// The delay starts at `initial_delay`, doubles after every failed or dropped
/// connection and is capped at `max_delay`. A zero `initial_delay` retries
/// immediately every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Retry immediately, without any delay.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay that follows `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(RECONNECT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(RECONNECT_MAX_DELAY_MS),
        }
    }
}

/// Configuration for one chat session.
#[derive(Clone)]
pub struct SessionConfig {
    /// Name this client announces and signs messages as.
    pub username: String,

    /// Base64 Ed25519 private key. Generated when not supplied.
    /// Env: `CHAT_PRIVATE_KEY`
    pub private_key: String,

    /// `host:port` of the HTTP API.
    /// Env: `CHAT_SERVER_ADDR`
    /// Default: `127.0.0.1:80`
    pub server_address: String,

    /// `host:port` of the live-update TCP endpoint.
    /// Env: `CHAT_LIVE_UPDATE_ADDR`
    /// Default: `127.0.0.1:9435`
    pub live_update_address: String,

    /// Whether `connect` starts the live-update task.
    /// Env: `CHAT_LIVE_UPDATES` (true/false)
    /// Default: `true`
    pub enable_live_updates: bool,

    pub log_sink: Option<LogSink>,

    pub reconnect: ReconnectPolicy,
}

impl SessionConfig {
    /// Create a configuration with a freshly generated key pair.
    pub fn new(
        username: impl Into<String>,
        server_address: impl Into<String>,
        live_update_address: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            private_key: identity::generate_key_pair(),
            server_address: server_address.into(),
            live_update_address: live_update_address.into(),
            enable_live_updates: true,
            log_sink: None,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = private_key.into();
        self
    }

    pub fn with_live_updates(mut self, enabled: bool) -> Self {
        self.enable_live_updates = enabled;
        self
    }

    pub fn with_log_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let username = std::env::var("CHAT_USERNAME").unwrap_or_else(|_| "anonymous".to_string());
        let server =
            std::env::var("CHAT_SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());
        let live = std::env::var("CHAT_LIVE_UPDATE_ADDR")
            .unwrap_or_else(|_| DEFAULT_LIVE_UPDATE_ADDR.to_string());

        let mut config = Self::new(username, server, live);

        if let Ok(key) = std::env::var("CHAT_PRIVATE_KEY") {
            if !key.trim().is_empty() {
                config.private_key = key.trim().to_string();
            }
        }

        if let Ok(val) = std::env::var("CHAT_LIVE_UPDATES") {
            match parse_bool(&val) {
                Some(enabled) => config.enable_live_updates = enabled,
                None => {
                    tracing::warn!(value = %val, "Invalid CHAT_LIVE_UPDATES, using default");
                }
            }
        }

        config
    }

    /// Strip any `http://` or `https://` scheme from both addresses; the
    /// transports add their own.
    pub(crate) fn normalize_addresses(&mut self) {
        self.server_address = normalize_address(&self.server_address);
        self.live_update_address = normalize_address(&self.live_update_address);
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("anonymous", DEFAULT_SERVER_ADDR, DEFAULT_LIVE_UPDATE_ADDR)
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("username", &self.username)
            .field("private_key", &"<redacted>")
            .field("server_address", &self.server_address)
            .field("live_update_address", &self.live_update_address)
            .field("enable_live_updates", &self.enable_live_updates)
            .field("log_sink", &self.log_sink.is_some())
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

fn normalize_address(addr: &str) -> String {
    let addr = addr.trim();
    let addr = addr
        .strip_prefix("http://")
        .or_else(|| addr.strip_prefix("https://"))
        .unwrap_or(addr);
    addr.trim_end_matches('/').to_string()
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
