/// Ed25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// Ed25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Ed25519 signature size in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Maximum live-update line length in bytes (256 KiB)
pub const MAX_LINE_LEN: usize = 262_144;

/// Default HTTP server address
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:80";

/// Default live-update TCP address
pub const DEFAULT_LIVE_UPDATE_ADDR: &str = "127.0.0.1:9435";

/// Default trust list file, relative to the working directory
pub const DEFAULT_TRUST_FILE: &str = "trustedusers.json";

/// Default page size for message history queries
pub const DEFAULT_MESSAGE_LIMIT: u32 = 10;

/// Reconnect backoff bounds for the live-update channel (milliseconds)
pub const RECONNECT_INITIAL_DELAY_MS: u64 = 500;
pub const RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Live-update command tokens
pub const CMD_USERNAME: &str = "USERNAME";
pub const CMD_PUBKEY: &str = "PUBKEY";
pub const CMD_SIGN: &str = "SIGN";
pub const CMD_CHANNEL: &str = "CHANNEL";
pub const CMD_ACK: &str = "ACK";
pub const CMD_DISCONNECT: &str = "DISCONNECT";
pub const CMD_MSG: &str = "MSG";
pub const CMD_ONLINE: &str = "ONLINE";
pub const CMD_OFFLINE: &str = "OFFLINE";
