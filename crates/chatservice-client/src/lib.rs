//! Chat service client library.
//!
//! A [`ChatClient`] is one session against one channel of a chat server. It
//! signs outgoing messages with the user's Ed25519 key, fetches history and
//! presence over HTTP, and keeps a background TCP connection open for live
//! updates. Messages can be checked against a locally persisted list of
//! trusted users.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod live_update;
pub mod trust;

pub use client::ChatClient;
pub use config::{LogSink, ReconnectPolicy, SessionConfig};
pub use error::{ClientError, TransportError, TrustError};
pub use events::{ConnectionState, EventHub};
pub use http::{HttpTransport, RequestTransport};
pub use live_update::{LiveUpdateClient, Reply};
pub use trust::{JsonFileTrustPersistence, TrustPersistence, TrustStore};

pub use chatservice_shared::{Identity, Message, OutgoingMessage, User};
