use thiserror::Error;

use chatservice_shared::IdentityError;

/// Failures of the request/response channel.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network failure or an unreadable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server responded {status}")]
    Status { status: u16 },

    /// The server reported an error in the response body (`{"Error": ...}`).
    #[error("Server error: {0}")]
    Server(String),

    /// The response body was not the expected JSON shape.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures loading or saving the trusted-user list.
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("Trust list IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trust list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by [`crate::ChatClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Already connected")]
    AlreadyConnected,

    #[error("Session has been shut down")]
    ShutDown,

    #[error("Failed to connect to chat service: {0}")]
    ConnectionFailed(#[source] TransportError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Trust(#[from] TrustError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
