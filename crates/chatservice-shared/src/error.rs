use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid key encoding: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid key bytes")]
    InvalidKeyBytes,
}

/// Faults on the live-update line protocol. Any of these ends the current
/// connection; the live-update loop then reconnects.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Server sent an empty line")]
    EmptyLine,

    #[error("Command {0} requires a payload")]
    MissingPayload(&'static str),

    #[error("Malformed {command} payload: {source}")]
    MalformedPayload {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error("Line is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
