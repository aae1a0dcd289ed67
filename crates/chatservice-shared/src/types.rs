use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;

/// A channel message as stored and returned by the server.
///
/// The signature is never trusted on its own; call
/// [`Message::verify_signature`] with a candidate public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    /// Server-assigned identifier
    #[serde(rename = "MessageId")]
    pub id: String,
    pub creator_name: String,
    pub text: String,
    /// Unix timestamp (seconds) assigned by the server
    pub created_at: i64,
    /// Base64 signature of `text`
    pub signature: String,
}

impl Message {
    /// Check the signature against a candidate public key
    pub fn verify_signature(&self, public_key: &str) -> bool {
        identity::verify(public_key, &self.signature, &self.text)
    }

    /// Whether this message carries a signature from the given identity
    pub fn was_sent_by(&self, identity: &identity::Identity) -> bool {
        self.verify_signature(&identity.public_key())
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }
}

/// Body of a send-message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutgoingMessage {
    pub creator_name: String,
    pub text: String,
    pub signature: String,
}

impl OutgoingMessage {
    /// Compose a message signed by `identity`
    pub fn signed(identity: &identity::Identity, creator_name: &str, text: &str) -> Self {
        Self {
            creator_name: creator_name.to_string(),
            text: text.to_string(),
            signature: identity.sign(text),
        }
    }
}

/// A chat user: a name bound to a public key.
///
/// Equality compares both fields. Ordering is by username (byte-wise), then
/// by public key so that it stays consistent with equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub username: String,
    pub public_key: String,
}

impl User {
    pub fn new(username: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            public_key: public_key.into(),
        }
    }

    /// Whether this user is the given local identity
    pub fn is_identity(&self, username: &str, public_key: &str) -> bool {
        self.username == username && self.public_key == public_key
    }
}

impl Ord for User {
    fn cmp(&self, other: &Self) -> Ordering {
        self.username
            .as_bytes()
            .cmp(other.username.as_bytes())
            .then_with(|| self.public_key.cmp(&other.public_key))
    }
}

impl PartialOrd for User {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.username)
    }
}
