//! Trusted-user list.
//!
//! Trust binds a username to one specific public key. Lookups are linear and
//! the list tolerates duplicates; the same username may be trusted under
//! several keys, in which case a message verifying under any of them counts
//! as trusted.
//!
//! The store is owned by a single session and is not synchronised. Callers
//! that read it from several threads must add their own locking.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use chatservice_shared::constants::DEFAULT_TRUST_FILE;
use chatservice_shared::{Message, User};

use crate::error::TrustError;

/// Loads and saves the trusted-user list on behalf of a [`TrustStore`].
pub trait TrustPersistence: Send + Sync {
    /// Return the stored list, or an empty list if nothing was stored yet.
    fn load(&self) -> Result<Vec<User>, TrustError>;

    fn save(&self, users: &[User]) -> Result<(), TrustError>;
}

/// Persists the list as a JSON array of `{Username, PublicKey}` objects.
#[derive(Debug, Clone)]
pub struct JsonFileTrustPersistence {
    path: PathBuf,
}

impl JsonFileTrustPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileTrustPersistence {
    fn default() -> Self {
        Self::new(DEFAULT_TRUST_FILE)
    }
}

impl TrustPersistence for JsonFileTrustPersistence {
    fn load(&self) -> Result<Vec<User>, TrustError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No trust list on disk");
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.path)?;
        let users: Option<Vec<User>> = serde_json::from_str(&json)?;
        Ok(users.unwrap_or_default())
    }

    fn save(&self, users: &[User]) -> Result<(), TrustError> {
        let json = serde_json::to_string(users)?;
        std::fs::write(&self.path, json)?;
        info!(path = %self.path.display(), count = users.len(), "Saved trust list");
        Ok(())
    }
}

/// In-memory list of trusted users.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    users: Vec<User>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_users(users: Vec<User>) -> Self {
        Self { users }
    }

    /// Whether the exact (username, public key) pair is trusted.
    pub fn is_trusted(&self, user: &User) -> bool {
        self.users.iter().any(|u| u == user)
    }

    pub fn is_trusted_parts(&self, username: &str, public_key: &str) -> bool {
        self.users
            .iter()
            .any(|u| u.username == username && u.public_key == public_key)
    }

    /// Whether some trusted entry named like the message's creator has a key
    /// under which the message signature verifies.
    pub fn is_message_from_trusted_user(&self, message: &Message) -> bool {
        self.users
            .iter()
            .filter(|u| u.username == message.creator_name)
            .any(|u| message.verify_signature(&u.public_key))
    }

    pub fn trust_user(&mut self, user: User) {
        debug!(user = %user.username, "Trusting user");
        self.users.push(user);
    }

    pub fn trust_user_parts(&mut self, username: impl Into<String>, public_key: impl Into<String>) {
        self.trust_user(User::new(username, public_key));
    }

    /// Remove the first entry equal to `user`. Returns whether one was found.
    pub fn untrust_user(&mut self, user: &User) -> bool {
        match self.users.iter().position(|u| u == user) {
            Some(index) => {
                self.users.remove(index);
                debug!(user = %user.username, "Untrusted user");
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Replace the current list with whatever `persistence` holds.
    pub fn load(&mut self, persistence: &dyn TrustPersistence) -> Result<(), TrustError> {
        self.users = persistence.load()?;
        debug!(count = self.users.len(), "Loaded trust list");
        Ok(())
    }

    pub fn save(&self, persistence: &dyn TrustPersistence) -> Result<(), TrustError> {
        persistence.save(&self.users)
    }
}
