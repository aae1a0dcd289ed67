//! # chatservice-shared
//!
//! Types and pure logic shared by the chat client crates: the Ed25519
//! signature engine, the message/user data model and the live-update line
//! protocol. Nothing in here performs I/O.

pub mod constants;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod types;

pub use error::{IdentityError, ProtocolError};
pub use identity::Identity;
pub use protocol::ServerCommand;
pub use types::{Message, OutgoingMessage, User};
