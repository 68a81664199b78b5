//! Boundary traits for external collaborators.
//!
//! Transport, authentication, and storage belong to the application
//! hosting this crate; the core only fixes the shapes it depends on.
//! Implementations talk HTTP, websockets, or anything else - the
//! session never knows.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::message::ServerMessage;

/// Public-key directory.
///
/// Resolves an identity to its current public key. Staleness and
/// revocation are directory concerns, not handled here.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up an identity's public key in SPKI PEM form.
    async fn lookup(&self, identity: &str) -> ClientResult<String>;
}

/// Store-and-forward relay.
///
/// Append-only and eventually consistent: a message may show up in a
/// later fetch that was absent earlier, but never disappears. The
/// relay only ever carries envelope text.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Submit a sealed envelope for a recipient; returns the assigned
    /// message id.
    async fn send(&self, recipient: &str, envelope: &str) -> ClientResult<i64>;

    /// Fetch every message visible to the current viewer, sent and
    /// received, in relay order.
    async fn fetch(&self) -> ClientResult<Vec<ServerMessage>>;
}
