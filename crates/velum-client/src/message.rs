//! Message records and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Identifier of a logical message.
///
/// Relay-confirmed messages carry integer ids assigned by the server;
/// a locally-originated message carries a provisional token until the
/// relay echoes it back. Keeping the two in distinct variants makes
/// supersession an explicit transition and rules out any collision
/// between the namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MessageId {
    /// Relay-assigned id.
    Confirmed(i64),
    /// Client-generated provisional id, never seen by the relay.
    Pending(Uuid),
}

impl MessageId {
    /// Whether this id was assigned by the relay.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

// Confirmed history is authoritative, so at equal timestamps confirmed
// entries sort ahead of provisional ones.
impl Ord for MessageId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Confirmed(a), Self::Confirmed(b)) => a.cmp(b),
            (Self::Pending(a), Self::Pending(b)) => a.cmp(b),
            (Self::Confirmed(_), Self::Pending(_)) => Ordering::Less,
            (Self::Pending(_), Self::Confirmed(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for MessageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed(id) => write!(f, "msg-{}", id),
            Self::Pending(token) => write!(f, "tmp-{}", token),
        }
    }
}

/// Transport record as returned by the relay.
///
/// The envelope travels as opaque text; the relay never holds
/// plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Relay-assigned id.
    pub id: i64,
    /// Sender identity.
    pub sender: String,
    /// Recipient identity.
    pub recipient: String,
    /// Sealed envelope in compact text form.
    pub envelope: String,
    /// Relay-assigned timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Local-only record of an optimistic send awaiting relay confirmation.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    /// Provisional id.
    pub local_id: Uuid,
    /// Sender identity (the session viewer).
    pub sender: String,
    /// Recipient identity.
    pub recipient: String,
    /// Plaintext body - the sender already knows it, no decryption needed.
    pub body: String,
    /// The envelope text as dispatched, used to recognize the relay echo.
    pub envelope: String,
    /// Local send time.
    pub timestamp: DateTime<Utc>,
    /// Relay-assigned id, filled in once the send was acknowledged.
    pub server_id: Option<i64>,
}

/// Body of a display entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Recovered (or locally known) plaintext.
    Plaintext(String),
    /// The envelope could not be opened with the session's key.
    Undecryptable,
}

impl MessageBody {
    /// Whether readable plaintext is available.
    pub fn decryption_succeeded(&self) -> bool {
        matches!(self, Self::Plaintext(_))
    }

    /// Text to show for this body, with an opaque marker for failures.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Plaintext(text) => text,
            Self::Undecryptable => "[unable to decrypt]",
        }
    }
}

/// One entry of the merged conversation view.
///
/// Derived, never persisted; rebuilt on every reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    /// Provisional or relay-assigned id.
    pub id: MessageId,
    /// Sender identity.
    pub sender: String,
    /// Recipient identity.
    pub recipient: String,
    /// Plaintext or failure marker.
    pub body: MessageBody,
    /// Message timestamp.
    pub timestamp: DateTime<Utc>,
}

impl DisplayMessage {
    /// Whether this entry carries readable plaintext.
    pub fn decryption_succeeded(&self) -> bool {
        self.body.decryption_succeeded()
    }
}
