//! Reconciliation of relay history with optimistic local sends.
//!
//! The relay is append-only and eventually consistent: a message may
//! show up in a later fetch that was absent earlier, but never
//! disappears. The reconciler folds the authoritative list and the
//! not-yet-confirmed local sends into one ordered, de-duplicated view.
//!
//! Outgoing envelopes are sealed for the recipient, so the relay echo
//! of the viewer's own message cannot be opened with the viewer's
//! private key. The reconciler keeps the plaintext of every local
//! send and substitutes it whenever the echo fails to open, so the
//! sender's history stays readable across passes.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;
use velum_crypto::{open_from_text, PrivateKey};

use crate::message::{DisplayMessage, MessageBody, MessageId, PendingMessage, ServerMessage};

/// Session-scoped merge state for one viewer.
///
/// Owned by exactly one chat session; the mutating operations take
/// `&mut self`, which keeps [`Self::record_pending`] and
/// [`Self::reconcile`] serialized. Two viewers must never share an
/// instance.
#[derive(Debug)]
pub struct Reconciler {
    viewer: String,
    pending: Vec<PendingMessage>,
    /// Plaintext of local sends, keyed by dispatched envelope text.
    /// Consulted when a relay echo cannot be opened with our key.
    known_bodies: HashMap<String, String>,
}

impl Reconciler {
    /// Create reconciliation state for one viewer.
    pub fn new(viewer: impl Into<String>) -> Self {
        Self {
            viewer: viewer.into(),
            pending: Vec::new(),
            known_bodies: HashMap::new(),
        }
    }

    /// The viewer this state belongs to.
    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    /// Number of sends still awaiting relay confirmation.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Record an optimistic copy of a just-dispatched send.
    ///
    /// Returns a display entry with a provisional id and the known
    /// plaintext, visible to the sender without waiting for the relay
    /// round trip.
    pub fn record_pending(
        &mut self,
        recipient: impl Into<String>,
        body: impl Into<String>,
        envelope: impl Into<String>,
    ) -> DisplayMessage {
        let pending = PendingMessage {
            local_id: Uuid::new_v4(),
            sender: self.viewer.clone(),
            recipient: recipient.into(),
            body: body.into(),
            envelope: envelope.into(),
            timestamp: Utc::now(),
            server_id: None,
        };

        debug!(id = %MessageId::Pending(pending.local_id), recipient = %pending.recipient, "Recorded pending message");

        self.known_bodies
            .insert(pending.envelope.clone(), pending.body.clone());
        let display = display_of_pending(&pending);
        self.pending.push(pending);
        display
    }

    /// Note the relay-assigned id for a pending send.
    ///
    /// The pending copy is dropped once that id shows up in a fetched
    /// history (see [`Self::reconcile`]).
    pub fn confirm_send(&mut self, local_id: Uuid, server_id: i64) {
        if let Some(pending) = self.pending.iter_mut().find(|p| p.local_id == local_id) {
            pending.server_id = Some(server_id);
        }
    }

    /// Merge the authoritative relay history with surviving pending
    /// sends into one ordered, de-duplicated view.
    ///
    /// Every server envelope is opened with `key`; a message that
    /// fails to open degrades to an undecryptable entry and never
    /// aborts the pass. A pending send is discarded once the history
    /// contains its acknowledged id or its exact envelope text -
    /// envelopes are unique per seal, so equality identifies the echo
    /// even if the acknowledgment was lost.
    pub fn reconcile(
        &mut self,
        server_messages: &[ServerMessage],
        key: &PrivateKey,
    ) -> Vec<DisplayMessage> {
        let mut merged: Vec<DisplayMessage> = server_messages
            .iter()
            .map(|message| self.open_server_message(message, key))
            .collect();

        let confirmed_ids: HashSet<i64> = server_messages.iter().map(|m| m.id).collect();
        let envelopes: HashSet<&str> =
            server_messages.iter().map(|m| m.envelope.as_str()).collect();

        let viewer = self.viewer.clone();
        self.pending.retain(|pending| {
            if pending.sender != viewer || pending.recipient == viewer {
                return false;
            }
            let superseded = pending
                .server_id
                .is_some_and(|id| confirmed_ids.contains(&id))
                || envelopes.contains(pending.envelope.as_str());
            if superseded {
                debug!(id = %MessageId::Pending(pending.local_id), "Pending message superseded by relay history");
            }
            !superseded
        });

        merged.extend(self.pending.iter().map(display_of_pending));
        merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        merged
    }

    fn open_server_message(&self, message: &ServerMessage, key: &PrivateKey) -> DisplayMessage {
        let body = match open_from_text(key, &message.envelope) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => MessageBody::Plaintext(text),
                Err(_) => {
                    warn!(id = message.id, "Decrypted body is not valid UTF-8");
                    MessageBody::Undecryptable
                }
            },
            // our own echoes are sealed for the recipient; fall back to
            // the plaintext recorded at send time
            Err(err) => match self.known_bodies.get(&message.envelope) {
                Some(known) => MessageBody::Plaintext(known.clone()),
                None => {
                    warn!(id = message.id, error = %err, "Failed to open envelope");
                    MessageBody::Undecryptable
                }
            },
        };

        DisplayMessage {
            id: MessageId::Confirmed(message.id),
            sender: message.sender.clone(),
            recipient: message.recipient.clone(),
            body,
            timestamp: message.timestamp,
        }
    }
}

fn display_of_pending(pending: &PendingMessage) -> DisplayMessage {
    DisplayMessage {
        id: MessageId::Pending(pending.local_id),
        sender: pending.sender.clone(),
        recipient: pending.recipient.clone(),
        body: MessageBody::Plaintext(pending.body.clone()),
        timestamp: pending.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::OnceLock;
    use velum_crypto::{seal_to_text, Keypair};

    fn viewer_keys() -> &'static Keypair {
        static KP: OnceLock<Keypair> = OnceLock::new();
        KP.get_or_init(|| Keypair::generate().unwrap())
    }

    fn peer_keys() -> &'static Keypair {
        static KP: OnceLock<Keypair> = OnceLock::new();
        KP.get_or_init(|| Keypair::generate().unwrap())
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    /// A message from `sender` sealed for the viewer.
    fn inbound(id: i64, sender: &str, body: &str, seconds: i64) -> ServerMessage {
        ServerMessage {
            id,
            sender: sender.to_string(),
            recipient: "alice".to_string(),
            envelope: seal_to_text(&viewer_keys().public, body.as_bytes()).unwrap(),
            timestamp: at(seconds),
        }
    }

    #[test]
    fn test_reconcile_opens_inbound_messages() {
        let mut reconciler = Reconciler::new("alice");
        let server = vec![inbound(1, "bob", "hello alice", 0)];

        let view = reconciler.reconcile(&server, &viewer_keys().private);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, MessageId::Confirmed(1));
        assert_eq!(view[0].body, MessageBody::Plaintext("hello alice".to_string()));
    }

    #[test]
    fn test_partial_failure_isolation() {
        let mut reconciler = Reconciler::new("alice");
        let server = vec![
            inbound(1, "bob", "first", 0),
            ServerMessage {
                id: 2,
                sender: "bob".to_string(),
                recipient: "alice".to_string(),
                envelope: "corrupted garbage".to_string(),
                timestamp: at(1),
            },
            inbound(3, "bob", "third", 2),
        ];

        let view = reconciler.reconcile(&server, &viewer_keys().private);

        assert_eq!(view.len(), 3);
        assert!(view[0].decryption_succeeded());
        assert!(!view[1].decryption_succeeded());
        assert_eq!(view[1].body, MessageBody::Undecryptable);
        assert!(view[2].decryption_succeeded());
    }

    #[test]
    fn test_record_pending_immediately_visible() {
        let mut reconciler = Reconciler::new("alice");
        let display = reconciler.record_pending("bob", "hi bob", "envelope-text");

        assert!(matches!(display.id, MessageId::Pending(_)));
        assert_eq!(display.sender, "alice");
        assert_eq!(display.body, MessageBody::Plaintext("hi bob".to_string()));

        let view = reconciler.reconcile(&[], &viewer_keys().private);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0], display);
    }

    #[test]
    fn test_pending_superseded_by_acknowledged_id() {
        let mut reconciler = Reconciler::new("alice");

        // sealed for bob, so alice cannot open the echo
        let envelope = seal_to_text(&peer_keys().public, b"hi bob").unwrap();
        let display = reconciler.record_pending("bob", "hi bob", envelope.clone());
        let MessageId::Pending(local_id) = display.id else {
            panic!("expected pending id");
        };
        reconciler.confirm_send(local_id, 5);

        let server = vec![ServerMessage {
            id: 5,
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            envelope,
            timestamp: at(0),
        }];

        let view = reconciler.reconcile(&server, &viewer_keys().private);

        // exactly one entry, carrying the server id and the known plaintext
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, MessageId::Confirmed(5));
        assert_eq!(view[0].body, MessageBody::Plaintext("hi bob".to_string()));
        assert_eq!(reconciler.pending_len(), 0);
    }

    #[test]
    fn test_pending_superseded_by_envelope_match_without_ack() {
        let mut reconciler = Reconciler::new("alice");

        let envelope = seal_to_text(&peer_keys().public, b"hi bob").unwrap();
        // the acknowledgment was lost: no confirm_send
        reconciler.record_pending("bob", "hi bob", envelope.clone());

        let server = vec![ServerMessage {
            id: 9,
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            envelope,
            timestamp: at(0),
        }];

        let view = reconciler.reconcile(&server, &viewer_keys().private);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, MessageId::Confirmed(9));
        assert_eq!(reconciler.pending_len(), 0);
    }

    #[test]
    fn test_pending_survives_until_echoed() {
        let mut reconciler = Reconciler::new("alice");
        let envelope = seal_to_text(&peer_keys().public, b"hi bob").unwrap();
        reconciler.record_pending("bob", "hi bob", envelope);

        // relay has not echoed the send yet
        let server = vec![inbound(1, "bob", "unrelated", 0)];
        let view = reconciler.reconcile(&server, &viewer_keys().private);

        assert_eq!(view.len(), 2);
        assert_eq!(reconciler.pending_len(), 1);
    }

    #[test]
    fn test_reconcile_idempotent() {
        let mut reconciler = Reconciler::new("alice");

        let envelope = seal_to_text(&peer_keys().public, b"hi bob").unwrap();
        let display = reconciler.record_pending("bob", "hi bob", envelope.clone());
        let MessageId::Pending(local_id) = display.id else {
            panic!("expected pending id");
        };
        reconciler.confirm_send(local_id, 2);

        let server = vec![
            inbound(1, "bob", "hello", 0),
            ServerMessage {
                id: 2,
                sender: "alice".to_string(),
                recipient: "bob".to_string(),
                envelope,
                timestamp: at(1),
            },
        ];

        let first = reconciler.reconcile(&server, &viewer_keys().private);
        let second = reconciler.reconcile(&server, &viewer_keys().private);

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_pending_to_self_never_shown_after_merge() {
        let mut reconciler = Reconciler::new("alice");
        reconciler.record_pending("alice", "note to self", "self-envelope");

        let view = reconciler.reconcile(&[], &viewer_keys().private);
        assert!(view.is_empty());
        assert_eq!(reconciler.pending_len(), 0);
    }

    #[test]
    fn test_ordering_by_timestamp_then_id() {
        let mut reconciler = Reconciler::new("alice");
        let server = vec![
            inbound(3, "bob", "same instant, higher id", 5),
            inbound(1, "bob", "earlier", 0),
            inbound(2, "bob", "same instant, lower id", 5),
        ];

        let view = reconciler.reconcile(&server, &viewer_keys().private);

        let ids: Vec<MessageId> = view.iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![
                MessageId::Confirmed(1),
                MessageId::Confirmed(2),
                MessageId::Confirmed(3)
            ]
        );
    }

    #[test]
    fn test_pending_sorts_after_confirmed_at_same_timestamp() {
        let mut reconciler = Reconciler::new("alice");
        let pending_display = reconciler.record_pending("bob", "optimistic", "pending-envelope");

        let mut server_msg = inbound(1, "bob", "confirmed", 0);
        server_msg.timestamp = pending_display.timestamp;

        let view = reconciler.reconcile(&[server_msg], &viewer_keys().private);

        assert_eq!(view.len(), 2);
        assert!(view[0].id.is_confirmed());
        assert!(!view[1].id.is_confirmed());
    }

    #[test]
    fn test_sender_history_stays_readable_across_passes() {
        let mut reconciler = Reconciler::new("alice");
        let envelope = seal_to_text(&peer_keys().public, b"hi bob").unwrap();
        reconciler.record_pending("bob", "hi bob", envelope.clone());

        let server = vec![ServerMessage {
            id: 4,
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            envelope,
            timestamp: at(0),
        }];

        // pending is merged away on the first pass; the plaintext must
        // still back the echo on every later pass
        reconciler.reconcile(&server, &viewer_keys().private);
        let later = reconciler.reconcile(&server, &viewer_keys().private);

        assert_eq!(later.len(), 1);
        assert_eq!(later[0].body, MessageBody::Plaintext("hi bob".to_string()));
    }
}
