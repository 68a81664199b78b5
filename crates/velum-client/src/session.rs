//! Chat session: composes the cipher, the boundaries, and the
//! reconciler for one viewer.

use tracing::debug;
use velum_crypto::{seal_to_text, PrivateKey, PublicKey};

use crate::boundary::{Directory, Relay};
use crate::error::{ClientError, ClientResult};
use crate::message::{DisplayMessage, MessageId};
use crate::reconcile::Reconciler;

/// An active chat session for one viewer.
///
/// Owns the viewer's private key and reconciliation state. The
/// mutating operations take `&mut self`: sends and refreshes are
/// serialized, and at most one fetch is in flight per session. Each
/// logged-in identity gets its own session; instances are never
/// shared between viewers.
pub struct ChatSession<D: Directory, R: Relay> {
    viewer: String,
    private_key: PrivateKey,
    directory: D,
    relay: R,
    reconciler: Reconciler,
}

impl<D: Directory, R: Relay> ChatSession<D, R> {
    /// Create a session for a viewer holding its private key.
    pub fn new(viewer: impl Into<String>, private_key: PrivateKey, directory: D, relay: R) -> Self {
        let viewer = viewer.into();
        let reconciler = Reconciler::new(viewer.clone());
        Self {
            viewer,
            private_key,
            directory,
            relay,
            reconciler,
        }
    }

    /// Create a session from an optionally-present stored key.
    ///
    /// A missing private key is a setup error: the session could fetch
    /// ciphertext but never read it, so it refuses to start.
    pub fn open(
        viewer: impl Into<String>,
        private_key: Option<PrivateKey>,
        directory: D,
        relay: R,
    ) -> ClientResult<Self> {
        let key = private_key.ok_or(ClientError::MissingPrivateKey)?;
        Ok(Self::new(viewer, key, directory, relay))
    }

    /// The viewer this session belongs to.
    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    /// Seal and dispatch a message, returning the optimistic display
    /// entry.
    ///
    /// The recipient's key comes from the directory on every send. On
    /// success the message is immediately visible to the sender under
    /// a provisional id; the relay echo supersedes it on a later
    /// [`Self::refresh`]. On failure nothing is recorded.
    pub async fn send(&mut self, recipient: &str, body: &str) -> ClientResult<DisplayMessage> {
        let pem = self.directory.lookup(recipient).await?;
        let recipient_key = PublicKey::from_pem(&pem)?;

        let envelope = seal_to_text(&recipient_key, body.as_bytes())?;
        let server_id = self.relay.send(recipient, &envelope).await?;
        debug!(server_id, recipient, "Message accepted by relay");

        let display = self.reconciler.record_pending(recipient, body, envelope);
        if let MessageId::Pending(local_id) = display.id {
            self.reconciler.confirm_send(local_id, server_id);
        }
        Ok(display)
    }

    /// Fetch the authoritative history and rebuild the merged view.
    ///
    /// A fetch failure surfaces to the caller and leaves the
    /// reconciliation state untouched; the next successful refresh
    /// picks up where this one left off.
    pub async fn refresh(&mut self) -> ClientResult<Vec<DisplayMessage>> {
        let server_messages = self.relay.fetch().await?;
        debug!(count = server_messages.len(), "Fetched relay history");
        Ok(self
            .reconciler
            .reconcile(&server_messages, &self.private_key))
    }

    /// Number of sends still awaiting relay confirmation.
    pub fn pending_len(&self) -> usize {
        self.reconciler.pending_len()
    }
}
