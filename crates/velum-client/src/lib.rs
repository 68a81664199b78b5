//! # velum-client
//!
//! Client-side messaging core for velum.
//!
//! Composes the [`velum_crypto`] primitives into a per-viewer chat
//! session: sends are sealed for the recipient, dispatched through a
//! [`boundary::Relay`], and shown optimistically; fetched history is
//! opened with the viewer's private key and merged with the
//! optimistic copies into one ordered, de-duplicated view.
//!
//! The transport, authentication, and storage behind the
//! [`boundary::Directory`] and [`boundary::Relay`] traits are the
//! hosting application's concern.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut session = ChatSession::new("alice", private_key, directory, relay);
//!
//! // visible immediately under a provisional id
//! let sent = session.send("bob", "hi bob").await?;
//! assert!(sent.decryption_succeeded());
//!
//! // merged, ordered view; the relay echo supersedes the optimistic copy
//! let view = session.refresh().await?;
//! ```

pub mod boundary;
pub mod error;
pub mod message;
pub mod reconcile;
pub mod session;

// Re-export commonly used types
pub use boundary::{Directory, Relay};
pub use error::{ClientError, ClientResult};
pub use message::{DisplayMessage, MessageBody, MessageId, PendingMessage, ServerMessage};
pub use reconcile::Reconciler;
pub use session::ChatSession;
