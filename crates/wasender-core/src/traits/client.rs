//! Messaging client trait — the transport to the messaging network.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{OutgoingMessage, SendReceipt};

/// Transport to the messaging network.
///
/// Implementations report lifecycle changes as [`SessionEvent`]s on the
/// event sender they were built with; they never track connection state
/// themselves.
///
/// [`SessionEvent`]: crate::types::SessionEvent
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Client name (e.g., "bridge", "dry-run").
    fn name(&self) -> &str;

    /// Start (or restart) the underlying session.
    async fn connect(&self) -> Result<()>;

    /// Tear the session down.
    async fn disconnect(&self) -> Result<()>;

    /// Deliver one message. Must be bounded by the client's own timeout.
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SendReceipt>;
}
