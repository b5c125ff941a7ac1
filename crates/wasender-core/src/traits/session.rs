//! The shared session seen by senders (HTTP handlers and the scheduler).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ConnectionSnapshot, OutgoingMessage, SendReceipt};

/// Process-wide messaging session.
#[async_trait]
pub trait MessagingSession: Send + Sync {
    /// Current connection state; never blocks.
    fn snapshot(&self) -> ConnectionSnapshot;

    fn is_ready(&self) -> bool {
        self.snapshot().is_ready()
    }

    /// Send through the single serialized send path. Fails with
    /// `SessionNotReady` unless the session is ready.
    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt>;
}
