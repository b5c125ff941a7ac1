//! Dry-run client — logs messages instead of delivering them.
//!
//! Useful for rehearsing a batch (delays, templates, reports) without a
//! paired phone. Connecting reports the session ready immediately.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use wasender_core::error::{Result, SenderError};
use wasender_core::traits::MessagingClient;
use wasender_core::types::{OutgoingMessage, SendReceipt, SessionEvent};

pub struct DryRunClient {
    events: mpsc::UnboundedSender<SessionEvent>,
    connected: AtomicBool,
    counter: AtomicU64,
}

impl DryRunClient {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            connected: AtomicBool::new(false),
            counter: AtomicU64::new(0),
        }
    }

    /// Number of messages "sent" so far.
    pub fn sent_count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl MessagingClient for DryRunClient {
    fn name(&self) -> &str { "dry-run" }

    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!("Dry-run client connected; messages will only be logged");
        self.emit(SessionEvent::Authenticated);
        self.emit(SessionEvent::Ready);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.emit(SessionEvent::Disconnected("dry-run client stopped".into()));
        }
        Ok(())
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<SendReceipt> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SenderError::SessionDisconnected("dry-run client is not connected".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            "[dry-run] #{n} → {} ({} chars{})",
            message.to,
            message.body.chars().count(),
            match &message.attachment {
                Some(a) if a.is_image() => ", with image",
                Some(_) => ", with attachment",
                None => "",
            }
        );
        Ok(SendReceipt {
            message_id: Some(format!("dry-run-{n}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasender_core::types::ChatAddress;

    #[tokio::test]
    async fn test_connect_emits_ready() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = DryRunClient::new(tx);
        client.connect().await.unwrap();
        assert_eq!(rx.recv().await, Some(SessionEvent::Authenticated));
        assert_eq!(rx.recv().await, Some(SessionEvent::Ready));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let client = DryRunClient::new(tx);
        let msg = OutgoingMessage::text(ChatAddress::parse("11988887777", "55").unwrap(), "hi");

        assert!(client.send_message(&msg).await.is_err());
        client.connect().await.unwrap();
        let receipt = client.send_message(&msg).await.unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("dry-run-1"));
        assert_eq!(client.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_emits_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = DryRunClient::new(tx);
        client.connect().await.unwrap();
        client.disconnect().await.unwrap();
        client.disconnect().await.unwrap();

        let mut disconnects = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, SessionEvent::Disconnected(_)) {
                disconnects += 1;
            }
        }
        assert_eq!(disconnects, 1);
    }
}
