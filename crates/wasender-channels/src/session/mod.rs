//! The process-wide messaging session.
//!
//! Owns the client, the connection state machine and the event pump that
//! feeds client events into the machine. Every send in the process goes
//! through [`Session::send`], which allows one in-flight send at a time.

pub mod qr;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use wasender_core::config::SessionConfig;
use wasender_core::error::{Result, SenderError};
use wasender_core::traits::{MessagingClient, MessagingSession};
use wasender_core::types::{
    ConnectionSnapshot, ConnectionState, OutgoingMessage, SendReceipt, SessionEvent,
};

pub use state::ConnectionStateMachine;

pub struct Session {
    client: Arc<dyn MessagingClient>,
    machine: Arc<ConnectionStateMachine>,
    events: mpsc::UnboundedSender<SessionEvent>,
    send_lock: Mutex<()>,
    send_timeout: Duration,
    restart_delay: Duration,
    restarting: AtomicBool,
    pump: JoinHandle<()>,
}

impl Session {
    /// Wire a client to a fresh state machine.
    ///
    /// `events` / `events_rx` must be the channel the client emits on.
    pub fn new(
        client: Arc<dyn MessagingClient>,
        events: mpsc::UnboundedSender<SessionEvent>,
        events_rx: mpsc::UnboundedReceiver<SessionEvent>,
        config: &SessionConfig,
    ) -> Arc<Self> {
        let machine = Arc::new(ConnectionStateMachine::new());
        let pump = spawn_event_pump(Arc::clone(&machine), events_rx);

        Arc::new(Self {
            client,
            machine,
            events,
            send_lock: Mutex::new(()),
            send_timeout: Duration::from_secs(config.send_timeout_secs.max(1)),
            restart_delay: Duration::from_millis(config.restart_delay_ms),
            restarting: AtomicBool::new(false),
            pump,
        })
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.machine.subscribe()
    }

    /// Connect the client. A failed connect is reported as a disconnect.
    pub async fn start(&self) -> Result<()> {
        tracing::info!("Starting {} session...", self.client.name());
        if let Err(e) = self.client.connect().await {
            tracing::error!("Session connect failed: {e}");
            self.emit(SessionEvent::Disconnected(format!("connect failed: {e}")));
            return Err(e);
        }
        Ok(())
    }

    /// Tear the session down now and re-initialize it after the configured
    /// delay. Returns `false` if a restart is already in progress.
    pub async fn restart(self: &Arc<Self>) -> bool {
        if self.restarting.swap(true, Ordering::SeqCst) {
            tracing::info!("Restart already in progress");
            return false;
        }

        if let Err(e) = self.client.disconnect().await {
            tracing::warn!("Error while tearing session down: {e}");
        }
        self.emit(SessionEvent::Disconnected("restart requested".into()));

        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(session.restart_delay).await;
            session.emit(SessionEvent::Reinitializing);
            let _ = session.start().await;
            session.restarting.store(false, Ordering::SeqCst);
        });
        true
    }

    /// Disconnect without re-initializing (process shutdown).
    pub async fn shutdown(&self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::warn!("Error during session shutdown: {e}");
        }
        self.emit(SessionEvent::Disconnected("shutdown".into()));
    }

    /// Wait until the session reaches `state`, up to `timeout`.
    pub async fn wait_for(&self, state: ConnectionState, timeout: Duration) -> bool {
        let mut rx = self.machine.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|snap| snap.state == state))
            .await
            .is_ok_and(|r| r.is_ok())
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("Session event pump is gone; event dropped");
        }
    }
}

#[async_trait]
impl MessagingSession for Session {
    fn snapshot(&self) -> ConnectionSnapshot {
        self.machine.snapshot()
    }

    async fn send(&self, message: OutgoingMessage) -> Result<SendReceipt> {
        let _guard = self.send_lock.lock().await;

        let state = self.machine.state();
        if state != ConnectionState::Ready {
            return Err(SenderError::SessionNotReady(format!("session is {state}")));
        }

        match tokio::time::timeout(self.send_timeout, self.client.send_message(&message)).await {
            Ok(result) => result,
            Err(_) => Err(SenderError::Timeout(format!(
                "send to {} exceeded {}s",
                message.to,
                self.send_timeout.as_secs()
            ))),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// The only consumer of client events; renders pairing codes before they
/// reach the state machine.
fn spawn_event_pump(
    machine: Arc<ConnectionStateMachine>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::PairingCode(raw) => {
                    let data_url = match qr::render_data_url(&raw, qr::DEFAULT_QR_SIZE) {
                        Ok(url) => Some(url),
                        Err(e) => {
                            tracing::warn!("Could not render pairing QR: {e}");
                            None
                        }
                    };
                    machine.on_pairing_artifact(raw, data_url);
                }
                other => {
                    machine.apply(other);
                }
            }
        }
        tracing::debug!("Session event channel closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dry_run::DryRunClient;
    use std::sync::atomic::AtomicUsize;
    use wasender_core::types::ChatAddress;

    fn test_config() -> SessionConfig {
        SessionConfig {
            backend: "dry-run".into(),
            restart_delay_ms: 10,
            send_timeout_secs: 5,
            ..SessionConfig::default()
        }
    }

    fn dry_run_session() -> Arc<Session> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(DryRunClient::new(tx.clone()));
        Session::new(client, tx, rx, &test_config())
    }

    fn message(n: &str) -> OutgoingMessage {
        OutgoingMessage::text(ChatAddress::parse(n, "55").unwrap(), "hello")
    }

    /// Records the maximum number of overlapping sends.
    struct SlowClient {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl MessagingClient for SlowClient {
        fn name(&self) -> &str { "slow" }
        async fn connect(&self) -> Result<()> { Ok(()) }
        async fn disconnect(&self) -> Result<()> { Ok(()) }
        async fn send_message(&self, _message: &OutgoingMessage) -> Result<SendReceipt> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(SendReceipt::default())
        }
    }

    #[tokio::test]
    async fn test_start_reaches_ready() {
        let session = dry_run_session();
        session.start().await.unwrap();
        assert!(session.wait_for(ConnectionState::Ready, Duration::from_secs(1)).await);
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_send_rejected_until_ready() {
        let session = dry_run_session();
        let err = session.send(message("11988887777")).await.unwrap_err();
        assert!(matches!(err, SenderError::SessionNotReady(_)));

        session.start().await.unwrap();
        assert!(session.wait_for(ConnectionState::Ready, Duration::from_secs(1)).await);
        let receipt = session.send(message("11988887777")).await.unwrap();
        assert!(receipt.message_id.is_some());
    }

    #[tokio::test]
    async fn test_pairing_code_is_rendered() {
        let session = dry_run_session();
        session.emit(SessionEvent::PairingCode("2@pairing-payload".into()));
        assert!(session.wait_for(ConnectionState::PairingPending, Duration::from_secs(1)).await);
        let pairing = session.snapshot().pairing.unwrap();
        assert_eq!(pairing.raw, "2@pairing-payload");
        assert!(pairing.data_url.unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_restart_cycles_back_to_ready() {
        let session = dry_run_session();
        session.start().await.unwrap();
        assert!(session.wait_for(ConnectionState::Ready, Duration::from_secs(1)).await);

        let mut rx = session.subscribe();
        assert!(session.restart().await);
        rx.wait_for(|s| s.state == ConnectionState::Disconnected).await.unwrap();
        assert!(session.wait_for(ConnectionState::Ready, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_serialized() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(SlowClient {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            sent: AtomicUsize::new(0),
        });
        let session = Session::new(client.clone(), tx.clone(), rx, &test_config());
        tx.send(SessionEvent::Ready).unwrap();
        assert!(session.wait_for(ConnectionState::Ready, Duration::from_secs(1)).await);

        let mut handles = vec![];
        for i in 0..8 {
            let s = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                s.send(message(&format!("1198888777{i}"))).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(client.sent.load(Ordering::SeqCst), 8);
        assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_after_disconnect_fails() {
        let session = dry_run_session();
        session.start().await.unwrap();
        assert!(session.wait_for(ConnectionState::Ready, Duration::from_secs(1)).await);
        session.shutdown().await;
        assert!(session.wait_for(ConnectionState::Disconnected, Duration::from_secs(1)).await);
        assert!(session.send(message("11988887777")).await.is_err());
    }
}
