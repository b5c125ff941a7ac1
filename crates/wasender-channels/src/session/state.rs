//! Connection state machine for the messaging session.
//!
//! ```text
//! Uninitialized ──qr──▶ PairingPending ──authenticated──▶ Authenticated ──ready──▶ Ready
//!       ▲                                                                          │
//!       └── reinitialize ── Disconnected ◀──────── disconnected (any state) ───────┘
//! ```
//!
//! The state lives in a `watch` channel: readers clone the latest snapshot
//! without waiting on the writer, and the machine is the only writer.

use chrono::Utc;
use tokio::sync::watch;

use wasender_core::types::{ConnectionSnapshot, ConnectionState, PairingArtifact, SessionEvent};

pub struct ConnectionStateMachine {
    tx: watch::Sender<ConnectionSnapshot>,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionSnapshot::default());
        Self { tx }
    }

    /// Latest state plus the pending pairing artifact, if any.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.tx.borrow().state
    }

    /// Receiver that observes every transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.tx.subscribe()
    }

    /// A new pairing code replaces any previous one.
    pub fn on_pairing_artifact(&self, raw: String, data_url: Option<String>) -> bool {
        self.transition("pairing", |snap| {
            snap.state = ConnectionState::PairingPending;
            snap.pairing = Some(PairingArtifact {
                raw,
                data_url,
                issued_at: Utc::now(),
            });
        })
    }

    pub fn on_authenticated(&self) -> bool {
        self.transition("authenticated", |snap| {
            snap.state = ConnectionState::Authenticated;
            snap.pairing = None;
        })
    }

    pub fn on_ready(&self) -> bool {
        self.transition("ready", |snap| {
            snap.state = ConnectionState::Ready;
            snap.pairing = None;
            snap.last_error = None;
        })
    }

    /// Accepted from every state.
    pub fn on_disconnected(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Session disconnected: {reason}");
        self.tx.send_modify(|snap| {
            snap.state = ConnectionState::Disconnected;
            snap.pairing = None;
            snap.last_error = Some(reason);
            snap.changed_at = Utc::now();
        });
    }

    /// Explicit re-init: the only way out of `Disconnected`.
    pub fn on_reinitializing(&self) {
        tracing::info!("Session re-initializing");
        self.tx.send_modify(|snap| {
            snap.state = ConnectionState::Uninitialized;
            snap.pairing = None;
            snap.changed_at = Utc::now();
        });
    }

    /// Apply a client event. Pairing codes must already be rendered by the
    /// caller, so they go through [`Self::on_pairing_artifact`] instead.
    pub fn apply(&self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::PairingCode(raw) => self.on_pairing_artifact(raw, None),
            SessionEvent::Authenticated => self.on_authenticated(),
            SessionEvent::Ready => self.on_ready(),
            SessionEvent::Disconnected(reason) => {
                self.on_disconnected(reason);
                true
            }
            SessionEvent::Reinitializing => {
                self.on_reinitializing();
                true
            }
        }
    }

    /// Event-driven transition; ignored while disconnected until re-init.
    fn transition(&self, event: &str, update: impl FnOnce(&mut ConnectionSnapshot)) -> bool {
        let applied = self.tx.send_if_modified(|snap| {
            if snap.state == ConnectionState::Disconnected {
                return false;
            }
            let from = snap.state;
            update(snap);
            snap.changed_at = Utc::now();
            tracing::info!("Session {from} → {} ({event})", snap.state);
            true
        });
        if !applied {
            tracing::warn!("Ignoring '{event}' event while disconnected; restart the session first");
        }
        applied
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self { Self::new() }
}
