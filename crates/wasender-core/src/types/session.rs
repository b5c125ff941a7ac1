//! Session lifecycle types shared by clients, the state machine and the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection state of the messaging session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    PairingPending,
    Authenticated,
    Ready,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Uninitialized => write!(f, "uninitialized"),
            ConnectionState::PairingPending => write!(f, "pairing_pending"),
            ConnectionState::Authenticated => write!(f, "authenticated"),
            ConnectionState::Ready => write!(f, "ready"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Lifecycle events emitted by a messaging client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new pairing code / QR payload is available.
    PairingCode(String),
    Authenticated,
    Ready,
    Disconnected(String),
    /// Explicit re-initialization; emitted by the session on restart, never
    /// by a client.
    Reinitializing,
}

/// The pending pairing code and its rendered form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PairingArtifact {
    /// Raw payload as emitted by the client.
    pub raw: String,
    /// PNG data URL for display, if rendering succeeded.
    pub data_url: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// Point-in-time copy of the connection state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub pairing: Option<PairingArtifact>,
    /// Reason of the last disconnect, cleared once ready again.
    pub last_error: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl ConnectionSnapshot {
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            state: ConnectionState::Uninitialized,
            pairing: None,
            last_error: None,
            changed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Ready.to_string(), "ready");
        assert_eq!(ConnectionState::PairingPending.to_string(), "pairing_pending");
    }

    #[test]
    fn test_default_snapshot() {
        let snap = ConnectionSnapshot::default();
        assert_eq!(snap.state, ConnectionState::Uninitialized);
        assert!(snap.pairing.is_none());
        assert!(!snap.is_ready());
    }
}
