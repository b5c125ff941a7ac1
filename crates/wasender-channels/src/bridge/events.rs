//! Event frames pushed by the bridge over its WebSocket.
//!
//! ```json
//! {"event":"qr","qr":"2@..."}
//! {"event":"pairing_code","code":"ABCD-EFGH"}
//! {"event":"authenticated"}
//! {"event":"auth_failure","message":"..."}
//! {"event":"ready"}
//! {"event":"disconnected","reason":"LOGOUT"}
//! ```

use serde::Deserialize;

use wasender_core::types::SessionEvent;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum BridgeFrame {
    Qr { qr: String },
    PairingCode { code: String },
    Authenticated,
    AuthFailure {
        #[serde(default)]
        message: Option<String>,
    },
    Ready,
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Translate one text frame. Unknown or malformed frames yield `None`.
pub fn parse_frame(text: &str) -> Option<SessionEvent> {
    let frame: BridgeFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!("Ignoring bridge frame ({e}): {}", text.chars().take(120).collect::<String>());
            return None;
        }
    };

    Some(match frame {
        BridgeFrame::Qr { qr } => SessionEvent::PairingCode(qr),
        BridgeFrame::PairingCode { code } => SessionEvent::PairingCode(code),
        BridgeFrame::Authenticated => SessionEvent::Authenticated,
        BridgeFrame::AuthFailure { message } => SessionEvent::Disconnected(format!(
            "authentication failed: {}",
            message.unwrap_or_else(|| "unknown".into())
        )),
        BridgeFrame::Ready => SessionEvent::Ready,
        BridgeFrame::Disconnected { reason } => {
            SessionEvent::Disconnected(reason.unwrap_or_else(|| "disconnected".into()))
        }
    })
}
