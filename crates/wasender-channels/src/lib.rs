//! # WaSender Channels
//! Messaging clients and the process-wide session built on top of them.

pub mod bridge;
pub mod dry_run;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use wasender_core::config::SessionConfig;
use wasender_core::error::{Result, SenderError};
use wasender_core::traits::MessagingClient;
use wasender_core::types::SessionEvent;

pub use session::{ConnectionStateMachine, Session};

/// Create a messaging client from configuration.
pub fn create_client(
    config: &SessionConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<Arc<dyn MessagingClient>> {
    match config.backend.as_str() {
        "bridge" => {
            let bridge = bridge::BridgeClient::new(
                bridge::BridgeConfig {
                    base_url: config.bridge_url.clone(),
                    auth_dir: shellexpand::tilde(&config.auth_dir).to_string(),
                    send_timeout: Duration::from_secs(config.send_timeout_secs.max(1)),
                },
                events,
            )?;
            Ok(Arc::new(bridge))
        }
        "dry-run" => Ok(Arc::new(dry_run::DryRunClient::new(events))),
        other => Err(SenderError::config(format!("Unknown session backend: {other}"))),
    }
}

/// Build the client named in `config` and wire it into a new session.
/// The session is not started; call [`Session::start`].
pub fn open_session(config: &SessionConfig) -> Result<Arc<Session>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = create_client(config, tx.clone())?;
    Ok(Session::new(client, tx, rx, config))
}
