//! WhatsApp Web bridge client: REST for commands, WebSocket for events.
//!
//! The bridge is a sidecar process that owns the browser automation and the
//! local-auth credential store. This client only speaks its small API:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | start session | `POST /session/start` |
//! | stop session | `POST /session/stop` |
//! | send message | `POST /messages` |
//! | lifecycle events | `GET /session/events` (WebSocket) |
//!
//! The bridge replays its current state as the first frame of every event
//! stream, so a dropped stream is simply reconnected. The stream is opened
//! only after `POST /session/start` succeeds; opened earlier, it would replay
//! the stopped session's `disconnected` state into a fresh one.

pub mod events;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use wasender_core::error::{Result, SenderError};
use wasender_core::traits::MessagingClient;
use wasender_core::types::{Attachment, OutgoingMessage, SendReceipt, SessionEvent};

/// Bridge client configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub base_url: String,
    pub auth_dir: String,
    pub send_timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBody<'a> {
    chat_id: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<&'a Attachment>,
}

pub struct BridgeClient {
    base_url: String,
    auth_dir: String,
    http: reqwest::Client,
    events: mpsc::UnboundedSender<SessionEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeClient {
    pub fn new(config: BridgeConfig, events: mpsc::UnboundedSender<SessionEvent>) -> Result<Self> {
        url::Url::parse(&config.base_url)
            .map_err(|e| SenderError::config(format!("Invalid bridge URL '{}': {e}", config.base_url)))?;

        let http = reqwest::Client::builder()
            .timeout(config.send_timeout)
            .build()
            .map_err(|e| SenderError::channel(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_dir: config.auth_dir,
            http,
            events,
            listener: Mutex::new(None),
        })
    }

    /// WebSocket URL of the event stream (`http` → `ws`, `https` → `wss`).
    pub fn events_url(&self) -> Result<String> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| SenderError::config(format!("Invalid bridge URL: {e}")))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| SenderError::config(format!("Cannot derive WebSocket URL from {}", self.base_url)))?;
        url.set_path(&format!("{}/session/events", url.path().trim_end_matches('/')));
        Ok(url.to_string())
    }

    /// POST JSON and require `{"success": true, ...}` back.
    async fn post(&self, path: &str, body: &impl Serialize) -> Result<serde_json::Value> {
        let response = self.http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SenderError::Timeout(format!("bridge {path}: {e}"))
                } else {
                    SenderError::Http(format!("bridge {path}: {e}"))
                }
            })?;

        let status = response.status();
        let text = response.text().await
            .map_err(|e| SenderError::Http(format!("bridge {path} read error: {e}")))?;

        let reply: serde_json::Value = serde_json::from_str(&text).map_err(|_| {
            SenderError::channel(format!(
                "bridge {path} returned {status} with non-JSON body: {}",
                text.chars().take(200).collect::<String>()
            ))
        })?;

        if !status.is_success() || !reply["success"].as_bool().unwrap_or(false) {
            return Err(SenderError::channel(format!(
                "bridge {path} failed ({status}): {}",
                reply["error"].as_str().unwrap_or("unknown error")
            )));
        }
        Ok(reply)
    }

    async fn stop_listener(&self) {
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    fn name(&self) -> &str { "bridge" }

    async fn connect(&self) -> Result<()> {
        let ws_url = self.events_url()?;
        self.stop_listener().await;

        // The stream replays the bridge's current state, so it is only
        // opened once the new session exists.
        let body = serde_json::json!({ "authDir": self.auth_dir });
        self.post("/session/start", &body).await?;
        tracing::info!("Bridge session started at {}", self.base_url);

        let mut listener = self.listener.lock().await;
        if let Some(old) = listener.take() {
            old.abort();
        }
        *listener = Some(tokio::spawn(run_event_listener(ws_url, self.events.clone())));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.stop_listener().await;
        let result = self.post("/session/stop", &serde_json::json!({})).await;
        let _ = self.events.send(SessionEvent::Disconnected("session stopped".into()));
        result.map(|_| ())
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<SendReceipt> {
        let body = SendBody {
            chat_id: message.to.as_str(),
            content: &message.body,
            media: message.attachment.as_ref(),
        };

        let reply = self.post("/messages", &body).await.map_err(|e| match e {
            SenderError::Channel(msg) | SenderError::Http(msg) => SenderError::Send(msg),
            other => other,
        })?;

        let message_id = reply["messageId"].as_str().map(String::from);
        tracing::debug!("Sent message {:?} to {}", message_id, message.to);
        Ok(SendReceipt { message_id })
    }
}

/// Follow the bridge's event stream, reconnecting with exponential backoff.
async fn run_event_listener(ws_url: String, tx: mpsc::UnboundedSender<SessionEvent>) {
    use futures::StreamExt;
    use tokio_tungstenite::tungstenite::Message as WsMsg;

    let mut backoff_secs: u64 = 5;

    // ═══ Reconnect loop ═══
    loop {
        if tx.is_closed() {
            return;
        }

        let mut ws = match tokio_tungstenite::connect_async(ws_url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                tracing::error!("Bridge event stream failed: {e}, retrying in {backoff_secs}s...");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
                continue;
            }
        };

        backoff_secs = 5;
        tracing::info!("Bridge event stream connected");

        while let Some(frame) = ws.next().await {
            match frame {
                Ok(WsMsg::Text(text)) => {
                    if let Some(event) = events::parse_frame(&text) {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Ok(WsMsg::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Bridge event stream error: {e}");
                    break;
                }
            }
        }

        tracing::warn!("Bridge event stream closed, reconnecting in {backoff_secs}s...");
        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
    }
}
