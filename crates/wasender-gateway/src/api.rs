//! `/api` handlers: status, single send, bulk send, jobs and restart.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use wasender_core::error::SenderError;
use wasender_core::traits::MessagingSession;
use wasender_core::types::{
    ChatAddress, ConnectionState, Contact, DispatchJob, JobId, MessageTemplate, OutgoingMessage,
};

use crate::server::AppState;

const NOT_CONNECTED: &str = "WhatsApp não conectado";

/// Delay used when a bulk request omits the bounds.
const DEFAULT_DELAY_MS: u64 = 5000;

/// Error response: `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError(SenderError);

impl ApiError {
    fn rejected(rejection: JsonRejection) -> Self {
        Self(SenderError::validation(rejection.body_text()))
    }

    fn status_code(&self) -> StatusCode {
        match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            SenderError::JobNotFound(_) => StatusCode::NOT_FOUND,
            SenderError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SenderError> for ApiError {
    fn from(e: SenderError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self.0 {
            SenderError::SessionNotReady(_) => NOT_CONNECTED.to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!("API error: {}", self.0);
        } else {
            tracing::debug!("API rejected request: {}", self.0);
        }
        (status, Json(serde_json::json!({ "success": false, "error": message }))).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

/// Public status label for a connection state.
pub fn status_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Ready => "connected",
        ConnectionState::PairingPending => "qr_ready",
        ConnectionState::Uninitialized | ConnectionState::Authenticated => "initializing",
        ConnectionState::Disconnected => "disconnected",
    }
}

/// GET /api/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.session.snapshot();
    let message = match snapshot.state {
        ConnectionState::Ready => "WhatsApp conectado".to_string(),
        ConnectionState::PairingPending => "Escaneie o QR Code com o WhatsApp".to_string(),
        ConnectionState::Uninitialized | ConnectionState::Authenticated => "Inicializando...".to_string(),
        ConnectionState::Disconnected => match &snapshot.last_error {
            Some(reason) => format!("WhatsApp desconectado: {reason}"),
            None => "WhatsApp desconectado".to_string(),
        },
    };

    Json(serde_json::json!({
        "status": status_label(snapshot.state),
        "ready": snapshot.is_ready(),
        "qrCode": snapshot.pairing.and_then(|p| p.data_url),
        "message": message,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /api/send-message
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload.map_err(ApiError::rejected)?;

    let number = non_blank(req.number)
        .ok_or_else(|| SenderError::validation("number is required"))?;
    let body = req.message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| SenderError::validation("message is required"))?;

    let snapshot = state.session.snapshot();
    if !snapshot.is_ready() {
        return Err(SenderError::SessionNotReady(format!("session is {}", snapshot.state)).into());
    }

    let to = ChatAddress::parse(&number, &state.dispatch.country_code)
        .ok_or_else(|| SenderError::validation("invalid phone number"))?;
    let receipt = state.session.send(OutgoingMessage::text(to, body)).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Mensagem enviada com sucesso",
        "messageId": receipt.message_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BulkContact {
    pub number: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBulkRequest {
    pub contacts: Vec<BulkContact>,
    #[serde(default)]
    pub message_template: String,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default = "default_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_delay_ms() -> u64 { DEFAULT_DELAY_MS }

impl SendBulkRequest {
    fn into_job(self, default_name: &str) -> DispatchJob {
        let contacts = self.contacts.iter()
            .map(|c| Contact::with_default_name(&c.number, c.name.as_deref(), default_name))
            .collect();

        let mut job = DispatchJob::new(contacts, MessageTemplate::new(self.message_template))
            .with_delay(self.min_delay_ms, self.max_delay_ms)
            .with_variants(self.variants.into_iter().map(MessageTemplate::new).collect());
        if let Some(url) = non_blank(self.image_url) {
            job = job.with_media(url);
        }
        job
    }
}

/// POST /api/send-bulk
pub async fn send_bulk(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendBulkRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload.map_err(ApiError::rejected)?;
    let job = req.into_job(&state.dispatch.default_contact_name);

    let handle = state.scheduler.submit(job).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Envio iniciado",
        "jobId": handle.job_id,
        "total": handle.total,
    })))
}

/// GET /api/jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "jobs": state.scheduler.list().await }))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let job_id: JobId = id.parse()?;
    let report = state.scheduler.report(job_id).await
        .ok_or_else(|| SenderError::JobNotFound(id))?;
    Ok(Json(serde_json::to_value(report).map_err(SenderError::from)?))
}

/// POST /api/jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let job_id: JobId = id.parse()?;
    let cancelled = state.scheduler.cancel(job_id).await?;
    let message = if cancelled { "Cancelamento solicitado" } else { "Envio já finalizado" };
    Ok(Json(serde_json::json!({ "success": cancelled, "message": message })))
}

/// POST /api/restart
pub async fn restart(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let message = if state.session.restart().await {
        "Reiniciando conexão..."
    } else {
        "Reinício já em andamento"
    };
    Json(serde_json::json!({ "message": message }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(ConnectionState::Ready), "connected");
        assert_eq!(status_label(ConnectionState::PairingPending), "qr_ready");
        assert_eq!(status_label(ConnectionState::Uninitialized), "initializing");
        assert_eq!(status_label(ConnectionState::Authenticated), "initializing");
        assert_eq!(status_label(ConnectionState::Disconnected), "disconnected");
    }

    #[test]
    fn test_error_status_codes() {
        let code = |e: SenderError| ApiError::from(e).status_code();
        assert_eq!(code(SenderError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(code(SenderError::SessionNotReady("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(code(SenderError::JobNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(code(SenderError::send("x")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bulk_request_into_job() {
        let req: SendBulkRequest = serde_json::from_value(serde_json::json!({
            "contacts": [{"number": "(11) 98888-7777", "name": "Ana"}, {"number": "21977776666"}],
            "messageTemplate": "Olá {nome}!",
            "minDelayMs": 1000,
            "maxDelayMs": 2000,
            "imageUrl": "  "
        }))
        .unwrap();

        let job = req.into_job("Cliente");
        assert_eq!(job.contacts[0].number, "11988887777");
        assert_eq!(job.contacts[1].name, "Cliente");
        assert_eq!((job.min_delay_ms, job.max_delay_ms), (1000, 2000));
        assert!(job.media_url.is_none());
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_bulk_request_default_delay() {
        let req: SendBulkRequest = serde_json::from_value(serde_json::json!({
            "contacts": [{"number": "11988887777"}],
            "messageTemplate": "hi",
        }))
        .unwrap();
        let job = req.into_job("Cliente");
        assert_eq!((job.min_delay_ms, job.max_delay_ms), (DEFAULT_DELAY_MS, DEFAULT_DELAY_MS));
    }
}
