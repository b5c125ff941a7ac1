//! Unified error types for WaSender.

use thiserror::Error;

/// Result type alias using SenderError.
pub type Result<T> = std::result::Result<T, SenderError>;

#[derive(Error, Debug)]
pub enum SenderError {
    // Request errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not ready: {0}")]
    SessionNotReady(String),

    // Session / channel errors
    #[error("Send failed: {0}")]
    Send(String),

    #[error("Session disconnected: {0}")]
    SessionDisconnected(String),

    #[error("Channel error: {0}")]
    Channel(String),

    // Media errors
    #[error("Media fetch failed: {0}")]
    MediaFetch(String),

    // Scheduler errors
    #[error("Job not found: {0}")]
    JobNotFound(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl SenderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::MediaFetch(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Caller-side errors that should surface as HTTP 400.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::SessionNotReady(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SenderError::Send("timeout".into());
        assert!(err.to_string().contains("timeout"));
        assert!(err.to_string().starts_with("Send failed"));
    }

    #[test]
    fn test_error_constructors() {
        let e1 = SenderError::validation("test");
        assert!(matches!(e1, SenderError::Validation(_)));

        let e2 = SenderError::channel("test");
        assert!(matches!(e2, SenderError::Channel(_)));

        let e3 = SenderError::media("test");
        assert!(matches!(e3, SenderError::MediaFetch(_)));

        let e4 = SenderError::send("test");
        assert!(matches!(e4, SenderError::Send(_)));
    }

    #[test]
    fn test_client_errors() {
        assert!(SenderError::validation("x").is_client_error());
        assert!(SenderError::SessionNotReady("x".into()).is_client_error());
        assert!(!SenderError::send("x").is_client_error());
        assert!(!SenderError::JobNotFound("x".into()).is_client_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SenderError = io_err.into();
        assert!(matches!(err, SenderError::Io(_)));
    }
}
