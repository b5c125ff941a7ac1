//! Attachment download for a batch.
//!
//! Media is fetched once, before the first send. Any problem is logged and
//! the batch goes out text-only.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};

use wasender_core::config::MediaConfig;
use wasender_core::error::{Result, SenderError};
use wasender_core::types::Attachment;

pub struct MediaResolver {
    http: reqwest::Client,
    max_bytes: usize,
}

impl MediaResolver {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            max_bytes: config.max_bytes,
        }
    }

    /// Fetch and decode; `None` means "send text-only".
    pub async fn resolve(&self, source_url: &str) -> Option<Attachment> {
        match self.fetch(source_url).await {
            Ok(attachment) => {
                tracing::info!(
                    "Media ready: {} ({}, {} bytes base64)",
                    attachment.filename,
                    attachment.mime_type,
                    attachment.data.len()
                );
                Some(attachment)
            }
            Err(e) => {
                tracing::warn!("Media unavailable, sending text-only: {e}");
                None
            }
        }
    }

    async fn fetch(&self, source_url: &str) -> Result<Attachment> {
        let url = url::Url::parse(source_url.trim())
            .map_err(|e| SenderError::media(format!("invalid URL '{source_url}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SenderError::media(format!("unsupported scheme '{}'", url.scheme())));
        }

        let mut response = self.http.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                SenderError::media(format!("timed out fetching {url}"))
            } else {
                SenderError::media(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SenderError::media(format!("{url} returned {status}")));
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_bytes {
                return Err(SenderError::media(format!(
                    "{len} bytes exceeds limit of {}",
                    self.max_bytes
                )));
            }
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty() && v != "application/octet-stream");

        // Bodies without a length header are capped while streaming.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await
            .map_err(|e| SenderError::media(format!("read failed: {e}")))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(SenderError::media(format!(
                    "body exceeds limit of {} bytes",
                    self.max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Err(SenderError::media("empty response body"));
        }

        let filename = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("attachment")
            .to_string();

        let mime_type = header_mime
            .or_else(|| mime_from_filename(&filename).map(String::from))
            .ok_or_else(|| SenderError::media(format!("cannot determine type of {filename}")))?;

        if !is_supported(&mime_type) {
            return Err(SenderError::media(format!("unsupported media type {mime_type}")));
        }

        Ok(Attachment {
            mime_type,
            filename,
            data: general_purpose::STANDARD.encode(&bytes),
        })
    }
}

/// Infer MIME type from a file extension.
pub fn mime_from_filename(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "pdf" => "application/pdf",
        _ => return None,
    })
}

fn is_supported(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
        || mime_type.starts_with("audio/")
        || mime_type == "video/mp4"
        || mime_type == "application/pdf"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes};
    use axum::{Router, http::header, routing::get};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn resolver(max_bytes: usize) -> MediaResolver {
        MediaResolver::new(&MediaConfig { timeout_secs: 5, max_bytes })
    }

    fn routes() -> Router {
        Router::new()
            .route("/promo.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], PNG) }))
            .route("/raw/banner.jpg", get(|| async {
                ([(header::CONTENT_TYPE, "application/octet-stream")], PNG)
            }))
            .route("/page", get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }))
            .route("/empty.png", get(|| async { ([(header::CONTENT_TYPE, "image/png")], "") }))
            .route("/chunked.png", get(|| async {
                let chunks = futures::stream::iter([PNG, PNG].map(|c| Ok::<_, std::io::Error>(Bytes::from_static(c))));
                ([(header::CONTENT_TYPE, "image/png")], Body::from_stream(chunks))
            }))
            .route("/endless.png", get(|| async {
                let chunks = futures::stream::repeat_with(|| Ok::<_, std::io::Error>(Bytes::from_static(PNG)));
                ([(header::CONTENT_TYPE, "image/png")], Body::from_stream(chunks))
            }))
    }

    #[tokio::test]
    async fn test_resolve_image() {
        let base = serve(routes()).await;
        let att = resolver(1024).resolve(&format!("{base}/promo.png")).await.unwrap();
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(att.filename, "promo.png");
        assert_eq!(general_purpose::STANDARD.decode(att.data).unwrap(), PNG);
    }

    #[tokio::test]
    async fn test_mime_from_extension_fallback() {
        let base = serve(routes()).await;
        let att = resolver(1024).resolve(&format!("{base}/raw/banner.jpg")).await.unwrap();
        assert_eq!(att.mime_type, "image/jpeg");
        assert_eq!(att.filename, "banner.jpg");
    }

    #[tokio::test]
    async fn test_failures_degrade_to_none() {
        let base = serve(routes()).await;
        let r = resolver(1024);
        assert!(r.resolve(&format!("{base}/missing.png")).await.is_none());
        assert!(r.resolve(&format!("{base}/page")).await.is_none());
        assert!(r.resolve(&format!("{base}/empty.png")).await.is_none());
        assert!(r.resolve("not a url").await.is_none());
        assert!(r.resolve("ftp://example.com/a.png").await.is_none());
    }

    #[tokio::test]
    async fn test_size_limit() {
        let base = serve(routes()).await;
        assert!(resolver(4).resolve(&format!("{base}/promo.png")).await.is_none());
    }

    #[tokio::test]
    async fn test_chunked_body_within_limit() {
        let base = serve(routes()).await;
        let att = resolver(1024).resolve(&format!("{base}/chunked.png")).await.unwrap();
        assert_eq!(general_purpose::STANDARD.decode(att.data).unwrap(), [PNG, PNG].concat());
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit_stops_reading() {
        let base = serve(routes()).await;
        let r = resolver(4096);
        assert!(r.resolve(&format!("{base}/chunked.png")).await.is_some());

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            r.resolve(&format!("{base}/endless.png")),
        )
        .await;
        assert!(matches!(result, Ok(None)), "endless body must be cut off at the limit");
    }

    #[test]
    fn test_mime_from_filename() {
        assert_eq!(mime_from_filename("a.PNG"), Some("image/png"));
        assert_eq!(mime_from_filename("doc.pdf"), Some("application/pdf"));
        assert_eq!(mime_from_filename("noext"), None);
        assert_eq!(mime_from_filename("x.exe"), None);
    }
}
