//! QR rendering for pairing codes.

use base64::{Engine as _, engine::general_purpose};
use qrcode::QrCode;

use wasender_core::error::{Result, SenderError};

/// Default edge length of the rendered image, in pixels.
pub const DEFAULT_QR_SIZE: u32 = 256;

/// Render a pairing payload as a `data:image/png;base64,...` URL.
/// Payloads that already are data URLs are returned unchanged.
pub fn render_data_url(payload: &str, size: u32) -> Result<String> {
    if payload.starts_with("data:image/") {
        return Ok(payload.to_string());
    }

    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| SenderError::Other(format!("Failed to create QR code: {e}")))?;

    let image = code
        .render::<image::Luma<u8>>()
        .min_dimensions(size, size)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| SenderError::Other(format!("Failed to encode QR PNG: {e}")))?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(&png)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_png_data_url() {
        let url = render_data_url("2@abc,def,ghi", DEFAULT_QR_SIZE).unwrap();
        let b64 = url.strip_prefix("data:image/png;base64,").unwrap();
        let png = general_purpose::STANDARD.decode(b64).unwrap();
        // PNG signature
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_data_url_passthrough() {
        let url = "data:image/png;base64,AAAA";
        assert_eq!(render_data_url(url, 128).unwrap(), url);
    }
}
