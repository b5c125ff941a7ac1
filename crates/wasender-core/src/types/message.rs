//! Outbound message types.

use serde::{Deserialize, Serialize};

use super::ChatAddress;

/// A media attachment resolved once per batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    pub filename: String,
    /// Base64 (standard alphabet) file contents.
    pub data: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// One message handed to the messaging client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub to: ChatAddress,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl OutgoingMessage {
    pub fn text(to: ChatAddress, body: impl Into<String>) -> Self {
        Self {
            to,
            body: body.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }
}

/// What the client reports back after a successful send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let to = ChatAddress::parse("11988887777", "55").unwrap();
        let msg = OutgoingMessage::text(to, "Olá");
        assert_eq!(msg.body, "Olá");
        assert!(msg.attachment.is_none());
    }

    #[test]
    fn test_attachment_serialization() {
        let att = Attachment {
            mime_type: "image/png".into(),
            filename: "promo.png".into(),
            data: "aGVsbG8=".into(),
        };
        assert!(att.is_image());
        let json = serde_json::to_value(&att).unwrap();
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["filename"], "promo.png");
    }
}
