use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

/// What a transcript entry primarily shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Audio,
}

/// Reference to a file handed over by the attachment collaborator.
/// Only the name ever leaves the client; the bytes stay with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub name: String,
    /// Local preview URL (object URL, data URL) for rendering
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preview_url: Option<String>,
}

impl Attachment {
    pub fn image(name: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Image,
            name: name.into(),
            preview_url: None,
        }
    }

    pub fn audio(name: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Audio,
            name: name.into(),
            preview_url: None,
        }
    }

    pub fn with_preview(mut self, url: impl Into<String>) -> Self {
        self.preview_url = Some(url.into());
        self
    }

    /// Text stand-in sent to the assistant in place of the file itself
    pub fn placeholder(&self) -> String {
        match self.kind {
            AttachmentKind::Image => format!("[Image sent: {}]", self.name),
            AttachmentKind::Audio => format!("[Audio sent: {}]", self.name),
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub origin: Origin,
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attachments: Vec<Attachment>,
    /// Reserved for the presentation layer
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub processing: Option<bool>,
    /// Diagnostic detail, present only when delivery failed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl Message {
    fn new(origin: Origin, kind: MessageKind, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            created_at: Utc::now(),
            origin,
            kind,
            attachments: Vec::new(),
            processing: None,
            error: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Origin::User, MessageKind::Text, content.into())
    }

    /// User message carrying attachment references. The kind follows the
    /// first image, then the first audio attachment.
    pub fn user_with_attachments(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        let mut msg = Self::new(Origin::User, kind_for(&attachments), content.into());
        msg.attachments = attachments;
        msg
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Origin::Assistant, MessageKind::Text, content.into())
    }

    /// Assistant message shown when a delivery fails
    pub fn assistant_error(content: impl Into<String>, error: impl Into<String>) -> Self {
        let mut msg = Self::assistant(content);
        msg.error = Some(error.into());
        msg
    }

    pub fn is_user(&self) -> bool {
        self.origin == Origin::User
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Image wins over audio when both are present.
pub fn kind_for(attachments: &[Attachment]) -> MessageKind {
    if attachments.iter().any(|a| a.kind == AttachmentKind::Image) {
        MessageKind::Image
    } else if attachments.iter().any(|a| a.kind == AttachmentKind::Audio) {
        MessageKind::Audio
    } else {
        MessageKind::Text
    }
}

/// Outgoing content block of a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            ContentPart::Text { text } => text,
        }
    }
}
