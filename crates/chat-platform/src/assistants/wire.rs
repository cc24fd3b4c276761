//! JSON shapes of the Assistants API and their conversion into chat-types.

use serde::{Deserialize, Serialize};

use chat_types::{
    message::ContentPart,
    thread::{ReplyBlock, Run, RunStatus, ThreadMessage},
};

// ─── Request bodies ──────────────────────────────────────────

#[derive(Serialize)]
pub struct CreateMessageBody<'a> {
    pub role: &'static str,
    pub content: &'a [ContentPart],
}

impl<'a> CreateMessageBody<'a> {
    pub fn user(content: &'a [ContentPart]) -> Self {
        Self { role: "user", content }
    }
}

#[derive(Serialize)]
pub struct CreateRunBody<'a> {
    pub assistant_id: &'a str,
}

// ─── Response bodies ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

#[derive(Deserialize)]
pub struct RunObject {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<LastError>,
}

#[derive(Deserialize)]
pub struct LastError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<MessageObject>,
}

#[derive(Deserialize)]
pub struct MessageObject {
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlockObject>,
}

/// Content block of a thread message, discriminated by `type`
#[derive(Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlockObject {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: Option<TextObject>,
    },
    #[serde(rename = "image_file")]
    ImageFile,
    #[serde(rename = "image_url")]
    ImageUrl,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
pub struct TextObject {
    #[serde(default)]
    pub value: Option<String>,
}

// ─── Conversions ─────────────────────────────────────────────

impl RunObject {
    /// `thread_id` falls back to the thread the run was requested on.
    pub fn into_run(self, requested_thread: &str) -> Run {
        let thread_id = if self.thread_id.is_empty() {
            requested_thread.to_string()
        } else {
            self.thread_id
        };
        let last_error = self.last_error.and_then(|e| e.message.or(e.code));
        Run {
            id: self.id,
            thread_id,
            status: self.status,
            last_error,
        }
    }
}

impl From<MessageObject> for ThreadMessage {
    fn from(msg: MessageObject) -> Self {
        let content = msg
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlockObject::Text { text } => match text.and_then(|t| t.value) {
                    Some(value) => ReplyBlock::Text(value),
                    None => ReplyBlock::Other("text".to_string()),
                },
                ContentBlockObject::ImageFile => ReplyBlock::Other("image_file".to_string()),
                ContentBlockObject::ImageUrl => ReplyBlock::Other("image_url".to_string()),
                ContentBlockObject::Unknown => ReplyBlock::Other("unknown".to_string()),
            })
            .collect();
        ThreadMessage {
            id: msg.id,
            role: msg.role,
            content,
        }
    }
}

impl MessageList {
    pub fn into_messages(self) -> Vec<ThreadMessage> {
        self.data.into_iter().map(ThreadMessage::from).collect()
    }
}
