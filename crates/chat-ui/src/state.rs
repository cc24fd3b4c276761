//! UI-level state that drives rendering.
//! This is a read-only projection of the conversation store,
//! updated each frame by draining the store subscription.

use chat_types::event::ConversationEvent;
use chat_types::message::{Attachment, Message};

/// What the user asked the app to do this frame
#[derive(Debug, Clone, PartialEq)]
pub enum ChatIntent {
    Submit {
        text: String,
        image: Option<Attachment>,
        audio: Option<Attachment>,
    },
    Clear,
}

/// State visible to UI panels
pub struct UiState {
    /// Transcript mirror, in store order
    pub messages: Vec<Message>,
    /// Typing indicator
    pub busy: bool,
    /// Input field content
    pub input_text: String,
    /// Attachments staged for the next submission
    pub pending_image: Option<Attachment>,
    pub pending_audio: Option<Attachment>,
    /// Whether settings panel is open
    pub show_settings: bool,
    /// Render failure diagnostics under apology messages
    pub show_diagnostics: bool,
    /// Status line text
    pub status_text: String,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            busy: false,
            input_text: String::new(),
            pending_image: None,
            pending_audio: None,
            show_settings: false,
            show_diagnostics: false,
            status_text: READY.to_string(),
        }
    }

    /// Apply store events in order
    pub fn process_events(&mut self, events: Vec<ConversationEvent>) {
        for event in events {
            match event {
                ConversationEvent::Snapshot { messages, busy } => {
                    self.messages = messages;
                    self.set_busy(busy);
                }
                ConversationEvent::Appended(message) => {
                    self.messages.push(message);
                }
                ConversationEvent::BusyChanged(busy) => {
                    self.set_busy(busy);
                }
                ConversationEvent::Cleared => {
                    self.messages.clear();
                    self.set_busy(false);
                }
            }
        }
    }

    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        self.status_text = if busy { TYPING } else { READY }.to_string();
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn has_pending_attachment(&self) -> bool {
        self.pending_image.is_some() || self.pending_audio.is_some()
    }

    pub fn can_send(&self) -> bool {
        !self.input_text.trim().is_empty() || self.has_pending_attachment()
    }

    /// Stage a file handed over by the host (e.g. dropped onto the window).
    /// Returns false for types other than image/* and audio/*.
    pub fn stage_attachment(&mut self, name: &str, mime: &str) -> bool {
        if mime.starts_with("image/") {
            self.pending_image = Some(Attachment::image(name));
            true
        } else if mime.starts_with("audio/") {
            self.pending_audio = Some(Attachment::audio(name));
            true
        } else {
            log::warn!("Ignoring attachment {} with unsupported type {:?}", name, mime);
            false
        }
    }

    /// Build a submit intent from the input field and staged attachments,
    /// then reset them. None when there is nothing to send.
    pub fn take_submission(&mut self) -> Option<ChatIntent> {
        if !self.can_send() {
            return None;
        }
        let text = self.input_text.trim().to_string();
        self.input_text.clear();
        Some(ChatIntent::Submit {
            text,
            image: self.pending_image.take(),
            audio: self.pending_audio.take(),
        })
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

pub const READY: &str = "Ready";
pub const TYPING: &str = "Assistant is typing...";
