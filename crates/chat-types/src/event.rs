use serde::{Deserialize, Serialize};
use crate::message::Message;

/// Notifications published by the conversation store.
/// The presentation layer subscribes to these for reactive updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversationEvent {
    /// First event of every subscription: the state at subscribe time
    Snapshot { messages: Vec<Message>, busy: bool },

    /// A message was appended to the end of the transcript
    Appended(Message),

    /// The typing indicator flipped
    BusyChanged(bool),

    /// Transcript emptied and busy cleared
    Cleared,
}
