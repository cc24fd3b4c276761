//! Browser adapters for the chat-core ports.

pub mod assistants;
pub mod timer;


pub use assistants::HttpAssistantsClient;
pub use timer::BrowserTimer;
