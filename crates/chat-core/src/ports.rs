//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `chat-core` (pure Rust).
//! Implementations live in `chat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use chat_types::{
    Result,
    message::ContentPart,
    thread::{Run, ThreadMessage},
};

// ─── Assistants Port ─────────────────────────────────────────

/// The remote thread/run API of the hosted assistant service.
#[async_trait(?Send)]
pub trait AssistantsPort {
    /// Create a conversation thread and return its id
    async fn create_thread(&self) -> Result<String>;

    /// Post a user message to a thread
    async fn add_message(&self, thread_id: &str, content: &[ContentPart]) -> Result<()>;

    /// Start a run of the given assistant on a thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Most recent messages of a thread, newest first
    async fn latest_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>>;
}

// ─── Timer Port ──────────────────────────────────────────────

#[async_trait(?Send)]
pub trait TimerPort {
    /// Suspend the current task without blocking the event loop
    async fn sleep(&self, ms: u64);

    /// Monotonic-enough wall clock in milliseconds
    fn now_ms(&self) -> u64;
}
