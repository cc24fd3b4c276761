//! Run orchestration: submit, poll, fetch.
//!
//! One submission walks through:
//! 1. Post the user's content blocks to the thread
//! 2. Start a run of the configured assistant
//! 3. Poll the run with capped exponential backoff until it is terminal
//! 4. On completion, read the newest thread message and return its text

use std::cell::Cell;
use std::rc::Rc;

use chat_types::{
    ChatError, Result,
    config::PollPolicy,
    message::{Attachment, ContentPart},
    thread::{RunStatus, ThreadMessage},
};

use crate::ports::{AssistantsPort, TimerPort};

/// Reply used when the finished run left no readable text behind.
pub const NO_REPLY_TEXT: &str = "Unable to retrieve a response from the assistant.";

const UNKNOWN_RUN_ERROR: &str = "Unknown error";

/// Cooperative cancellation flag shared between the caller and a poll loop.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ChatError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct RunOrchestrator {
    api: Rc<dyn AssistantsPort>,
    timer: Rc<dyn TimerPort>,
    assistant_id: String,
    policy: PollPolicy,
}

impl RunOrchestrator {
    pub fn new(
        api: Rc<dyn AssistantsPort>,
        timer: Rc<dyn TimerPort>,
        assistant_id: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            api,
            timer,
            assistant_id: assistant_id.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Send `content` (plus attachment placeholders) to the thread and wait
    /// for the assistant's reply text.
    pub async fn submit(
        &self,
        thread_id: &str,
        content: &str,
        attachments: &[Attachment],
        cancel: &CancelToken,
    ) -> Result<String> {
        let blocks = build_content_blocks(content, attachments);

        cancel.check()?;
        self.api.add_message(thread_id, &blocks).await?;

        // A clear may have landed while the message was being posted.
        cancel.check()?;
        let run = self
            .api
            .create_run(thread_id, &self.assistant_id)
            .await
            .map_err(|e| ChatError::RunSubmission(e.to_string()))?;
        log::debug!("Run {} started on thread {} ({})", run.id, thread_id, run.status);

        self.wait_for_completion(thread_id, &run.id, cancel).await?;
        self.fetch_reply(thread_id).await
    }

    /// Poll until the run is terminal, the attempt cap is hit, the deadline
    /// passes, or the token is cancelled.
    async fn wait_for_completion(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        let started = self.timer.now_ms();
        let mut interval = self.policy.first_interval();

        for attempt in 1..=self.policy.max_attempts {
            cancel.check()?;

            let run = self.api.get_run(thread_id, run_id).await?;
            match run.status {
                RunStatus::Completed => return Ok(()),
                RunStatus::Failed | RunStatus::Cancelled => {
                    return Err(ChatError::RunExecution {
                        status: run.status,
                        message: run
                            .last_error
                            .unwrap_or_else(|| UNKNOWN_RUN_ERROR.to_string()),
                    });
                }
                status => {
                    log::debug!("Run {} is {} (poll {})", run_id, status, attempt);
                }
            }

            if attempt == self.policy.max_attempts {
                break;
            }

            let elapsed = self.timer.now_ms().saturating_sub(started);
            if elapsed + interval > self.policy.timeout_ms {
                return Err(ChatError::Timeout(self.policy.timeout_ms));
            }

            self.timer.sleep(interval).await;
            interval = self.policy.next_interval(interval);
        }

        cancel.check()?;
        Err(ChatError::PollExhausted(self.policy.max_attempts))
    }

    async fn fetch_reply(&self, thread_id: &str) -> Result<String> {
        let reply = self
            .api
            .latest_messages(thread_id, 1)
            .await
            .and_then(|messages| extract_reply_text(&messages));
        match reply {
            Err(ChatError::ResponseParse(detail)) => {
                log::warn!("Unreadable reply ({}); falling back to placeholder reply", detail);
                Ok(NO_REPLY_TEXT.to_string())
            }
            other => other,
        }
    }
}

/// One text block for non-blank content, then one placeholder per attachment.
pub fn build_content_blocks(content: &str, attachments: &[Attachment]) -> Vec<ContentPart> {
    let mut blocks = Vec::with_capacity(attachments.len() + 1);
    if !content.trim().is_empty() {
        blocks.push(ContentPart::text(content));
    }
    blocks.extend(attachments.iter().map(|a| ContentPart::text(a.placeholder())));
    blocks
}

/// Text of the first text block of the newest message.
pub fn extract_reply_text(messages: &[ThreadMessage]) -> Result<String> {
    let latest = messages
        .first()
        .ok_or_else(|| ChatError::ResponseParse("thread has no messages".to_string()))?;
    latest
        .first_text()
        .map(str::to_string)
        .ok_or_else(|| {
            ChatError::ResponseParse(format!("message {} has no text content", latest.id))
        })
}
