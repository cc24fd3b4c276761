//! Chat orchestrator: the composition root of the core.
//!
//! Turns submit/clear intents into session + run calls and writes the
//! outcome back into the conversation store. Errors stop here: every
//! failure becomes an apology message in the transcript.

use std::cell::RefCell;
use std::rc::Rc;

use chat_types::{
    ChatError, Result,
    config::ChatConfig,
    message::{Attachment, Message},
};

use crate::conversation::ConversationStore;
use crate::ports::{AssistantsPort, TimerPort};
use crate::run::{CancelToken, RunOrchestrator};
use crate::session::SessionManager;

/// Shown to the user whenever a delivery fails; the cause goes into `Message::error`.
pub const APOLOGY_TEXT: &str =
    "Sorry, something went wrong while contacting the assistant. Please try again.";

/// What happened to one submission
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Nothing to send
    Skipped,
    /// Reply appended
    Delivered,
    /// Apology appended
    Failed(ChatError),
    /// The chat was cleared while the submission was in flight; result dropped
    Superseded,
}

struct ChatState {
    epoch: u64,
    in_flight: usize,
    cancel: CancelToken,
}

pub struct ChatOrchestrator {
    store: ConversationStore,
    sessions: SessionManager,
    runs: RunOrchestrator,
    state: RefCell<ChatState>,
}

impl ChatOrchestrator {
    pub fn new(store: ConversationStore, sessions: SessionManager, runs: RunOrchestrator) -> Self {
        Self {
            store,
            sessions,
            runs,
            state: RefCell::new(ChatState {
                epoch: 0,
                in_flight: 0,
                cancel: CancelToken::new(),
            }),
        }
    }

    /// Wire the orchestrator from config and the two platform ports.
    pub fn from_config(
        config: &ChatConfig,
        store: ConversationStore,
        api: Rc<dyn AssistantsPort>,
        timer: Rc<dyn TimerPort>,
    ) -> Self {
        let sessions = SessionManager::new(api.clone());
        let runs = RunOrchestrator::new(
            api,
            timer,
            config.api.assistant_id.clone(),
            config.polling.clone(),
        );
        Self::new(store, sessions, runs)
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    /// Handle one user submission end to end.
    ///
    /// Must be spawned via `wasm_bindgen_futures::spawn_local` from the UI;
    /// it never blocks and never returns an error.
    pub async fn submit_user_input(
        &self,
        content: &str,
        image: Option<Attachment>,
        audio: Option<Attachment>,
    ) -> SubmitOutcome {
        let attachments: Vec<Attachment> = image.into_iter().chain(audio).collect();
        if content.trim().is_empty() && attachments.is_empty() {
            return SubmitOutcome::Skipped;
        }

        self.store
            .append(Message::user_with_attachments(content, attachments.clone()));

        let (epoch, cancel) = self.begin_run();
        let result = self.deliver(content, &attachments, &cancel).await;

        if !self.finish_run(epoch) {
            log::warn!("Discarding result of a submission from cleared epoch {}", epoch);
            return SubmitOutcome::Superseded;
        }

        match result {
            Ok(reply) => {
                self.store.append(Message::assistant(reply));
                SubmitOutcome::Delivered
            }
            Err(e) => {
                log::error!("Message delivery failed: {}", e);
                self.store
                    .append(Message::assistant_error(APOLOGY_TEXT, e.to_string()));
                SubmitOutcome::Failed(e)
            }
        }
    }

    async fn deliver(
        &self,
        content: &str,
        attachments: &[Attachment],
        cancel: &CancelToken,
    ) -> Result<String> {
        let thread_id = self.sessions.get_or_create_session().await?;
        self.runs.submit(&thread_id, content, attachments, cancel).await
    }

    fn begin_run(&self) -> (u64, CancelToken) {
        let mut state = self.state.borrow_mut();
        state.in_flight += 1;
        self.store.set_busy(true);
        (state.epoch, state.cancel.clone())
    }

    /// Returns false when the run belongs to an epoch that was cleared.
    fn finish_run(&self, epoch: u64) -> bool {
        let mut state = self.state.borrow_mut();
        if state.epoch != epoch {
            return false;
        }
        state.in_flight = state.in_flight.saturating_sub(1);
        self.store.set_busy(state.in_flight > 0);
        true
    }

    /// Empty the transcript and start over on a new thread.
    ///
    /// Synchronous, so no observer can see the transcript cleared while the
    /// old thread is still cached (or the reverse). In-flight polls are
    /// cancelled and their late results dropped.
    pub fn clear_chat(&self) {
        self.supersede_in_flight();
        self.store.reset();
        self.sessions.reset_session();
        log::info!("Chat cleared (epoch {})", self.epoch());
    }

    /// Stop every in-flight submission but keep the transcript.
    ///
    /// Call before replacing this orchestrator with one built from new
    /// settings over the same store; otherwise its late replies would land
    /// after a clear issued through the replacement.
    pub fn retire(&self) {
        let stopped = self.supersede_in_flight();
        if stopped > 0 {
            self.store.set_busy(false);
            log::info!("Retired orchestrator with {} submission(s) in flight", stopped);
        }
    }

    /// Cancel polling, open a new epoch and return how many submissions
    /// were outstanding.
    fn supersede_in_flight(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state.cancel.cancel();
        state.cancel = CancelToken::new();
        state.epoch += 1;
        std::mem::take(&mut state.in_flight)
    }
}
