//! Lazily created, cached remote thread id.
//!
//! Concurrent first callers share one in-flight creation future, so only a
//! single `create_thread` request is ever outstanding per attempt.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chat_types::{ChatError, Result};
use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::ports::AssistantsPort;

type PendingThread = Shared<LocalBoxFuture<'static, Result<String>>>;

enum SessionSlot {
    Empty,
    Creating { attempt: u64, pending: PendingThread },
    Ready(String),
}

pub struct SessionManager {
    api: Rc<dyn AssistantsPort>,
    slot: RefCell<SessionSlot>,
    attempts: Cell<u64>,
}

impl SessionManager {
    pub fn new(api: Rc<dyn AssistantsPort>) -> Self {
        Self {
            api,
            slot: RefCell::new(SessionSlot::Empty),
            attempts: Cell::new(0),
        }
    }

    /// Return the cached thread id, creating the thread on first use.
    pub async fn get_or_create_session(&self) -> Result<String> {
        let (attempt, pending) = {
            let mut slot = self.slot.borrow_mut();
            match &*slot {
                SessionSlot::Ready(id) => return Ok(id.clone()),
                SessionSlot::Creating { attempt, pending } => (*attempt, pending.clone()),
                SessionSlot::Empty => {
                    let attempt = self.attempts.get() + 1;
                    self.attempts.set(attempt);
                    let api = self.api.clone();
                    let pending = async move { api.create_thread().await }
                        .boxed_local()
                        .shared();
                    *slot = SessionSlot::Creating {
                        attempt,
                        pending: pending.clone(),
                    };
                    (attempt, pending)
                }
            }
        };

        let result = pending.await;

        // A reset (or a newer attempt) may have replaced the slot meanwhile;
        // only the attempt that still owns it gets to settle it.
        let mut slot = self.slot.borrow_mut();
        let owns_slot = matches!(&*slot, SessionSlot::Creating { attempt: a, .. } if *a == attempt);
        match result {
            Ok(id) => {
                if owns_slot {
                    log::info!("Created assistant thread {}", id);
                    *slot = SessionSlot::Ready(id.clone());
                }
                Ok(id)
            }
            Err(e) => {
                if owns_slot {
                    *slot = SessionSlot::Empty;
                }
                log::error!("Thread creation failed: {}", e);
                Err(ChatError::SessionCreation(e.to_string()))
            }
        }
    }

    /// Forget the cached thread. The next send creates a fresh one.
    pub fn reset_session(&self) {
        *self.slot.borrow_mut() = SessionSlot::Empty;
    }

    /// Cached thread id, if one has been created
    pub fn current_session(&self) -> Option<String> {
        match &*self.slot.borrow() {
            SessionSlot::Ready(id) => Some(id.clone()),
            _ => None,
        }
    }

    /// Number of creation attempts started so far
    pub fn creation_attempts(&self) -> u64 {
        self.attempts.get()
    }
}
