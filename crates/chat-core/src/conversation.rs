//! Conversation store: the ordered transcript plus the typing indicator.
//!
//! The store is single-threaded (WASM constraint) and uses interior mutability
//! via RefCell. Every mutation and its notification happen under the same
//! borrow, so subscribers see changes in exactly the order they were made.

use std::cell::RefCell;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use chat_types::{event::ConversationEvent, message::Message};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::task::noop_waker_ref;
use futures::{Stream, StreamExt};

/// Shared conversation store, clone-cheap via Rc.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Rc<RefCell<StoreInner>>,
}

struct StoreInner {
    messages: Vec<Message>,
    busy: bool,
    subscribers: Vec<UnboundedSender<ConversationEvent>>,
}

impl StoreInner {
    fn publish(&mut self, event: ConversationEvent) {
        self.subscribers
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                messages: Vec::new(),
                busy: false,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Append a message to the end of the transcript. `created_at` is
    /// stamped here; the message is never modified afterwards.
    pub fn append(&self, mut message: Message) {
        message.created_at = chrono::Utc::now();
        let mut inner = self.inner.borrow_mut();
        inner.messages.push(message.clone());
        inner.publish(ConversationEvent::Appended(message));
    }

    /// Update the typing indicator. No event when the value is unchanged.
    pub fn set_busy(&self, busy: bool) {
        let mut inner = self.inner.borrow_mut();
        if inner.busy == busy {
            return;
        }
        inner.busy = busy;
        inner.publish(ConversationEvent::BusyChanged(busy));
    }

    /// Empty the transcript and clear the busy flag.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.messages.clear();
        inner.busy = false;
        inner.publish(ConversationEvent::Cleared);
    }

    /// Subscribe to changes. The first event is always a snapshot of the
    /// current state, followed by every later change.
    pub fn observe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded();
        let mut inner = self.inner.borrow_mut();
        let snapshot = ConversationEvent::Snapshot {
            messages: inner.messages.clone(),
            busy: inner.busy,
        };
        if tx.unbounded_send(snapshot).is_ok() {
            inner.subscribers.push(tx);
        }
        Subscription { rx }
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.inner.borrow().messages.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.borrow().busy
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().messages.is_empty()
    }

    /// Number of live subscriptions (pruned lazily on the next publish).
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of [`ConversationStore::observe`].
pub struct Subscription {
    rx: UnboundedReceiver<ConversationEvent>,
}

impl Subscription {
    /// Take all events queued so far without waiting. Called by the UI layer each frame.
    pub fn drain(&mut self) -> Vec<ConversationEvent> {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut events = Vec::new();
        while let Poll::Ready(Some(event)) = self.rx.poll_next_unpin(&mut cx) {
            events.push(event);
        }
        events
    }
}

impl Stream for Subscription {
    type Item = ConversationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}
