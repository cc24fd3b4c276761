#[cfg(test)]
mod tests {
    use crate::chat::{ChatOrchestrator, SubmitOutcome, APOLOGY_TEXT};
    use crate::conversation::ConversationStore;
    use crate::ports::*;
    use crate::run::*;
    use crate::session::SessionManager;
    use chat_types::config::{ChatConfig, PollPolicy};
    use chat_types::event::ConversationEvent;
    use chat_types::message::*;
    use chat_types::thread::*;
    use chat_types::ChatError;

    use async_trait::async_trait;
    use futures::executor::block_on;
    use futures::task::noop_waker_ref;
    use futures::StreamExt;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll};

    // ─── Test doubles ────────────────────────────────────────

    /// Returns Pending once (after waking itself), then Ready.
    struct YieldNow(bool);

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    fn yield_now() -> YieldNow {
        YieldNow(false)
    }

    /// Scripted Assistants API that records every call
    #[derive(Default)]
    struct MockAssistants {
        yield_on_create: bool,
        yield_on_add: bool,
        unreadable_reply: bool,
        fail_create: Cell<bool>,
        fail_add_message: bool,
        fail_create_run: bool,
        statuses: RefCell<VecDeque<RunStatus>>,
        last_error: Option<String>,
        reply: RefCell<Vec<ThreadMessage>>,
        create_calls: Cell<u32>,
        add_calls: Cell<u32>,
        run_calls: Cell<u32>,
        poll_calls: Cell<u32>,
        fetch_calls: Cell<u32>,
        posted: RefCell<Vec<Vec<ContentPart>>>,
    }

    impl MockAssistants {
        fn scripted(statuses: Vec<RunStatus>, reply: &str) -> Self {
            Self {
                statuses: RefCell::new(statuses.into()),
                reply: RefCell::new(text_reply(reply)),
                ..Self::default()
            }
        }

        fn total_calls(&self) -> u32 {
            self.create_calls.get()
                + self.add_calls.get()
                + self.run_calls.get()
                + self.poll_calls.get()
                + self.fetch_calls.get()
        }
    }

    fn bump(counter: &Cell<u32>) -> u32 {
        counter.set(counter.get() + 1);
        counter.get()
    }

    fn text_reply(text: &str) -> Vec<ThreadMessage> {
        vec![ThreadMessage {
            id: "msg_reply".to_string(),
            role: "assistant".to_string(),
            content: vec![ReplyBlock::Text(text.to_string())],
        }]
    }

    #[async_trait(?Send)]
    impl AssistantsPort for MockAssistants {
        async fn create_thread(&self) -> chat_types::Result<String> {
            let n = bump(&self.create_calls);
            if self.yield_on_create {
                yield_now().await;
            }
            if self.fail_create.get() {
                return Err(ChatError::Network("offline".to_string()));
            }
            Ok(format!("thread_{}", n))
        }

        async fn add_message(&self, _thread_id: &str, content: &[ContentPart]) -> chat_types::Result<()> {
            bump(&self.add_calls);
            if self.yield_on_add {
                yield_now().await;
            }
            if self.fail_add_message {
                return Err(ChatError::Network("connection reset".to_string()));
            }
            self.posted.borrow_mut().push(content.to_vec());
            Ok(())
        }

        async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> chat_types::Result<Run> {
            bump(&self.run_calls);
            if self.fail_create_run {
                return Err(ChatError::Http { status: 404, body: "no such assistant".to_string() });
            }
            Ok(Run {
                id: "run_1".to_string(),
                thread_id: thread_id.to_string(),
                status: RunStatus::Queued,
                last_error: None,
            })
        }

        async fn get_run(&self, thread_id: &str, run_id: &str) -> chat_types::Result<Run> {
            bump(&self.poll_calls);
            let status = self
                .statuses
                .borrow_mut()
                .pop_front()
                .unwrap_or(RunStatus::InProgress);
            let last_error = match status {
                RunStatus::Failed | RunStatus::Cancelled => self.last_error.clone(),
                _ => None,
            };
            Ok(Run {
                id: run_id.to_string(),
                thread_id: thread_id.to_string(),
                status,
                last_error,
            })
        }

        async fn latest_messages(&self, _thread_id: &str, limit: u32) -> chat_types::Result<Vec<ThreadMessage>> {
            bump(&self.fetch_calls);
            assert_eq!(limit, 1);
            if self.unreadable_reply {
                return Err(ChatError::ResponseParse("missing field `value`".to_string()));
            }
            Ok(self.reply.borrow().clone())
        }
    }

    /// Virtual clock; sleeping advances time instantly
    #[derive(Default)]
    struct MockTimer {
        now: Cell<u64>,
        sleeps: RefCell<Vec<u64>>,
        yield_on_sleep: bool,
    }

    #[async_trait(?Send)]
    impl TimerPort for MockTimer {
        async fn sleep(&self, ms: u64) {
            self.sleeps.borrow_mut().push(ms);
            self.now.set(self.now.get() + ms);
            if self.yield_on_sleep {
                yield_now().await;
            }
        }

        fn now_ms(&self) -> u64 {
            self.now.get()
        }
    }

    fn runs_with(api: Rc<MockAssistants>, timer: Rc<MockTimer>, policy: PollPolicy) -> RunOrchestrator {
        RunOrchestrator::new(api, timer, "asst_test", policy)
    }

    fn test_config() -> ChatConfig {
        let mut config = ChatConfig::default();
        config.api.assistant_id = "asst_test".to_string();
        config
    }

    fn chat_with(api: Rc<MockAssistants>, timer: Rc<MockTimer>) -> ChatOrchestrator {
        ChatOrchestrator::from_config(&test_config(), ConversationStore::new(), api, timer)
    }

    fn busy_transitions(events: &[ConversationEvent]) -> Vec<bool> {
        events
            .iter()
            .filter_map(|e| match e {
                ConversationEvent::BusyChanged(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    // ─── ConversationStore Tests ─────────────────────────────

    #[test]
    fn test_store_new_is_empty() {
        let store = ConversationStore::new();
        assert!(store.is_empty());
        assert!(!store.is_busy());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_store_append_preserves_call_order() {
        let store = ConversationStore::new();
        for i in 0..50 {
            store.append(Message::user(format!("msg{}", i)));
        }
        let contents: Vec<String> = store.snapshot().into_iter().map(|m| m.content).collect();
        let expected: Vec<String> = (0..50).map(|i| format!("msg{}", i)).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn test_store_observe_replays_snapshot_then_live() {
        let store = ConversationStore::new();
        store.append(Message::user("before"));
        store.set_busy(true);

        let mut sub = store.observe();
        store.append(Message::assistant("after"));

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        match &events[0] {
            ConversationEvent::Snapshot { messages, busy } => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].content, "before");
                assert!(*busy);
            }
            other => panic!("Expected snapshot, got {:?}", other),
        }
        assert!(matches!(&events[1], ConversationEvent::Appended(m) if m.content == "after"));
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_store_each_subscriber_gets_own_replay() {
        let store = ConversationStore::new();
        store.append(Message::user("hello"));
        let mut first = store.observe();
        let mut second = store.observe();
        assert_eq!(first.drain().len(), 1);
        assert_eq!(second.drain().len(), 1);
        assert_eq!(store.subscriber_count(), 2);
    }

    #[test]
    fn test_store_set_busy_only_broadcasts_changes() {
        let store = ConversationStore::new();
        let mut sub = store.observe();
        store.set_busy(true);
        store.set_busy(true);
        store.set_busy(false);
        let events = sub.drain();
        assert_eq!(busy_transitions(&events), vec![true, false]);
    }

    #[test]
    fn test_store_reset_clears_transcript_and_busy() {
        let store = ConversationStore::new();
        store.append(Message::user("a"));
        store.set_busy(true);
        let mut sub = store.observe();

        store.reset();

        assert!(store.is_empty());
        assert!(!store.is_busy());
        let events = sub.drain();
        assert!(matches!(events.last(), Some(ConversationEvent::Cleared)));
    }

    #[test]
    fn test_store_append_stamps_created_at() {
        let store = ConversationStore::new();
        let mut msg = Message::user("late");
        msg.created_at = chrono::DateTime::<chrono::Utc>::MIN_UTC;
        store.append(msg);
        assert!(store.snapshot()[0].created_at > chrono::DateTime::<chrono::Utc>::MIN_UTC);
    }

    #[test]
    fn test_store_prunes_dropped_subscribers() {
        let store = ConversationStore::new();
        let sub = store.observe();
        assert_eq!(store.subscriber_count(), 1);
        drop(sub);
        store.append(Message::user("x"));
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_store_clone_shares_state() {
        let store1 = ConversationStore::new();
        let store2 = store1.clone();
        store1.append(Message::user("shared"));
        assert_eq!(store2.len(), 1);
    }

    #[test]
    fn test_subscription_is_a_stream() {
        let store = ConversationStore::new();
        let mut sub = store.observe();
        store.set_busy(true);
        block_on(async {
            assert!(matches!(sub.next().await, Some(ConversationEvent::Snapshot { .. })));
            assert_eq!(sub.next().await, Some(ConversationEvent::BusyChanged(true)));
        });
    }

    // ─── SessionManager Tests ────────────────────────────────

    #[test]
    fn test_session_is_cached() {
        let api = Rc::new(MockAssistants::default());
        let sessions = SessionManager::new(api.clone());

        let first = block_on(sessions.get_or_create_session()).unwrap();
        let second = block_on(sessions.get_or_create_session()).unwrap();

        assert_eq!(first, second);
        assert_eq!(api.create_calls.get(), 1);
        assert_eq!(sessions.current_session(), Some(first));
    }

    #[test]
    fn test_session_concurrent_first_calls_single_flight() {
        let api = Rc::new(MockAssistants {
            yield_on_create: true,
            ..MockAssistants::default()
        });
        let sessions = SessionManager::new(api.clone());

        let (a, b) = block_on(async {
            futures::join!(sessions.get_or_create_session(), sessions.get_or_create_session())
        });

        assert_eq!(a.unwrap(), "thread_1");
        assert_eq!(b.unwrap(), "thread_1");
        assert_eq!(api.create_calls.get(), 1);
        assert_eq!(sessions.creation_attempts(), 1);
    }

    #[test]
    fn test_session_reset_creates_new_thread() {
        let api = Rc::new(MockAssistants::default());
        let sessions = SessionManager::new(api.clone());

        let first = block_on(sessions.get_or_create_session()).unwrap();
        sessions.reset_session();
        assert!(sessions.current_session().is_none());
        let second = block_on(sessions.get_or_create_session()).unwrap();

        assert_ne!(first, second);
        assert_eq!(api.create_calls.get(), 2);
    }

    #[test]
    fn test_session_creation_failure_clears_slot() {
        let api = Rc::new(MockAssistants::default());
        api.fail_create.set(true);
        let sessions = SessionManager::new(api.clone());

        let err = block_on(sessions.get_or_create_session()).unwrap_err();
        assert!(matches!(err, ChatError::SessionCreation(ref m) if m.contains("offline")));
        assert!(sessions.current_session().is_none());

        api.fail_create.set(false);
        let id = block_on(sessions.get_or_create_session()).unwrap();
        assert_eq!(id, "thread_2");
    }

    #[test]
    fn test_session_reset_during_creation_is_not_cached() {
        let api = Rc::new(MockAssistants {
            yield_on_create: true,
            ..MockAssistants::default()
        });
        let sessions = SessionManager::new(api.clone());

        let mut pending = Box::pin(sessions.get_or_create_session());
        let mut cx = Context::from_waker(noop_waker_ref());
        assert!(pending.as_mut().poll(&mut cx).is_pending());

        sessions.reset_session();
        let stale = block_on(pending).unwrap();
        assert_eq!(stale, "thread_1");
        assert!(sessions.current_session().is_none());

        let fresh = block_on(sessions.get_or_create_session()).unwrap();
        assert_eq!(fresh, "thread_2");
        assert_eq!(sessions.current_session(), Some("thread_2".to_string()));
    }

    // ─── Content block Tests ─────────────────────────────────

    #[test]
    fn test_content_blocks_text_only() {
        let blocks = build_content_blocks("hello", &[]);
        assert_eq!(blocks, vec![ContentPart::text("hello")]);
    }

    #[test]
    fn test_content_blocks_blank_text_is_dropped() {
        let blocks = build_content_blocks("   ", &[Attachment::image("cat.png")]);
        assert_eq!(blocks, vec![ContentPart::text("[Image sent: cat.png]")]);
    }

    #[test]
    fn test_content_blocks_attachment_order() {
        let blocks = build_content_blocks(
            "hi",
            &[Attachment::image("cat.png"), Attachment::audio("memo.webm")],
        );
        let texts: Vec<&str> = blocks.iter().map(|b| b.as_text()).collect();
        assert_eq!(texts, vec!["hi", "[Image sent: cat.png]", "[Audio sent: memo.webm]"]);
    }

    #[test]
    fn test_extract_reply_text_empty_thread() {
        let err = extract_reply_text(&[]).unwrap_err();
        assert!(matches!(err, ChatError::ResponseParse(_)));
    }

    // ─── RunOrchestrator Tests ───────────────────────────────

    #[test]
    fn test_run_polls_until_completed() {
        let api = Rc::new(MockAssistants::scripted(
            vec![RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed],
            "Hello from the assistant",
        ));
        let timer = Rc::new(MockTimer::default());
        let runs = runs_with(api.clone(), timer.clone(), PollPolicy::default());

        let reply = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap();

        assert_eq!(reply, "Hello from the assistant");
        assert_eq!(api.poll_calls.get(), 3);
        assert_eq!(api.add_calls.get(), 1);
        assert_eq!(api.run_calls.get(), 1);
        assert_eq!(api.fetch_calls.get(), 1);
        assert_eq!(*timer.sleeps.borrow(), vec![1_000, 1_500]);
    }

    #[test]
    fn test_run_failed_carries_remote_message() {
        let api = Rc::new(MockAssistants {
            last_error: Some("boom".to_string()),
            ..MockAssistants::scripted(vec![RunStatus::Queued, RunStatus::Failed], "")
        });
        let runs = runs_with(api.clone(), Rc::new(MockTimer::default()), PollPolicy::default());

        let err = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap_err();

        assert!(matches!(err, ChatError::RunExecution { status: RunStatus::Failed, .. }));
        assert!(err.to_string().contains("boom"));
        assert_eq!(api.fetch_calls.get(), 0);
    }

    #[test]
    fn test_run_cancelled_without_detail_uses_generic_message() {
        let api = Rc::new(MockAssistants::scripted(vec![RunStatus::Cancelled], ""));
        let runs = runs_with(api, Rc::new(MockTimer::default()), PollPolicy::default());

        let err = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap_err();
        assert_eq!(err.to_string(), "Run cancelled: Unknown error");
    }

    #[test]
    fn test_run_unknown_status_keeps_polling() {
        let api = Rc::new(MockAssistants::scripted(
            vec![RunStatus::Other, RunStatus::Other, RunStatus::Completed],
            "done",
        ));
        let runs = runs_with(api.clone(), Rc::new(MockTimer::default()), PollPolicy::default());

        let reply = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap();
        assert_eq!(reply, "done");
        assert_eq!(api.poll_calls.get(), 3);
    }

    #[test]
    fn test_run_reply_without_text_returns_sentinel() {
        let api = Rc::new(MockAssistants::scripted(vec![RunStatus::Completed], ""));
        *api.reply.borrow_mut() = vec![ThreadMessage {
            id: "msg_img".to_string(),
            role: "assistant".to_string(),
            content: vec![ReplyBlock::Other("image_file".to_string())],
        }];
        let runs = runs_with(api, Rc::new(MockTimer::default()), PollPolicy::default());

        let reply = block_on(runs.submit("thread_1", "draw", &[], &CancelToken::new())).unwrap();
        assert_eq!(reply, NO_REPLY_TEXT);
    }

    #[test]
    fn test_run_backoff_is_capped() {
        let api = Rc::new(MockAssistants::default());
        let timer = Rc::new(MockTimer::default());
        let policy = PollPolicy {
            initial_interval_ms: 100,
            max_interval_ms: 400,
            backoff_multiplier: 2.0,
            max_attempts: 5,
            timeout_ms: 60_000,
        };
        let runs = runs_with(api.clone(), timer.clone(), policy);

        let err = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap_err();

        assert!(matches!(err, ChatError::PollExhausted(5)));
        assert_eq!(api.poll_calls.get(), 5);
        assert_eq!(*timer.sleeps.borrow(), vec![100, 200, 400, 400]);
    }

    #[test]
    fn test_run_first_interval_respects_cap() {
        let api = Rc::new(MockAssistants::default());
        let timer = Rc::new(MockTimer::default());
        let policy = PollPolicy {
            initial_interval_ms: 5_000,
            max_interval_ms: 100,
            backoff_multiplier: 2.0,
            max_attempts: 3,
            timeout_ms: 60_000,
        };
        let runs = runs_with(api, timer.clone(), policy);

        let err = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap_err();

        assert!(matches!(err, ChatError::PollExhausted(3)));
        assert_eq!(*timer.sleeps.borrow(), vec![100, 100]);
    }

    #[test]
    fn test_run_unreadable_reply_returns_sentinel() {
        let api = Rc::new(MockAssistants {
            unreadable_reply: true,
            ..MockAssistants::scripted(vec![RunStatus::Completed], "")
        });
        let runs = runs_with(api.clone(), Rc::new(MockTimer::default()), PollPolicy::default());

        let reply = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap();
        assert_eq!(reply, NO_REPLY_TEXT);
        assert_eq!(api.fetch_calls.get(), 1);
    }

    #[test]
    fn test_run_deadline_times_out() {
        let api = Rc::new(MockAssistants::default());
        let timer = Rc::new(MockTimer::default());
        let policy = PollPolicy {
            initial_interval_ms: 1_000,
            max_interval_ms: 1_000,
            backoff_multiplier: 1.0,
            max_attempts: 100,
            timeout_ms: 3_500,
        };
        let runs = runs_with(api.clone(), timer.clone(), policy);

        let err = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap_err();

        assert!(matches!(err, ChatError::Timeout(3_500)));
        assert_eq!(api.poll_calls.get(), 4);
        assert_eq!(timer.sleeps.borrow().len(), 3);
    }

    #[test]
    fn test_run_cancelled_token_sends_nothing() {
        let api = Rc::new(MockAssistants::scripted(vec![RunStatus::Completed], "x"));
        let runs = runs_with(api.clone(), Rc::new(MockTimer::default()), PollPolicy::default());
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = block_on(runs.submit("thread_1", "hi", &[], &cancel)).unwrap_err();

        assert!(matches!(err, ChatError::Cancelled));
        assert_eq!(api.total_calls(), 0);
    }

    #[test]
    fn test_run_add_message_failure_is_network_error() {
        let api = Rc::new(MockAssistants {
            fail_add_message: true,
            ..MockAssistants::default()
        });
        let runs = runs_with(api.clone(), Rc::new(MockTimer::default()), PollPolicy::default());

        let err = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap_err();
        assert!(matches!(err, ChatError::Network(_)));
        assert_eq!(api.run_calls.get(), 0);
    }

    #[test]
    fn test_run_create_failure_is_submission_error() {
        let api = Rc::new(MockAssistants {
            fail_create_run: true,
            ..MockAssistants::default()
        });
        let runs = runs_with(api.clone(), Rc::new(MockTimer::default()), PollPolicy::default());

        let err = block_on(runs.submit("thread_1", "hi", &[], &CancelToken::new())).unwrap_err();
        assert!(matches!(err, ChatError::RunSubmission(ref m) if m.contains("404")));
        assert_eq!(api.poll_calls.get(), 0);
    }

    // ─── ChatOrchestrator Tests ──────────────────────────────

    #[test]
    fn test_chat_empty_input_is_noop() {
        let api = Rc::new(MockAssistants::default());
        let chat = chat_with(api.clone(), Rc::new(MockTimer::default()));

        let outcome = block_on(chat.submit_user_input("", None, None));
        assert!(matches!(outcome, SubmitOutcome::Skipped));
        let outcome = block_on(chat.submit_user_input("   ", None, None));
        assert!(matches!(outcome, SubmitOutcome::Skipped));

        assert_eq!(api.total_calls(), 0);
        assert!(chat.store().is_empty());
        assert!(!chat.store().is_busy());
    }

    #[test]
    fn test_chat_success_appends_both_sides() {
        let api = Rc::new(MockAssistants::scripted(
            vec![RunStatus::InProgress, RunStatus::Completed],
            "Hi there!",
        ));
        let chat = chat_with(api, Rc::new(MockTimer::default()));
        let mut sub = chat.store().observe();

        let outcome = block_on(chat.submit_user_input("Hello", None, None));

        assert!(matches!(outcome, SubmitOutcome::Delivered));
        let transcript = chat.store().snapshot();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].origin, Origin::User);
        assert_eq!(transcript[0].content, "Hello");
        assert_eq!(transcript[1].origin, Origin::Assistant);
        assert_eq!(transcript[1].kind, MessageKind::Text);
        assert_eq!(transcript[1].content, "Hi there!");
        assert!(transcript[1].error.is_none());

        let events = sub.drain();
        assert_eq!(busy_transitions(&events), vec![true, false]);
        assert!(!chat.store().is_busy());
    }

    #[test]
    fn test_chat_failure_appends_apology() {
        let api = Rc::new(MockAssistants {
            last_error: Some("boom".to_string()),
            ..MockAssistants::scripted(vec![RunStatus::Queued, RunStatus::Failed], "")
        });
        let chat = chat_with(api, Rc::new(MockTimer::default()));
        let mut sub = chat.store().observe();

        let outcome = block_on(chat.submit_user_input("Hello", None, None));

        match outcome {
            SubmitOutcome::Failed(e) => assert!(e.to_string().contains("boom")),
            other => panic!("Expected failure, got {:?}", other),
        }
        let transcript = chat.store().snapshot();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].origin, Origin::Assistant);
        assert_eq!(transcript[1].content, APOLOGY_TEXT);
        assert!(transcript[1].error.as_deref().unwrap().contains("boom"));

        assert_eq!(busy_transitions(&sub.drain()), vec![true, false]);
    }

    #[test]
    fn test_chat_session_failure_appends_apology() {
        let api = Rc::new(MockAssistants::default());
        api.fail_create.set(true);
        let chat = chat_with(api.clone(), Rc::new(MockTimer::default()));

        let outcome = block_on(chat.submit_user_input("Hello", None, None));

        assert!(matches!(outcome, SubmitOutcome::Failed(ChatError::SessionCreation(_))));
        assert_eq!(api.add_calls.get(), 0);
        assert_eq!(chat.store().len(), 2);
        assert!(!chat.store().is_busy());
    }

    #[test]
    fn test_chat_image_and_audio_tie_break() {
        let api = Rc::new(MockAssistants::scripted(vec![RunStatus::Completed], "Nice"));
        let chat = chat_with(api.clone(), Rc::new(MockTimer::default()));

        let outcome = block_on(chat.submit_user_input(
            "hi",
            Some(Attachment::image("X.png")),
            Some(Attachment::audio("Y.mp3")),
        ));

        assert!(matches!(outcome, SubmitOutcome::Delivered));
        let user = &chat.store().snapshot()[0];
        assert_eq!(user.kind, MessageKind::Image);
        assert_eq!(user.attachments.len(), 2);

        let posted = api.posted.borrow();
        let payload: Vec<&str> = posted[0].iter().map(|b| b.as_text()).collect();
        assert_eq!(payload, vec!["hi", "[Image sent: X.png]", "[Audio sent: Y.mp3]"]);
    }

    #[test]
    fn test_chat_attachment_only_submission() {
        let api = Rc::new(MockAssistants::scripted(vec![RunStatus::Completed], "Heard it"));
        let chat = chat_with(api.clone(), Rc::new(MockTimer::default()));

        let outcome = block_on(chat.submit_user_input("", None, Some(Attachment::audio("memo.webm"))));

        assert!(matches!(outcome, SubmitOutcome::Delivered));
        assert_eq!(chat.store().snapshot()[0].kind, MessageKind::Audio);
        assert_eq!(api.posted.borrow()[0], vec![ContentPart::text("[Audio sent: memo.webm]")]);
    }

    #[test]
    fn test_chat_reuses_session_across_messages() {
        let api = Rc::new(MockAssistants::scripted(
            vec![RunStatus::Completed, RunStatus::Completed],
            "ok",
        ));
        let chat = chat_with(api.clone(), Rc::new(MockTimer::default()));

        block_on(chat.submit_user_input("one", None, None));
        block_on(chat.submit_user_input("two", None, None));

        assert_eq!(api.create_calls.get(), 1);
        assert_eq!(chat.store().len(), 4);
    }

    #[test]
    fn test_chat_clear_starts_new_session() {
        let api = Rc::new(MockAssistants::scripted(vec![RunStatus::Completed], "ok"));
        let chat = chat_with(api.clone(), Rc::new(MockTimer::default()));

        block_on(chat.submit_user_input("one", None, None));
        let before = chat.sessions().current_session().unwrap();

        chat.clear_chat();
        assert!(chat.store().is_empty());
        assert!(chat.sessions().current_session().is_none());
        assert_eq!(chat.epoch(), 1);

        let after = block_on(chat.sessions().get_or_create_session()).unwrap();
        assert_ne!(before, after);
        assert_eq!(api.create_calls.get(), 2);
    }

    #[test]
    fn test_chat_clear_discards_in_flight_result() {
        let api = Rc::new(MockAssistants::default());
        let timer = Rc::new(MockTimer {
            yield_on_sleep: true,
            ..MockTimer::default()
        });
        let chat = chat_with(api.clone(), timer);

        let (outcome, ()) = block_on(async {
            futures::join!(chat.submit_user_input("slow question", None, None), async {
                yield_now().await;
                chat.clear_chat();
            })
        });

        assert!(matches!(outcome, SubmitOutcome::Superseded));
        assert!(chat.store().is_empty());
        assert!(!chat.store().is_busy());
        assert!(api.fetch_calls.get() == 0);
    }

    #[test]
    fn test_chat_clear_while_posting_starts_no_run() {
        let api = Rc::new(MockAssistants {
            yield_on_add: true,
            ..MockAssistants::scripted(vec![RunStatus::Completed], "late")
        });
        let chat = chat_with(api.clone(), Rc::new(MockTimer::default()));

        // join! polls in order: the submission parks inside add_message,
        // then the clear runs before it resumes.
        let (outcome, ()) = block_on(async {
            futures::join!(chat.submit_user_input("question", None, None), async {
                chat.clear_chat();
            })
        });

        assert!(matches!(outcome, SubmitOutcome::Superseded));
        assert_eq!(api.add_calls.get(), 1);
        assert_eq!(api.run_calls.get(), 0);
        assert_eq!(api.poll_calls.get(), 0);
        assert!(chat.store().is_empty());
    }

    #[test]
    fn test_chat_retire_drops_in_flight_but_keeps_transcript() {
        let api = Rc::new(MockAssistants::default());
        let timer = Rc::new(MockTimer {
            yield_on_sleep: true,
            ..MockTimer::default()
        });
        let chat = chat_with(api.clone(), timer);

        let (outcome, ()) = block_on(async {
            futures::join!(chat.submit_user_input("question", None, None), async {
                yield_now().await;
                chat.retire();
            })
        });

        assert!(matches!(outcome, SubmitOutcome::Superseded));
        let transcript = chat.store().snapshot();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "question");
        assert!(!chat.store().is_busy());
        assert_eq!(chat.epoch(), 1);
        assert_eq!(api.fetch_calls.get(), 0);
    }

    #[test]
    fn test_chat_retire_when_idle_leaves_busy_untouched() {
        let chat = chat_with(Rc::new(MockAssistants::default()), Rc::new(MockTimer::default()));
        let mut sub = chat.store().observe();
        sub.drain();

        chat.retire();

        assert!(sub.drain().is_empty());
        assert_eq!(chat.epoch(), 1);
    }

    #[test]
    fn test_chat_clear_on_replacement_discards_retired_result() {
        let api = Rc::new(MockAssistants::scripted(
            vec![RunStatus::InProgress, RunStatus::Completed],
            "stale reply",
        ));
        let timer = Rc::new(MockTimer {
            yield_on_sleep: true,
            ..MockTimer::default()
        });
        let store = ConversationStore::new();
        let old = ChatOrchestrator::from_config(&test_config(), store.clone(), api.clone(), timer.clone());
        let replacement = ChatOrchestrator::from_config(&test_config(), store.clone(), api.clone(), timer);

        let (outcome, ()) = block_on(async {
            futures::join!(old.submit_user_input("q", None, None), async {
                old.retire();
                replacement.clear_chat();
            })
        });

        assert!(matches!(outcome, SubmitOutcome::Superseded));
        assert!(store.is_empty());
        assert!(!store.is_busy());
        assert_eq!(api.fetch_calls.get(), 0);
    }

    #[test]
    fn test_chat_busy_stays_on_until_last_submission_finishes() {
        let api = Rc::new(MockAssistants::scripted(
            vec![
                RunStatus::InProgress,
                RunStatus::InProgress,
                RunStatus::Completed,
                RunStatus::InProgress,
                RunStatus::Completed,
            ],
            "ok",
        ));
        let timer = Rc::new(MockTimer {
            yield_on_sleep: true,
            ..MockTimer::default()
        });
        let chat = chat_with(api.clone(), timer);
        let mut sub = chat.store().observe();

        let (a, b) = block_on(async {
            futures::join!(
                chat.submit_user_input("first", None, None),
                chat.submit_user_input("second", None, None)
            )
        });

        assert!(matches!(a, SubmitOutcome::Delivered));
        assert!(matches!(b, SubmitOutcome::Delivered));
        assert_eq!(busy_transitions(&sub.drain()), vec![true, false]);
        assert_eq!(chat.store().len(), 4);
        assert_eq!(api.create_calls.get(), 1);
    }
}
