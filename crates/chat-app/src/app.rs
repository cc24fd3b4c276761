//! Main egui application: composes the panels and owns the chat orchestrator.

use std::rc::Rc;
use std::time::Duration;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use chat_core::chat::{ChatOrchestrator, SubmitOutcome};
use chat_core::conversation::{ConversationStore, Subscription};
use chat_core::ports::{AssistantsPort, TimerPort};
use chat_platform::{BrowserTimer, HttpAssistantsClient};
use chat_types::config::ChatConfig;
use chat_types::message::Attachment;
use chat_ui::panels::settings::{ApplyFeedback, SettingsAction};
use chat_ui::panels::{chat, settings};
use chat_ui::state::{ChatIntent, UiState};
use chat_ui::theme;

pub struct ChatApp {
    ui_state: UiState,
    config: ChatConfig,
    store: ConversationStore,
    subscription: Subscription,
    orchestrator: Rc<ChatOrchestrator>,
    timer: Rc<dyn TimerPort>,
    apply_feedback: Option<ApplyFeedback>,
    first_frame: bool,
}

impl ChatApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = ChatConfig::default();
        let store = ConversationStore::new();
        let subscription = store.observe();
        let timer: Rc<dyn TimerPort> = Rc::new(BrowserTimer::new());
        let orchestrator = Rc::new(Self::build_orchestrator(&config, &store, timer.clone()));

        let mut ui_state = UiState::new();
        ui_state.show_settings = !config.api.is_configured();

        Self {
            ui_state,
            config,
            store,
            subscription,
            orchestrator,
            timer,
            apply_feedback: None,
            first_frame: true,
        }
    }

    fn build_orchestrator(
        config: &ChatConfig,
        store: &ConversationStore,
        timer: Rc<dyn TimerPort>,
    ) -> ChatOrchestrator {
        let api: Rc<dyn AssistantsPort> = Rc::new(HttpAssistantsClient::new(config.api.clone()));
        ChatOrchestrator::from_config(config, store.clone(), api, timer)
    }

    /// Swap in a client built from the edited config. The store is shared,
    /// so the transcript survives; submissions still running on the old
    /// client are dropped and the next send opens a new thread.
    fn apply_config(&mut self) {
        if let Err(e) = self.config.api.validate() {
            log::warn!("Applying incomplete configuration: {}", e);
            self.apply_feedback = Some(ApplyFeedback {
                message: e.to_string(),
                success: false,
            });
        } else {
            self.apply_feedback = Some(ApplyFeedback {
                message: "Applied".to_string(),
                success: true,
            });
        }
        self.orchestrator.retire();
        self.orchestrator = Rc::new(Self::build_orchestrator(
            &self.config,
            &self.store,
            self.timer.clone(),
        ));
        log::info!("Assistant client rebuilt for {}", self.config.api.base_url());
    }

    fn handle_intent(&mut self, intent: ChatIntent, ctx: &egui::Context) {
        match intent {
            ChatIntent::Submit { text, image, audio } => self.dispatch_submit(text, image, audio, ctx),
            ChatIntent::Clear => self.orchestrator.clear_chat(),
        }
    }

    /// Run one submission in the background; the store reports its progress.
    fn dispatch_submit(
        &self,
        text: String,
        image: Option<Attachment>,
        audio: Option<Attachment>,
        ctx: &egui::Context,
    ) {
        let orchestrator = self.orchestrator.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            match orchestrator.submit_user_input(&text, image, audio).await {
                SubmitOutcome::Failed(e) => log::debug!("Submission ended with error: {}", e),
                SubmitOutcome::Superseded => log::debug!("Submission superseded by a clear"),
                SubmitOutcome::Delivered | SubmitOutcome::Skipped => {}
            }
            ctx.request_repaint();
        });
        ctx.request_repaint();
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        let events = self.subscription.drain();
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }

        if self.ui_state.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("Assistant Chat")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.separator();
                let (status, color) = if self.config.api.is_configured() {
                    (
                        format!("Assistant: {}", self.config.api.assistant_id),
                        theme::TEXT_SECONDARY,
                    )
                } else {
                    ("Not configured".to_string(), theme::WARNING)
                };
                ui.label(RichText::new(status).color(color).small());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings {
            SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(350.0)
                .show(ctx, |ui| {
                    let action = settings::settings_panel(
                        ui,
                        &mut self.config,
                        &mut self.ui_state.show_diagnostics,
                        self.apply_feedback.as_ref(),
                    );
                    match action {
                        SettingsAction::ApplyClicked => self.apply_config(),
                        SettingsAction::Changed => self.apply_feedback = None,
                        SettingsAction::None => {}
                    }
                });
        }

        // ── Chat ─────────────────────────────────────────────
        CentralPanel::default().show(ctx, |ui| {
            if let Some(intent) = chat::chat_panel(ui, &mut self.ui_state) {
                self.handle_intent(intent, ctx);
            }
        });
    }
}
