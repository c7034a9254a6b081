use crate::audio::level_monitor::MeterCommand;
use crate::audio::playback::{PlaybackCommand, PlaybackEvent};
use crate::backend::{AnswerEvent, AskRequest};
use crate::recognizer_bridge::{RecognizerCommand, RecognizerEvent};
use crate::state_machine::SystemState;
use crate::ui_bridge::{UiEvent, UiPush};
use tokio::sync::mpsc;

pub const STATUS_IDLE: &str = "🎤 Tap and hold microphone to speak";
pub const STATUS_SELECT_DOCS: &str = "📄 Select documents to start";
pub const STATUS_LISTENING: &str = "🎙️ Listening... Release to send";
pub const STATUS_PROCESSING: &str = "⚡ Processing your question...";
pub const STATUS_SPEAKING: &str = "🔊 AI is speaking...";
pub const STATUS_MIC_DENIED: &str = "🚫 Microphone access denied";

/// Central push-to-talk state machine. Consumes events from the UI bridge,
/// the recognizer bridge, the backend, and the playback thread; emits
/// commands back out over channels and never blocks on I/O itself.
///
/// Gesture contract: one hold produces at most one question. The recognizer
/// may end and restart many times during a single hold; only the newest
/// transcript survives, and the question is issued exactly once, on release,
/// and only when a non-empty transcript exists.
pub struct VoiceController {
    state: SystemState,
    /// The hold gesture is active (press seen, release not yet).
    holding: bool,
    /// At least one recognition result arrived during this hold.
    has_result: bool,
    transcript: String,
    selected_documents: Vec<String>,
    ui_tx: mpsc::Sender<UiPush>,
    rec_tx: mpsc::Sender<RecognizerCommand>,
    meter_tx: mpsc::Sender<MeterCommand>,
    ask_tx: mpsc::Sender<AskRequest>,
    speak_tx: mpsc::Sender<String>,
    play_tx: mpsc::Sender<PlaybackCommand>,
}

impl VoiceController {
    pub fn new(
        ui_tx: mpsc::Sender<UiPush>,
        rec_tx: mpsc::Sender<RecognizerCommand>,
        meter_tx: mpsc::Sender<MeterCommand>,
        ask_tx: mpsc::Sender<AskRequest>,
        speak_tx: mpsc::Sender<String>,
        play_tx: mpsc::Sender<PlaybackCommand>,
    ) -> Self {
        Self {
            state: SystemState::Idle,
            holding: false,
            has_result: false,
            transcript: String::new(),
            selected_documents: Vec::new(),
            ui_tx,
            rec_tx,
            meter_tx,
            ask_tx,
            speak_tx,
            play_tx,
        }
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub async fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Press => self.on_press().await,
            UiEvent::Release => self.on_release().await,
            UiEvent::Interrupt => self.on_interrupt().await,
            UiEvent::SelectDocuments(ids) => {
                log::info!("Document selection changed: {} documents", ids.len());
                self.selected_documents = ids;
                if self.state == SystemState::Idle {
                    self.push_status(SystemState::Idle, self.idle_status()).await;
                }
            }
        }
    }

    async fn on_press(&mut self) {
        // A press is only meaningful from rest; while listening, processing
        // or speaking it is ignored.
        if self.state != SystemState::Idle {
            log::debug!("Ignoring press in state {:?}", self.state);
            return;
        }
        if self.selected_documents.is_empty() {
            self.push_toast(
                "warning",
                "No documents selected",
                "Please select at least one document to ask questions about.",
            )
            .await;
            return;
        }

        self.holding = true;
        self.has_result = false;
        self.transcript.clear();
        self.state = SystemState::Listening;
        self.push_status(SystemState::Listening, STATUS_LISTENING.to_string())
            .await;
        self.send_rec(RecognizerCommand::Start).await;
        self.send_meter(MeterCommand::Start).await;
    }

    async fn on_release(&mut self) {
        if !self.holding {
            return;
        }
        self.holding = false;
        self.send_rec(RecognizerCommand::Stop).await;
        self.send_meter(MeterCommand::Stop).await;

        let question = self.transcript.trim().to_string();
        if self.has_result && !question.is_empty() {
            self.state = SystemState::Processing;
            self.push_status(SystemState::Processing, STATUS_PROCESSING.to_string())
                .await;
            let req = AskRequest {
                question,
                document_ids: self.selected_documents.clone(),
            };
            if let Err(e) = self.ask_tx.send(req).await {
                log::error!("Failed to queue question: {}", e);
                self.state = SystemState::Idle;
                self.push_status(SystemState::Idle, self.idle_status()).await;
            }
        } else {
            log::info!("Hold released without a transcript");
            self.state = SystemState::Idle;
            self.push_status(SystemState::Idle, self.idle_status()).await;
        }
    }

    async fn on_interrupt(&mut self) {
        // The playback thread ignores Stop when nothing is playing.
        self.send_play(PlaybackCommand::Stop).await;
        match self.state {
            SystemState::Speaking => {
                self.state = SystemState::Idle;
                self.push_status(SystemState::Idle, self.idle_status()).await;
            }
            // Re-assert the idle prompt even when nothing was playing.
            SystemState::Idle => {
                self.push_status(SystemState::Idle, self.idle_status()).await;
            }
            // A stray interrupt must not clobber an active capture or an
            // in-flight question.
            SystemState::Listening | SystemState::Processing => {}
        }
    }

    pub async fn handle_recognizer_event(&mut self, event: RecognizerEvent) {
        match event {
            RecognizerEvent::Result(text) => {
                log::info!("Recognition result: {}", text);
                // Only the newest transcript is kept.
                self.transcript = text;
                self.has_result = true;
            }
            RecognizerEvent::Ended => {
                // The recognizer times out on its own; keep it running for
                // as long as the hold lasts.
                if self.holding {
                    log::debug!("Recognizer ended mid-hold, restarting");
                    self.send_rec(RecognizerCommand::Start).await;
                }
            }
            RecognizerEvent::Error(reason) => {
                log::error!("Recognition error: {}", reason);
                self.holding = false;
                self.has_result = false;
                self.send_meter(MeterCommand::Stop).await;
                self.state = SystemState::Idle;
                if reason == "not-allowed" {
                    self.push_status(SystemState::Idle, STATUS_MIC_DENIED.to_string())
                        .await;
                    self.push_toast(
                        "error",
                        "Microphone access denied",
                        "Please allow microphone access to use voice input.",
                    )
                    .await;
                } else {
                    self.push_status(SystemState::Idle, format!("❌ Error: {}", reason))
                        .await;
                }
            }
        }
    }

    pub async fn handle_answer_event(&mut self, event: AnswerEvent) {
        match event {
            AnswerEvent::Answer(answer) => {
                if self.state != SystemState::Processing {
                    log::warn!("Dropping answer received in state {:?}", self.state);
                    return;
                }
                for section in &answer.relevant_sections {
                    log::debug!(
                        "Relevant section {} (similarity {:.3})",
                        section.id,
                        section.similarity
                    );
                }
                self.state = SystemState::Speaking;
                self.push_status(SystemState::Speaking, STATUS_SPEAKING.to_string())
                    .await;
                if let Err(e) = self.speak_tx.send(answer.answer).await {
                    log::error!("Failed to queue answer for synthesis: {}", e);
                    self.state = SystemState::Idle;
                    self.push_status(SystemState::Idle, self.idle_status()).await;
                }
            }
            AnswerEvent::Failed(message) => {
                self.state = SystemState::Idle;
                self.push_status(SystemState::Idle, format!("❌ Error: {}", message))
                    .await;
                self.push_toast("error", "Request failed", &message).await;
            }
        }
    }

    pub async fn handle_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Finished | PlaybackEvent::Stopped => {
                if self.state == SystemState::Speaking {
                    self.state = SystemState::Idle;
                    self.push_status(SystemState::Idle, self.idle_status()).await;
                }
            }
            PlaybackEvent::Error(message) => {
                log::error!("Playback failed: {}", message);
                self.state = SystemState::Idle;
                self.push_status(SystemState::Idle, format!("❌ Error: {}", message))
                    .await;
                self.push_toast("error", "Playback failed", &message).await;
            }
        }
    }

    /// Release external resources before the process exits.
    pub async fn shutdown(&mut self) {
        if self.holding {
            self.send_rec(RecognizerCommand::Stop).await;
        }
        self.send_meter(MeterCommand::Stop).await;
        self.send_play(PlaybackCommand::Stop).await;
    }

    fn idle_status(&self) -> String {
        if self.selected_documents.is_empty() {
            STATUS_SELECT_DOCS.to_string()
        } else {
            STATUS_IDLE.to_string()
        }
    }

    async fn push_status(&self, state: SystemState, text: String) {
        if let Err(e) = self.ui_tx.send(UiPush::Status { state, text }).await {
            log::error!("Failed to push status to UI: {}", e);
        }
    }

    async fn push_toast(&self, level: &'static str, title: &'static str, text: &str) {
        let push = UiPush::Toast {
            level,
            title,
            text: text.to_string(),
        };
        if let Err(e) = self.ui_tx.send(push).await {
            log::error!("Failed to push toast to UI: {}", e);
        }
    }

    async fn send_rec(&self, cmd: RecognizerCommand) {
        if let Err(e) = self.rec_tx.send(cmd).await {
            log::error!("Failed to send recognizer command: {}", e);
        }
    }

    async fn send_meter(&self, cmd: MeterCommand) {
        if let Err(e) = self.meter_tx.send(cmd).await {
            log::error!("Failed to send meter command: {}", e);
        }
    }

    async fn send_play(&self, cmd: PlaybackCommand) {
        if let Err(e) = self.play_tx.send(cmd).await {
            log::error!("Failed to send playback command: {}", e);
        }
    }
}
