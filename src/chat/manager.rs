use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use crate::config::TutorConfig;
use crate::core::{Category, Result, TutorBackend, TutorError};
use super::manager_worker::ChatManagerWorker;
use super::types::{ChatCommand, ChatEvent, ChatMessage, ChatSettings, PendingQuestion};

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// First assistant message of a new transcript, if any
    pub greeting: Option<String>,
    pub category: Category,
    pub quiz_mode: bool,
    /// Backend address named in failure diagnostics
    pub backend_address: String,
    pub event_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let config = TutorConfig::default();
        Self::from(&config)
    }
}

impl From<&TutorConfig> for ChatConfig {
    fn from(config: &TutorConfig) -> Self {
        Self {
            greeting: config.greeting.clone(),
            category: config.default_syllabus.clone(),
            quiz_mode: config.quiz_mode,
            backend_address: config.base_url.clone(),
            event_capacity: config.event_capacity,
        }
    }
}

/// Resolves to the assistant message appended for an accepted question
#[derive(Debug)]
pub struct AskHandle {
    reply_rx: oneshot::Receiver<ChatMessage>,
}

impl AskHandle {
    pub(crate) fn new(reply_rx: oneshot::Receiver<ChatMessage>) -> Self {
        Self { reply_rx }
    }

    pub async fn reply(self) -> Result<ChatMessage> {
        self.reply_rx.await.map_err(|_| TutorError::ManagerShutdown)
    }
}

/// Handle to the chat tracker. Clones share one transcript.
#[derive(Clone)]
pub struct ChatTracker {
    command_tx: mpsc::Sender<ChatCommand>,
    event_tx: broadcast::Sender<ChatEvent>,
}

/// Tracker handle plus its worker task
pub struct ChatTrackerHandle {
    pub tracker: ChatTracker,
    pub worker_handle: JoinHandle<()>,
}

impl ChatTrackerHandle {
    /// Waits for a pending question to resolve, then stops the worker
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tracker);
        self.worker_handle
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "chat tracker worker panicked");
                TutorError::internal_error(format!("Worker panic: {}", err))
            })
    }
}

impl ChatTracker {
    pub fn new(backend: Arc<dyn TutorBackend>, config: ChatConfig) -> ChatTrackerHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        let worker_handle = tokio::spawn(ChatManagerWorker::run(
            backend,
            config,
            command_rx,
            event_tx.clone(),
        ));

        ChatTrackerHandle {
            tracker: Self { command_tx, event_tx },
            worker_handle,
        }
    }

    async fn request<T>(&self, command: ChatCommand, reply_rx: oneshot::Receiver<T>) -> Result<T> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| TutorError::ManagerShutdown)?;

        reply_rx.await.map_err(|_| TutorError::ManagerShutdown)
    }

    /// Ask a question. `None` means it was dropped: blank text, or another
    /// question is still pending.
    pub async fn ask(
        &self,
        question: impl Into<String>,
        category: Category,
        quiz_mode: bool,
    ) -> Result<Option<AskHandle>> {
        self.send_ask(question.into(), Some(category), Some(quiz_mode)).await
    }

    /// Ask with the tracker's active category and quiz mode
    pub async fn ask_active(&self, question: impl Into<String>) -> Result<Option<AskHandle>> {
        self.send_ask(question.into(), None, None).await
    }

    async fn send_ask(
        &self,
        question: String,
        category: Option<Category>,
        quiz_mode: Option<bool>,
    ) -> Result<Option<AskHandle>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ChatCommand::Ask { question, category, quiz_mode, reply }, reply_rx).await
    }

    /// Category used by later `ask_active` calls. Past messages keep theirs.
    pub async fn switch_category(&self, category: Category) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ChatCommand::SwitchCategory { category, reply }, reply_rx).await
    }

    pub async fn set_quiz_mode(&self, quiz_mode: bool) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ChatCommand::SetQuizMode { quiz_mode, reply }, reply_rx).await
    }

    pub async fn transcript(&self) -> Result<Vec<ChatMessage>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ChatCommand::GetTranscript { reply }, reply_rx).await
    }

    pub async fn pending(&self) -> Result<Option<PendingQuestion>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ChatCommand::GetPending { reply }, reply_rx).await
    }

    pub async fn is_pending(&self) -> Result<bool> {
        Ok(self.pending().await?.is_some())
    }

    pub async fn settings(&self) -> Result<ChatSettings> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ChatCommand::GetSettings { reply }, reply_rx).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }
}
