use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use crate::api::{AnswerResponse, AskRequest};
use crate::core::{Category, Notice, Result, TutorBackend, TutorError};
use super::manager::{AskHandle, ChatConfig};
use super::transcript::{ChatState, ChatUpdate, compose_answer, failure_reply};
use super::types::{ChatCommand, ChatEvent, ChatMessage, ChatSettings};

/// Owns the transcript and the pending slot
pub(crate) struct ChatManagerWorker {
    backend: Arc<dyn TutorBackend>,
    backend_address: String,
    state: ChatState,
    /// Reply sender of the pending question
    reply_tx: Option<oneshot::Sender<ChatMessage>>,

    event_tx: broadcast::Sender<ChatEvent>,
    answer_tx: mpsc::UnboundedSender<Result<AnswerResponse>>,
    answer_rx: mpsc::UnboundedReceiver<Result<AnswerResponse>>,
}

impl ChatManagerWorker {
    pub(crate) async fn run(
        backend: Arc<dyn TutorBackend>,
        config: ChatConfig,
        mut command_rx: mpsc::Receiver<ChatCommand>,
        event_tx: broadcast::Sender<ChatEvent>,
    ) {
        let (answer_tx, answer_rx) = mpsc::unbounded_channel();
        let settings = ChatSettings {
            category: config.category,
            quiz_mode: config.quiz_mode,
        };
        let mut worker = Self {
            backend,
            backend_address: config.backend_address,
            state: ChatState::new(config.greeting, settings),
            reply_tx: None,
            event_tx,
            answer_tx,
            answer_rx,
        };

        let mut commands_open = true;
        loop {
            tokio::select! {
                command = command_rx.recv(), if commands_open => match command {
                    Some(command) => worker.handle_command(command),
                    None => commands_open = false,
                },
                Some(result) = worker.answer_rx.recv() => {
                    worker.handle_answer(result);
                }
            }

            if !commands_open && !worker.state.is_pending() {
                break;
            }
        }

        tracing::debug!("chat tracker stopped");
    }

    fn handle_command(&mut self, command: ChatCommand) {
        match command {
            ChatCommand::Ask { question, category, quiz_mode, reply } => {
                let handle = self.ask(question, category, quiz_mode);
                let _ = reply.send(handle);
            }
            ChatCommand::SwitchCategory { category, reply } => {
                self.apply(ChatUpdate::SwitchCategory(category));
                let _ = reply.send(());
            }
            ChatCommand::SetQuizMode { quiz_mode, reply } => {
                self.apply(ChatUpdate::SetQuizMode(quiz_mode));
                let _ = reply.send(());
            }
            ChatCommand::GetTranscript { reply } => {
                let _ = reply.send(self.state.messages().to_vec());
            }
            ChatCommand::GetPending { reply } => {
                let _ = reply.send(self.state.pending().cloned());
            }
            ChatCommand::GetSettings { reply } => {
                let _ = reply.send(self.state.settings().clone());
            }
        }
    }

    fn ask(&mut self, question: String, category: Option<Category>, quiz_mode: Option<bool>) -> Option<AskHandle> {
        let settings = self.state.settings();
        let category = category.unwrap_or_else(|| settings.category.clone());
        let quiz_mode = quiz_mode.unwrap_or(settings.quiz_mode);

        let accepted = self.apply(ChatUpdate::Ask { question, category, quiz_mode });
        if !accepted {
            tracing::debug!("question dropped");
            return None;
        }

        let pending = self.state.pending()?;
        let request = AskRequest {
            question: pending.question.clone(),
            syllabus: pending.category.clone(),
            quiz_mode: pending.quiz_mode,
        };

        let backend = self.backend.clone();
        let answer_tx = self.answer_tx.clone();
        tokio::spawn(async move {
            // A panicking backend still has to clear the pending slot
            let request_task = tokio::spawn(async move { backend.ask_question(&request).await });
            let result = request_task.await.unwrap_or_else(|err| {
                tracing::error!(error = %err, "question task aborted");
                Err(TutorError::internal_error(format!("Question task aborted: {}", err)))
            });
            let _ = answer_tx.send(result);
        });

        let (reply_tx, reply_rx) = oneshot::channel();
        self.reply_tx = Some(reply_tx);
        Some(AskHandle::new(reply_rx))
    }

    fn handle_answer(&mut self, result: Result<AnswerResponse>) {
        let Some(pending) = self.state.pending().cloned() else {
            return;
        };

        let text = match result {
            Ok(response) => {
                tracing::info!(
                    syllabus = %pending.category,
                    quiz = response.quiz_questions().len(),
                    "question answered"
                );
                compose_answer(&response.answer, response.quiz_questions())
            }
            Err(err) => {
                tracing::warn!(syllabus = %pending.category, error = %err, "question failed");
                self.emit(ChatEvent::Notice(Notice::error(
                    "Question failed",
                    err.to_string(),
                )));
                failure_reply(&self.backend_address, &pending.category, &err.to_string())
            }
        };

        self.apply(ChatUpdate::Reply { text });

        if let (Some(reply_tx), Some(message)) = (self.reply_tx.take(), self.state.messages().last()) {
            let _ = reply_tx.send(message.clone());
        }
    }

    /// Applies an update and broadcasts its events. Returns whether anything changed.
    fn apply(&mut self, update: ChatUpdate) -> bool {
        let events = self.state.apply(update);
        let changed = !events.is_empty();
        for event in events {
            self.emit(event);
        }
        changed
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }
}
