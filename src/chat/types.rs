use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;
use crate::core::{Category, Notice};
use super::manager::AskHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// One transcript entry. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
    pub category: Option<Category>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, category: Category) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            author: Author::User,
            timestamp: Utc::now(),
            category: Some(category),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            author: Author::Assistant,
            timestamp: Utc::now(),
            category: None,
        }
    }
}

/// The single outstanding question of a tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingQuestion {
    pub question: String,
    pub category: Category,
    pub quiz_mode: bool,
    pub asked_at: DateTime<Utc>,
}

/// Defaults applied by `ask_active`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSettings {
    pub category: Category,
    pub quiz_mode: bool,
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    MessageAppended(ChatMessage),

    PendingChanged {
        pending: bool,
    },

    CategoryChanged(Category),

    QuizModeChanged(bool),

    Notice(Notice),
}

/// Chat tracker commands
pub(crate) enum ChatCommand {
    Ask {
        question: String,
        category: Option<Category>,
        quiz_mode: Option<bool>,
        reply: oneshot::Sender<Option<AskHandle>>,
    },

    SwitchCategory {
        category: Category,
        reply: oneshot::Sender<()>,
    },

    SetQuizMode {
        quiz_mode: bool,
        reply: oneshot::Sender<()>,
    },

    GetTranscript {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },

    GetPending {
        reply: oneshot::Sender<Option<PendingQuestion>>,
    },

    GetSettings {
        reply: oneshot::Sender<ChatSettings>,
    },
}
