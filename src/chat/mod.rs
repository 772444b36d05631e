mod manager;
mod manager_worker;
mod transcript;
mod types;

pub use manager::{AskHandle, ChatConfig, ChatTracker, ChatTrackerHandle};
pub use transcript::{ChatState, ChatUpdate, compose_answer, failure_reply};
pub use types::{Author, ChatEvent, ChatMessage, ChatSettings, MessageId, PendingQuestion};
