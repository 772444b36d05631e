pub mod api;
pub mod chat;
pub mod config;
pub mod core;
pub mod logging;
pub mod progress;
pub mod upload;
pub mod utils;

// Commonly used types
pub use api::{AnswerResponse, AskRequest, HealthReport, HttpBackend, SyllabusStatus, UploadReceipt};
pub use chat::{AskHandle, ChatConfig, ChatEvent, ChatMessage, ChatTracker, ChatTrackerHandle};
pub use config::TutorConfig;
pub use crate::core::{Category, Notice, NoticeLevel, Result, TransferSignal, TutorBackend, TutorError};
pub use progress::LearningProgress;
pub use upload::{
    Submission,
    UploadEvent,
    UploadFile,
    UploadHandle,
    UploadId,
    UploadOutcome,
    UploadSettings,
    UploadStatus,
    UploadTask,
    UploadTracker,
    UploadTrackerHandle,
};
