mod client;
mod progress_stream;
pub mod types;

pub use client::HttpBackend;
pub use types::{AnswerResponse, AskRequest, HealthReport, SyllabusStatus, UploadReceipt};
