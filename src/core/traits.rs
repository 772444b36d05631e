use std::sync::Arc;
use async_trait::async_trait;
use crate::api::types::{AnswerResponse, AskRequest, HealthReport, SyllabusStatus, UploadReceipt};
use crate::upload::UploadFile;
use super::errors::Result;
use super::types::Category;

/// Stage signal emitted by a backend while an upload is on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSignal {
    /// Request body bytes handed to the transport so far
    BytesSent { sent: u64, total: u64 },
    /// Success status received, response body not decoded yet
    Accepted,
}

pub type ProgressCallback = Arc<dyn Fn(TransferSignal) + Send + Sync>;

/// Remote tutoring service - both trackers talk to the network only through this
#[async_trait]
pub trait TutorBackend: Send + Sync {
    /// Send one file with its category to the ingestion endpoint
    async fn upload_pdf(
        &self,
        file: &UploadFile,
        category: &Category,
        on_progress: ProgressCallback,
    ) -> Result<UploadReceipt>;

    /// Ask one question against the material of a category
    async fn ask_question(&self, request: &AskRequest) -> Result<AnswerResponse>;

    /// Whether material has been ingested for a category
    async fn syllabus_status(&self, category: &Category) -> Result<SyllabusStatus>;

    async fn health(&self) -> Result<HealthReport>;
}
