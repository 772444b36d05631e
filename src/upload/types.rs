use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{Stream, stream};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;
use uuid::Uuid;
use crate::api::UploadReceipt;
use crate::core::{Category, Notice, Result, TutorError};
use super::manager::Submission;

/// Chunk size used when streaming a payload
const PAYLOAD_CHUNK_SIZE: usize = 64 * 1024;

pub type PayloadStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Upload task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum UploadStatus {
    /// Accepted, transfer not started
    Pending,
    /// Request on the wire or awaiting its response
    InFlight,
    Succeeded,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn can_transition(from: Self, to: Self) -> bool {
        use UploadStatus::*;

        matches!((from, to), (Pending, InFlight) | (InFlight, Succeeded) | (InFlight, Failed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadTask {
    pub id: UploadId,
    pub name: String,
    pub size_bytes: u64,
    pub category: Category,
    pub status: UploadStatus,
    /// Percentage in 0..=100
    pub progress: u8,
    pub receipt: Option<UploadReceipt>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadTask {
    pub fn new(file: &UploadFile, category: Category) -> Self {
        Self {
            id: UploadId::new(),
            name: file.name().to_string(),
            size_bytes: file.size_bytes(),
            category,
            status: UploadStatus::Pending,
            progress: 0,
            receipt: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Memory(Bytes),
}

/// A file submitted for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    size_bytes: u64,
    content_type: Option<String>,
    source: FileSource,
}

impl UploadFile {
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(TutorError::UnsupportedFile(format!("{} is not a file", path.display())));
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| TutorError::UnsupportedFile(format!("Unreadable file name: {}", path.display())))?
            .to_string();

        Ok(Self {
            name,
            size_bytes: metadata.len(),
            content_type: None,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size_bytes: data.len() as u64,
            content_type: None,
            source: FileSource::Memory(data),
        }
    }

    /// Override the content type guessed from the file name
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn content_type(&self) -> String {
        if let Some(content_type) = &self.content_type {
            return content_type.clone();
        }

        let is_pdf = Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            "application/pdf".to_string()
        } else {
            "application/octet-stream".to_string()
        }
    }

    pub fn is_accepted(&self, accepted_types: &[String]) -> bool {
        let content_type = self.content_type();
        accepted_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(&content_type))
    }

    /// Open the payload as a chunked byte stream
    pub async fn open(&self) -> Result<PayloadStream> {
        match &self.source {
            FileSource::Path(path) => {
                let file = File::open(path).await?;
                Ok(Box::pin(ReaderStream::with_capacity(file, PAYLOAD_CHUNK_SIZE)))
            }
            FileSource::Memory(data) => {
                let data = data.clone();
                let chunks: Vec<io::Result<Bytes>> = (0..data.len())
                    .step_by(PAYLOAD_CHUNK_SIZE)
                    .map(|start| Ok(data.slice(start..data.len().min(start + PAYLOAD_CHUNK_SIZE))))
                    .collect();
                Ok(Box::pin(stream::iter(chunks)))
            }
        }
    }
}

/// A file refused at submission time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub name: String,
    pub content_type: String,
    pub reason: String,
}

/// Terminal result of one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Succeeded(UploadReceipt),
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    TaskAdded {
        upload_id: UploadId,
    },

    StateChanged {
        upload_id: UploadId,
        old_state: UploadStatus,
        new_state: UploadStatus,
    },

    Progress {
        upload_id: UploadId,
        progress: u8,
    },

    Succeeded {
        upload_id: UploadId,
        receipt: UploadReceipt,
    },

    Failed {
        upload_id: UploadId,
        error: String,
    },

    Dismissed {
        upload_id: UploadId,
    },

    Rejected(Rejection),

    Notice(Notice),
}

/// Upload tracker commands
pub(crate) enum ManagerCommand {
    Submit {
        files: Vec<UploadFile>,
        category: Category,
        reply: oneshot::Sender<Submission>,
    },

    Dismiss {
        upload_id: UploadId,
        reply: oneshot::Sender<bool>,
    },

    /// Dismiss every task in a terminal status
    ClearFinished {
        reply: oneshot::Sender<usize>,
    },

    GetTask {
        upload_id: UploadId,
        reply: oneshot::Sender<Option<UploadTask>>,
    },

    GetAllTasks {
        reply: oneshot::Sender<Vec<UploadTask>>,
    },
}
