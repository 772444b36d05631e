use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use crate::config::TutorConfig;
use crate::core::{Category, Result, TutorBackend, TutorError};
use super::manager_worker::UploadManagerWorker;
use super::types::{ManagerCommand, Rejection, UploadEvent, UploadFile, UploadId, UploadOutcome, UploadTask};

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Progress shown once a transfer starts
    pub start_checkpoint: u8,
    /// Progress shown once the backend accepted the payload
    pub accepted_checkpoint: u8,
    /// Content types admitted by `submit`
    pub accepted_types: Vec<String>,
    pub event_capacity: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            start_checkpoint: 20,
            accepted_checkpoint: 80,
            accepted_types: vec!["application/pdf".to_string()],
            event_capacity: 256,
        }
    }
}

impl From<&TutorConfig> for UploadSettings {
    fn from(config: &TutorConfig) -> Self {
        Self {
            start_checkpoint: config.start_checkpoint,
            accepted_checkpoint: config.accepted_checkpoint,
            accepted_types: config.accepted_types.clone(),
            event_capacity: config.event_capacity,
        }
    }
}

/// Resolves to the terminal outcome of one transfer, dismissed or not
#[derive(Debug)]
pub struct UploadHandle {
    upload_id: UploadId,
    outcome_rx: oneshot::Receiver<UploadOutcome>,
}

impl UploadHandle {
    pub(crate) fn new(upload_id: UploadId, outcome_rx: oneshot::Receiver<UploadOutcome>) -> Self {
        Self { upload_id, outcome_rx }
    }

    pub fn upload_id(&self) -> UploadId {
        self.upload_id
    }

    pub async fn outcome(self) -> Result<UploadOutcome> {
        self.outcome_rx.await.map_err(|_| TutorError::ManagerShutdown)
    }
}

/// Result of one `submit` call
#[derive(Debug, Default)]
pub struct Submission {
    /// One handle per accepted file, in submission order
    pub handles: Vec<UploadHandle>,
    pub rejected: Vec<Rejection>,
}

impl Submission {
    pub fn ids(&self) -> Vec<UploadId> {
        self.handles.iter().map(UploadHandle::upload_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty() && self.rejected.is_empty()
    }
}

/// Handle to the upload tracker. Clones share one tracker.
#[derive(Clone)]
pub struct UploadTracker {
    command_tx: mpsc::Sender<ManagerCommand>,
    event_tx: broadcast::Sender<UploadEvent>,
}

/// Tracker handle plus its worker task
pub struct UploadTrackerHandle {
    pub tracker: UploadTracker,
    pub worker_handle: JoinHandle<()>,
}

impl UploadTrackerHandle {
    /// Waits for in-flight transfers to report back, then stops the worker.
    /// Clones of the tracker handed out earlier keep the worker alive.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tracker);
        self.worker_handle
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "upload tracker worker panicked");
                TutorError::internal_error(format!("Worker panic: {}", err))
            })
    }
}

impl UploadTracker {
    pub fn new(backend: Arc<dyn TutorBackend>, settings: UploadSettings) -> UploadTrackerHandle {
        let (command_tx, command_rx) = mpsc::channel(100);
        let (event_tx, _) = broadcast::channel(settings.event_capacity.max(1));

        let worker_handle = tokio::spawn(UploadManagerWorker::run(
            backend,
            settings,
            command_rx,
            event_tx.clone(),
        ));

        UploadTrackerHandle {
            tracker: Self { command_tx, event_tx },
            worker_handle,
        }
    }

    async fn request<T>(&self, command: ManagerCommand, reply_rx: oneshot::Receiver<T>) -> Result<T> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| TutorError::ManagerShutdown)?;

        reply_rx.await.map_err(|_| TutorError::ManagerShutdown)
    }

    /// Submit files under one category. Zero files is a no-op.
    pub async fn submit(&self, files: Vec<UploadFile>, category: Category) -> Result<Submission> {
        if files.is_empty() {
            return Ok(Submission::default());
        }

        let (reply, reply_rx) = oneshot::channel();
        self.request(ManagerCommand::Submit { files, category, reply }, reply_rx).await
    }

    /// Remove a task at any status. Returns whether it was present.
    pub async fn dismiss(&self, upload_id: UploadId) -> Result<bool> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ManagerCommand::Dismiss { upload_id, reply }, reply_rx).await
    }

    /// Dismiss every succeeded or failed task
    pub async fn clear_finished(&self) -> Result<usize> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ManagerCommand::ClearFinished { reply }, reply_rx).await
    }

    pub async fn task(&self, upload_id: UploadId) -> Result<Option<UploadTask>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ManagerCommand::GetTask { upload_id, reply }, reply_rx).await
    }

    /// Snapshot of all tasks in submission order
    pub async fn tasks(&self) -> Result<Vec<UploadTask>> {
        let (reply, reply_rx) = oneshot::channel();
        self.request(ManagerCommand::GetAllTasks { reply }, reply_rx).await
    }

    /// Subscribe to tracker events
    ///
    /// A receiver that falls more than `event_capacity` events behind gets a
    /// lagged error and loses the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.event_tx.subscribe()
    }
}
