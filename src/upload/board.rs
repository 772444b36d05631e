use chrono::Utc;
use crate::api::UploadReceipt;
use super::types::{UploadEvent, UploadId, UploadStatus, UploadTask};

/// Highest progress an unfinished task may show; 100 is reserved for success
const MAX_IN_FLIGHT_PROGRESS: u8 = 99;

/// State transition requested for one task
#[derive(Debug, Clone)]
pub enum BoardUpdate {
    Add(UploadTask),
    Start {
        upload_id: UploadId,
        progress: u8,
    },
    Progress {
        upload_id: UploadId,
        progress: u8,
    },
    Succeed {
        upload_id: UploadId,
        receipt: UploadReceipt,
    },
    Fail {
        upload_id: UploadId,
        error: String,
    },
    Dismiss {
        upload_id: UploadId,
    },
}

/// Ordered collection of upload tasks.
///
/// All mutation goes through [`UploadBoard::apply`], which returns the events
/// the change produced. Updates that would break the task state machine, move
/// progress backwards, or name a task that is no longer present are dropped
/// and produce no events.
#[derive(Debug, Clone, Default)]
pub struct UploadBoard {
    tasks: Vec<UploadTask>,
}

impl UploadBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, upload_id: &UploadId) -> Option<&UploadTask> {
        self.tasks.iter().find(|task| task.id == *upload_id)
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids of tasks in a terminal status
    pub fn finished(&self) -> Vec<UploadId> {
        self.tasks
            .iter()
            .filter(|task| task.status.is_terminal())
            .map(|task| task.id)
            .collect()
    }

    fn get_mut(&mut self, upload_id: &UploadId) -> Option<&mut UploadTask> {
        self.tasks.iter_mut().find(|task| task.id == *upload_id)
    }

    pub fn apply(&mut self, update: BoardUpdate) -> Vec<UploadEvent> {
        match update {
            BoardUpdate::Add(task) => {
                if self.get(&task.id).is_some() {
                    return Vec::new();
                }
                let upload_id = task.id;
                self.tasks.push(task);
                vec![UploadEvent::TaskAdded { upload_id }]
            }
            BoardUpdate::Start { upload_id, progress } => {
                let Some(task) = self.transition(&upload_id, UploadStatus::InFlight) else {
                    return Vec::new();
                };
                task.started_at = Some(Utc::now());
                let mut events = vec![state_changed(upload_id, UploadStatus::Pending, UploadStatus::InFlight)];
                events.extend(advance(task, progress));
                events
            }
            BoardUpdate::Progress { upload_id, progress } => match self.get_mut(&upload_id) {
                Some(task) if task.status == UploadStatus::InFlight => advance(task, progress).into_iter().collect(),
                _ => Vec::new(),
            },
            BoardUpdate::Succeed { upload_id, receipt } => {
                let Some(task) = self.transition(&upload_id, UploadStatus::Succeeded) else {
                    return Vec::new();
                };
                task.progress = 100;
                task.receipt = Some(receipt.clone());
                task.finished_at = Some(Utc::now());
                vec![
                    state_changed(upload_id, UploadStatus::InFlight, UploadStatus::Succeeded),
                    UploadEvent::Progress { upload_id, progress: 100 },
                    UploadEvent::Succeeded { upload_id, receipt },
                ]
            }
            BoardUpdate::Fail { upload_id, error } => {
                let Some(task) = self.transition(&upload_id, UploadStatus::Failed) else {
                    return Vec::new();
                };
                task.error = Some(error.clone());
                task.finished_at = Some(Utc::now());
                vec![
                    state_changed(upload_id, UploadStatus::InFlight, UploadStatus::Failed),
                    UploadEvent::Failed { upload_id, error },
                ]
            }
            BoardUpdate::Dismiss { upload_id } => {
                let before = self.tasks.len();
                self.tasks.retain(|task| task.id != upload_id);
                if self.tasks.len() == before {
                    return Vec::new();
                }
                vec![UploadEvent::Dismissed { upload_id }]
            }
        }
    }

    fn transition(&mut self, upload_id: &UploadId, to: UploadStatus) -> Option<&mut UploadTask> {
        let task = self.get_mut(upload_id)?;
        if !UploadStatus::can_transition(task.status, to) {
            tracing::debug!(%upload_id, from = ?task.status, ?to, "ignoring illegal transition");
            return None;
        }
        task.status = to;
        Some(task)
    }
}

fn advance(task: &mut UploadTask, progress: u8) -> Option<UploadEvent> {
    let progress = progress.min(MAX_IN_FLIGHT_PROGRESS);
    if progress <= task.progress {
        return None;
    }
    task.progress = progress;
    Some(UploadEvent::Progress { upload_id: task.id, progress })
}

fn state_changed(upload_id: UploadId, old_state: UploadStatus, new_state: UploadStatus) -> UploadEvent {
    UploadEvent::StateChanged { upload_id, old_state, new_state }
}
