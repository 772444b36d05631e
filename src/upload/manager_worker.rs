use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use crate::api::UploadReceipt;
use crate::core::{Category, Notice, TutorBackend};
use super::board::{BoardUpdate, UploadBoard};
use super::manager::{Submission, UploadHandle, UploadSettings};
use super::types::{ManagerCommand, Rejection, UploadEvent, UploadFile, UploadId, UploadOutcome, UploadTask};
use super::worker::{TransferReport, UploadWorker};

/// Owns the board. Commands and transfer reports are applied one at a time,
/// so no transfer ever writes tracker state itself.
pub(crate) struct UploadManagerWorker {
    backend: Arc<dyn TutorBackend>,
    settings: UploadSettings,
    board: UploadBoard,
    /// Outcome senders of transfers still running, kept across dismissal
    outcomes: HashMap<UploadId, oneshot::Sender<UploadOutcome>>,

    event_tx: broadcast::Sender<UploadEvent>,
    report_tx: mpsc::UnboundedSender<(UploadId, TransferReport)>,
    report_rx: mpsc::UnboundedReceiver<(UploadId, TransferReport)>,
}

impl UploadManagerWorker {
    pub(crate) async fn run(
        backend: Arc<dyn TutorBackend>,
        settings: UploadSettings,
        mut command_rx: mpsc::Receiver<ManagerCommand>,
        event_tx: broadcast::Sender<UploadEvent>,
    ) {
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let mut worker = Self {
            backend,
            settings,
            board: UploadBoard::new(),
            outcomes: HashMap::new(),
            event_tx,
            report_tx,
            report_rx,
        };

        let mut commands_open = true;
        loop {
            tokio::select! {
                command = command_rx.recv(), if commands_open => match command {
                    Some(command) => worker.handle_command(command),
                    None => commands_open = false,
                },
                Some((upload_id, report)) = worker.report_rx.recv() => {
                    worker.handle_report(upload_id, report);
                }
            }

            if !commands_open && worker.outcomes.is_empty() {
                break;
            }
        }

        tracing::debug!("upload tracker stopped");
    }

    fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::Submit { files, category, reply } => {
                let submission = self.submit(files, category);
                let _ = reply.send(submission);
            }
            ManagerCommand::Dismiss { upload_id, reply } => {
                let removed = self.apply(BoardUpdate::Dismiss { upload_id });
                let _ = reply.send(removed);
            }
            ManagerCommand::ClearFinished { reply } => {
                let removed = self
                    .board
                    .finished()
                    .into_iter()
                    .filter(|upload_id| self.apply(BoardUpdate::Dismiss { upload_id: *upload_id }))
                    .count();
                let _ = reply.send(removed);
            }
            ManagerCommand::GetTask { upload_id, reply } => {
                let _ = reply.send(self.board.get(&upload_id).cloned());
            }
            ManagerCommand::GetAllTasks { reply } => {
                let _ = reply.send(self.board.tasks().to_vec());
            }
        }
    }

    fn submit(&mut self, files: Vec<UploadFile>, category: Category) -> Submission {
        let mut submission = Submission::default();
        let mut accepted = Vec::new();

        for file in files {
            if !file.is_accepted(&self.settings.accepted_types) {
                let rejection = Rejection {
                    name: file.name().to_string(),
                    content_type: file.content_type(),
                    reason: "Please upload only PDF files".to_string(),
                };
                tracing::warn!(file = %rejection.name, content_type = %rejection.content_type, "rejected upload");
                self.emit(UploadEvent::Rejected(rejection.clone()));
                submission.rejected.push(rejection);
                continue;
            }

            let task = UploadTask::new(&file, category.clone());
            let upload_id = task.id;
            self.apply(BoardUpdate::Add(task));

            let (outcome_tx, outcome_rx) = oneshot::channel();
            self.outcomes.insert(upload_id, outcome_tx);
            submission.handles.push(UploadHandle::new(upload_id, outcome_rx));
            accepted.push((upload_id, file));
        }

        if !submission.rejected.is_empty() {
            self.emit(UploadEvent::Notice(Notice::error(
                "Invalid file type",
                "Please upload only PDF files",
            )));
        }

        // Every task is on the board before any transfer reports back
        for (upload_id, file) in accepted {
            let worker = UploadWorker {
                backend: self.backend.clone(),
                settings: self.settings.clone(),
                report_tx: self.report_tx.clone(),
            };
            tokio::spawn(worker.run(upload_id, file, category.clone()));
        }

        submission
    }

    fn handle_report(&mut self, upload_id: UploadId, report: TransferReport) {
        match report {
            TransferReport::Started => {
                self.apply(BoardUpdate::Start {
                    upload_id,
                    progress: self.settings.start_checkpoint,
                });
            }
            TransferReport::Progress(progress) => {
                self.apply(BoardUpdate::Progress { upload_id, progress });
            }
            TransferReport::Finished(Ok(receipt)) => {
                let name = self.board.get(&upload_id).map(|task| task.name.clone());
                let applied = self.apply(BoardUpdate::Succeed {
                    upload_id,
                    receipt: receipt.clone(),
                });
                if applied {
                    let name = name.unwrap_or_else(|| receipt.filename.clone());
                    self.emit(UploadEvent::Notice(success_notice(&name, &receipt)));
                }
                self.resolve(upload_id, UploadOutcome::Succeeded(receipt));
            }
            TransferReport::Finished(Err(err)) => {
                let error = err.to_string();
                let name = self.board.get(&upload_id).map(|task| task.name.clone());
                let applied = self.apply(BoardUpdate::Fail {
                    upload_id,
                    error: error.clone(),
                });
                if applied {
                    let name = name.unwrap_or_default();
                    self.emit(UploadEvent::Notice(failure_notice(&name, &error)));
                }
                self.resolve(upload_id, UploadOutcome::Failed(error));
            }
        }
    }

    /// Hands the outcome to the submitter's handle after the board has it
    fn resolve(&mut self, upload_id: UploadId, outcome: UploadOutcome) {
        if let Some(outcome_tx) = self.outcomes.remove(&upload_id) {
            let _ = outcome_tx.send(outcome);
        }
    }

    /// Applies an update and broadcasts its events. Returns whether anything changed.
    fn apply(&mut self, update: BoardUpdate) -> bool {
        let events = self.board.apply(update);
        let changed = !events.is_empty();
        for event in events {
            self.emit(event);
        }
        changed
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.event_tx.send(event);
    }
}

pub(crate) fn success_notice(name: &str, receipt: &UploadReceipt) -> Notice {
    Notice::success(
        "File uploaded successfully",
        format!(
            "{} is ready for questions ({} pages processed, syllabus: {})",
            name, receipt.pages_processed, receipt.syllabus
        ),
    )
}

pub(crate) fn failure_notice(name: &str, error: &str) -> Notice {
    Notice::error("Upload failed", format!("Failed to upload {}: {}", name, error))
}
