use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::mpsc;
use crate::api::UploadReceipt;
use crate::core::{Category, ProgressCallback, Result, TransferSignal, TutorBackend, TutorError};
use super::manager::UploadSettings;
use super::types::{UploadFile, UploadId};

/// What a running transfer reports back to the tracker
#[derive(Debug)]
pub(crate) enum TransferReport {
    Started,
    Progress(u8),
    Finished(Result<UploadReceipt>),
}

/// Drives one file through the upload endpoint. It never touches tracker
/// state; every change is reported by id and applied by the tracker.
pub(crate) struct UploadWorker {
    pub(crate) backend: Arc<dyn TutorBackend>,
    pub(crate) settings: UploadSettings,
    pub(crate) report_tx: mpsc::UnboundedSender<(UploadId, TransferReport)>,
}

impl UploadWorker {
    pub async fn run(self, upload_id: UploadId, file: UploadFile, category: Category) {
        let _ = self.report_tx.send((upload_id, TransferReport::Started));

        let callback = self.progress_callback(upload_id);
        let name = file.name().to_string();
        let backend = self.backend.clone();

        // A panicking backend still has to produce a terminal report
        let transfer = tokio::spawn(async move { backend.upload_pdf(&file, &category, callback).await });
        let result = transfer.await.unwrap_or_else(|err| {
            tracing::error!(%upload_id, file = %name, error = %err, "upload task aborted");
            Err(TutorError::internal_error(format!("Upload task aborted: {}", err)))
        });

        match &result {
            Ok(receipt) => tracing::info!(
                %upload_id,
                file = %name,
                pages = receipt.pages_processed,
                "upload succeeded"
            ),
            Err(err) => tracing::warn!(%upload_id, file = %name, error = %err, "upload failed"),
        }

        let _ = self.report_tx.send((upload_id, TransferReport::Finished(result)));
    }

    /// Maps transfer signals onto the checkpoint range, sending only increases
    fn progress_callback(&self, upload_id: UploadId) -> ProgressCallback {
        let report_tx = self.report_tx.clone();
        let start = self.settings.start_checkpoint;
        let accepted = self.settings.accepted_checkpoint;
        let last = AtomicU8::new(start);

        Arc::new(move |signal| {
            let progress = match signal {
                TransferSignal::BytesSent { sent, total } => interpolate(start, accepted, sent, total),
                TransferSignal::Accepted => accepted,
            };
            if last.fetch_max(progress, Ordering::Relaxed) < progress {
                let _ = report_tx.send((upload_id, TransferReport::Progress(progress)));
            }
        })
    }
}

/// Linear position of `sent / total` between two checkpoints
pub(crate) fn interpolate(start: u8, end: u8, sent: u64, total: u64) -> u8 {
    if total == 0 || end <= start {
        return start;
    }
    let span = u64::from(end - start);
    let done = sent.min(total);
    start + (span * done / total) as u8
}
