mod board;
mod manager;
mod manager_worker;
mod types;
mod worker;

pub use board::{BoardUpdate, UploadBoard};
pub use manager::{Submission, UploadHandle, UploadSettings, UploadTracker, UploadTrackerHandle};
pub use types::{
    PayloadStream,
    Rejection,
    UploadEvent,
    UploadFile,
    UploadId,
    UploadOutcome,
    UploadStatus,
    UploadTask,
};
