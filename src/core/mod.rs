mod errors;
mod traits;
mod types;

pub use errors::{Result, TutorError};
pub use traits::{ProgressCallback, TransferSignal, TutorBackend};
pub use types::{Category, Notice, NoticeLevel};
