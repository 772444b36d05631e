mod summary;

pub use summary::{Activity, ActivityGrade, LearningProgress};
