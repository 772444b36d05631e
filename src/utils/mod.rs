pub mod format;

pub use format::{format_file_size, format_minutes};
