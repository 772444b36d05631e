use std::fmt;
use serde::{Deserialize, Serialize};

/// Syllabus tag scoping uploaded material and question context.
///
/// Tags are trimmed and lower-cased on construction. The backend decides which
/// tags it accepts; the client treats them as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct Category(String);

impl Category {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_lowercase())
    }

    pub fn ncert() -> Self {
        Self::new("ncert")
    }

    pub fn samacheer() -> Self {
        Self::new("samacheer")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-case form used in user-facing text
    pub fn label(&self) -> String {
        self.0.to_uppercase()
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::ncert()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Toast content published alongside state changes. Views may ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, description)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, description)
    }
}
