//! Client configuration, read from `tutor.toml`

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::{Category, Result, TutorError};

static CONFIG: OnceLock<TutorConfig> = OnceLock::new();

pub const CONFIG_FILE: &str = "tutor.toml";

/// Overrides `base_url` when set
pub const BASE_URL_ENV: &str = "TUTOR_BASE_URL";

const DEFAULT_GREETING: &str = "Hello! I'm your AI tutor. I can help you with questions from NCERT and \
    Samacheer Kalvi syllabus. Upload some PDFs and ask me anything!";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TutorConfig {
    pub base_url: String,
    pub default_syllabus: Category,
    pub quiz_mode: bool,
    /// No timeout when unset
    pub request_timeout_secs: Option<u64>,
    pub start_checkpoint: u8,
    pub accepted_checkpoint: u8,
    pub accepted_types: Vec<String>,
    pub greeting: Option<String>,
    pub event_capacity: usize,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            default_syllabus: Category::ncert(),
            quiz_mode: false,
            request_timeout_secs: None,
            start_checkpoint: 20,
            accepted_checkpoint: 80,
            accepted_types: vec!["application/pdf".to_string()],
            greeting: Some(DEFAULT_GREETING.to_string()),
            event_capacity: 256,
        }
    }
}

impl TutorConfig {
    /// Defaults when the file does not exist
    pub fn load_config(path: impl AsRef<Path>) -> Result<TutorConfig> {
        let path = path.as_ref();
        let config = if path.exists() {
            let config_str = fs::read_to_string(path)?;
            Self::from_toml_str(&config_str)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        let config = config.with_base_url_override(std::env::var(BASE_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<TutorConfig> {
        let config: TutorConfig = toml::from_str(config_str)
            .map_err(|err| TutorError::config(format!("Can't parse config: {}", err)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url.filter(|url| !url.trim().is_empty()) {
            self.base_url = base_url.trim().to_string();
        }
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.start_checkpoint >= self.accepted_checkpoint || self.accepted_checkpoint >= 100 {
            return Err(TutorError::config(format!(
                "Checkpoints must satisfy start < accepted < 100, got {} and {}",
                self.start_checkpoint, self.accepted_checkpoint
            )));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(TutorError::config("request_timeout_secs must be positive, omit it for no timeout"));
        }
        if self.accepted_types.is_empty() {
            return Err(TutorError::config("accepted_types must not be empty"));
        }
        Ok(())
    }
}

/// Load the process-wide config once. Later calls keep the first value.
pub fn init_config(path: impl AsRef<Path>) -> Result<()> {
    if CONFIG.get().is_none() {
        let config = TutorConfig::load_config(path)?;
        let _ = CONFIG.set(config);
    }
    Ok(())
}

/// Process-wide config, defaults if `init_config` was never called
pub fn get_config() -> TutorConfig {
    CONFIG.get_or_init(TutorConfig::default).clone()
}
