//! Learning progress summary and the figures derived from it

use std::fmt;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::core::Result;
use crate::utils::format_minutes;

/// Progress snapshot, in the camelCase shape the dashboard data uses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningProgress {
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Days
    pub current_streak: u32,
    /// Minutes
    pub time_spent: u64,
    pub topics_completed: u32,
    pub total_topics: u32,
    pub recent_activity: Vec<Activity>,
    pub weak_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub topic: String,
    pub score: u32,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityGrade {
    Strong,
    Fair,
    Weak,
}

impl ActivityGrade {
    pub fn from_score(score: u32) -> Self {
        match score {
            85.. => ActivityGrade::Strong,
            70.. => ActivityGrade::Fair,
            _ => ActivityGrade::Weak,
        }
    }
}

impl fmt::Display for ActivityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityGrade::Strong => "strong",
            ActivityGrade::Fair => "fair",
            ActivityGrade::Weak => "weak",
        };
        f.write_str(label)
    }
}

impl Activity {
    pub fn grade(&self) -> ActivityGrade {
        ActivityGrade::from_score(self.score)
    }
}

fn percentage(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

impl LearningProgress {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Percentage of correct answers, 0 with no questions
    pub fn accuracy(&self) -> u32 {
        percentage(self.correct_answers, self.total_questions)
    }

    pub fn topic_completion(&self) -> u32 {
        percentage(self.topics_completed, self.total_topics)
    }

    pub fn time_spent_label(&self) -> String {
        format_minutes(self.time_spent)
    }
}
