use serde::{Deserialize, Serialize};
use crate::core::Category;

/// Success body of `POST /upload-pdf/`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    pub filename: String,
    pub syllabus: String,
    /// Number of indexed sections the backend produced from the file
    pub pages_processed: u32,
}

/// Body of `POST /ask-question/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub syllabus: Category,
    pub quiz_mode: bool,
}

/// Success body of `POST /ask-question/`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    #[serde(default)]
    pub quiz_questions: Option<Vec<String>>,
    #[serde(default)]
    pub syllabus: Option<String>,
}

impl AnswerResponse {
    pub fn quiz_questions(&self) -> &[String] {
        self.quiz_questions.as_deref().unwrap_or_default()
    }
}

/// Error body of a failed request. `detail` is a string for handled errors and
/// a list of objects for request validation errors.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Body of `GET /status/{syllabus}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyllabusStatus {
    pub syllabus: String,
    pub documents_uploaded: bool,
    pub status: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub ncert_ready: bool,
    #[serde(default)]
    pub samacheer_ready: bool,
    #[serde(default)]
    pub openai_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_quiz_list_reads_as_empty() {
        let body = r#"{"answer":"42","quiz_questions":null,"timestamp":"2024-01-15T10:00:00.123","syllabus":"ncert"}"#;
        let response: AnswerResponse = serde_json::from_str(body).unwrap();
        assert!(response.quiz_questions().is_empty());
        assert_eq!(response.syllabus.as_deref(), Some("ncert"));
    }

    #[test]
    fn validation_detail_is_rendered_as_json() {
        let body = r#"{"detail":[{"loc":["body","question"],"msg":"field required"}]}"#;
        let detail: ErrorDetail = serde_json::from_str(body).unwrap();
        assert!(detail.message().contains("field required"));

        let detail: ErrorDetail = serde_json::from_str(r#"{"detail":"No text found in PDF"}"#).unwrap();
        assert_eq!(detail.message(), "No text found in PDF");
    }

    #[test]
    fn ask_request_serializes_wire_names() {
        let request = AskRequest {
            question: "What is photosynthesis?".to_string(),
            syllabus: Category::samacheer(),
            quiz_mode: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["syllabus"], "samacheer");
        assert_eq!(value["quiz_mode"], true);
    }
}
