use std::time::Duration;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use url::Url;
use crate::config::TutorConfig;
use crate::core::{Category, ProgressCallback, Result, TransferSignal, TutorBackend, TutorError};
use crate::upload::UploadFile;
use super::progress_stream::ByteCountingStream;
use super::types::{AnswerResponse, AskRequest, ErrorDetail, HealthReport, SyllabusStatus, UploadReceipt};

/// `TutorBackend` over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Without a timeout a request that never resolves stays pending forever
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TutorError::config(format!("Invalid base url: {}", base_url)));
        }
        // Relative joins drop the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &TutorConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn server_error(response: Response) -> TutorError {
        let status = response.status();
        match response.json::<ErrorDetail>().await {
            Ok(body) => TutorError::server_error(status.as_u16(), body.message()),
            Err(_) => TutorError::server_error(
                status.as_u16(),
                format!("Request failed with status {}", status),
            ),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TutorBackend for HttpBackend {
    async fn upload_pdf(
        &self,
        file: &UploadFile,
        category: &Category,
        on_progress: ProgressCallback,
    ) -> Result<UploadReceipt> {
        // The backend reads `syllabus` from the query; the form field mirrors it
        let mut url = self.endpoint("upload-pdf/")?;
        url.query_pairs_mut().append_pair("syllabus", category.as_str());

        let total = file.size_bytes();
        let payload = ByteCountingStream::new(file.open().await?, total, on_progress.clone());
        let part = Part::stream_with_length(Body::wrap_stream(payload), total)
            .file_name(file.name().to_string())
            .mime_str(&file.content_type())?;
        let form = Form::new()
            .part("file", part)
            .text("syllabus", category.as_str().to_string());

        tracing::debug!(file = file.name(), %category, total, "posting upload");
        let response = self.client.post(url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::server_error(response).await);
        }
        on_progress(TransferSignal::Accepted);

        Self::decode(response).await
    }

    async fn ask_question(&self, request: &AskRequest) -> Result<AnswerResponse> {
        let url = self.endpoint("ask-question/")?;

        tracing::debug!(syllabus = %request.syllabus, quiz_mode = request.quiz_mode, "posting question");
        let response = self.client.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TutorError::Status(status.as_u16()));
        }

        Self::decode(response).await
    }

    async fn syllabus_status(&self, category: &Category) -> Result<SyllabusStatus> {
        let mut url = self.endpoint("status/")?;
        url.path_segments_mut()
            .map_err(|_| TutorError::config(format!("Invalid base url: {}", self.base_url)))?
            .pop_if_empty()
            .push(category.as_str());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }

        Self::decode(response).await
    }

    async fn health(&self) -> Result<HealthReport> {
        let url = self.endpoint("health")?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Self::server_error(response).await);
        }

        Self::decode(response).await
    }
}
