use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::http::{Ack, ApiClient};
use crate::core::chat::AssistantBackend;
use crate::core::transcript::HistoryEntry;
use crate::core::{validation, ClientError, Config};
use crate::eventsource::{EventSourceExt, EventStream};

/// A file in the user's knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub files: Vec<Document>,
}

#[derive(Deserialize)]
struct DocumentList {
    #[serde(default)]
    files: Vec<Document>,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    history: &'a [HistoryEntry],
}

/// Limits applied to files before they are uploaded.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl From<&Config> for UploadPolicy {
    fn from(config: &Config) -> Self {
        Self {
            allowed_extensions: config.allowed_extensions.clone(),
            max_bytes: config.max_upload_bytes,
        }
    }
}

/// Client for the assistant service: question answering and documents.
pub struct AssistantClient {
    api: ApiClient,
    upload_policy: UploadPolicy,
}

impl AssistantClient {
    pub fn new(api: ApiClient, upload_policy: UploadPolicy) -> Self {
        Self { api, upload_policy }
    }

    /// Posts a question and returns the decoded event stream. Any non-2xx
    /// status is reported before a single frame is read.
    pub async fn ask(
        &self,
        question: &str,
        history: &[HistoryEntry],
    ) -> Result<EventStream, ClientError> {
        let request = self
            .api
            .request(Method::POST, "/ask")
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .json(&AskRequest { question, history });

        let response = self.api.send(request).await?;
        debug!("[Assistant] streaming response, status {}", response.status());
        Ok(response.stream_events())
    }

    pub async fn documents(&self) -> Result<Vec<Document>, ClientError> {
        let list: DocumentList = self.api.get_json("/documents").await?;
        Ok(list.files)
    }

    /// Uploads files as one multipart request (field `files`). Every file is
    /// checked against the upload policy before anything is sent.
    pub async fn upload(&self, paths: &[PathBuf]) -> Result<UploadResult, ClientError> {
        if paths.is_empty() {
            return Err(ClientError::Validation("No file to upload".to_string()));
        }

        let mut form = Form::new();
        for path in paths {
            let size = tokio::fs::metadata(path).await?.len();
            validation::validate_upload(
                path,
                size,
                &self.upload_policy.allowed_extensions,
                self.upload_policy.max_bytes,
            )?;
            let contents = tokio::fs::read(path).await?;
            form = form.part("files", Part::bytes(contents).file_name(file_name(path)));
        }

        let request = self.api.request(Method::POST, "/upload").multipart(form);
        match self.api.send(request).await {
            Ok(response) => Ok(response.json().await?),
            Err(ClientError::Conflict(message)) => Err(ClientError::Conflict(format!(
                "{message} Delete the existing document first to replace it."
            ))),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_document(&self, document_id: i64) -> Result<String, ClientError> {
        let ack: Ack = self
            .api
            .delete_json(&format!("/documents/{document_id}"))
            .await?;
        Ok(ack.message)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[async_trait]
impl AssistantBackend for AssistantClient {
    async fn ask(
        &self,
        question: &str,
        history: &[HistoryEntry],
    ) -> Result<EventStream, ClientError> {
        AssistantClient::ask(self, question, history).await
    }
}
