//! HTTP boundary: completions, the instructions resource and document uploads.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::{BackendConfig, CompletionConfig};
use crate::error::ChatError;
use crate::protocol::{
    ChatCompletionRequest, Completion, CompletionBody, ErrorReply, ExtractReply, IndexReport,
    ResponseMode,
};
use crate::transcript::Message;
use crate::upload::{DocumentUpload, IndexRequest};

/// Thin wrapper over a shared [`reqwest::Client`] that knows the backend's
/// endpoints and request knobs.
#[derive(Debug, Clone)]
pub struct ChatBackend {
    client: Client,
    backend: BackendConfig,
    completion: CompletionConfig,
}

impl ChatBackend {
    pub fn new(backend: BackendConfig, completion: CompletionConfig) -> Self {
        // Builder failure is confined to broken TLS setups; fall back to a
        // default client instead of failing session start.
        let client = Client::builder()
            .connect_timeout(backend.connect_timeout())
            .build()
            .unwrap_or_default();
        Self {
            client,
            backend,
            completion,
        }
    }

    pub fn mode(&self) -> ResponseMode {
        self.completion.mode
    }

    pub fn backend_config(&self) -> &BackendConfig {
        &self.backend
    }

    // -----------------------------------------------------------------------
    // Completions
    // -----------------------------------------------------------------------

    /// POST the transcript and check the status. The body is left unread so
    /// the caller can either parse it whole or stream it.
    pub async fn send_completion(
        &self,
        messages: &[Message],
        mode: ResponseMode,
    ) -> Result<Response, ChatError> {
        let request = ChatCompletionRequest {
            messages,
            temperature: self.completion.temperature,
            model: self.completion.model.as_deref(),
            max_tokens: self.completion.max_tokens,
            stream: mode == ResponseMode::Stream,
        };
        let url = &self.backend.chat_endpoint;
        debug!(url = %url, messages = messages.len(), mode = %mode, "sending completion request");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, mode.accept_header())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Http {
                status: response.status().as_u16(),
                url: url.clone(),
            });
        }
        Ok(response)
    }

    /// Non-streaming round trip: one request, one JSON body.
    pub async fn complete(&self, messages: &[Message]) -> Result<Completion, ChatError> {
        let response = self.send_completion(messages, ResponseMode::Json).await?;
        let bytes = response.bytes().await?;
        let body: CompletionBody = serde_json::from_slice(&bytes)?;
        body.into_completion()
    }

    // -----------------------------------------------------------------------
    // Instructions resource
    // -----------------------------------------------------------------------

    pub async fn fetch_text(&self, url: &str) -> Result<String, ChatError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ChatError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    // -----------------------------------------------------------------------
    // Uploads
    // -----------------------------------------------------------------------

    /// Send one document for text extraction and return the extracted text.
    pub async fn extract_document(&self, doc: &DocumentUpload) -> Result<String, ChatError> {
        let form = Form::new().part("file", doc.to_part());
        let response = self
            .client
            .post(&self.backend.extract_endpoint)
            .multipart(form)
            .send()
            .await?;
        let response = check_upload_status(response, &self.backend.extract_endpoint).await?;

        let reply: ExtractReply = serde_json::from_slice(&response.bytes().await?)?;
        match reply.extracted_text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ChatError::EmptyDocument(doc.file_name.clone())),
        }
    }

    /// Index a batch of files into a named retrieval database.
    pub async fn index_documents(&self, request: &IndexRequest) -> Result<IndexReport, ChatError> {
        let mut form = Form::new()
            .text("database_name", request.database_name.clone())
            .text("description", request.description.clone());
        for doc in &request.files {
            form = form.part("files", doc.to_part());
        }

        let response = self
            .client
            .post(&self.backend.index_endpoint)
            .multipart(form)
            .send()
            .await?;
        let response = check_upload_status(response, &self.backend.index_endpoint).await?;

        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }
}

/// Upload endpoints explain failures in a `{"detail": ...}` body; surface it
/// when present.
async fn check_upload_status(response: Response, url: &str) -> Result<Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let bytes = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<ErrorReply>(&bytes).ok().and_then(|r| r.detail) {
        Some(detail) => Err(ChatError::Rejected {
            status: status.as_u16(),
            detail,
        }),
        None => Err(ChatError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_reports_configured_mode() {
        let completion = CompletionConfig {
            mode: ResponseMode::Stream,
            ..CompletionConfig::default()
        };
        let backend = ChatBackend::new(BackendConfig::default(), completion);
        assert_eq!(backend.mode(), ResponseMode::Stream);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let backend_cfg = BackendConfig {
            // port 9 (discard) is closed on test machines
            chat_endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            connect_timeout_secs: 1,
            ..BackendConfig::default()
        };
        let backend = ChatBackend::new(backend_cfg, CompletionConfig::default());
        let err = backend.complete(&[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }
}
