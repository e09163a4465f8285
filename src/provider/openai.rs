//! Upload-based analysis client (OpenAI responses API)
//!
//! Documents are uploaded to the provider's file store, referenced in a
//! single extraction call, then deleted. Deletion is owed on every path
//! once the upload succeeds, including extraction failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::model::UploadedFile;
use crate::provider::{AnalyzerError, AnalyzerKind, DocumentAnalyzer, ExtractionPrompts};
use crate::service::json::extract_json;
use crate::service::retry::{retry_with_backoff, RetryPolicy};

const USER_AGENT: &str = "dealdesk-doc-intel/1.0";
const UPLOAD_PURPOSE: &str = "assistants";
const MAX_OUTPUT_TOKENS: u32 = 2000;

/// Client for the upload-then-reference provider
pub struct OpenAiDocClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiDocClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(request_timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url,
            model,
            retry,
        }
    }

    /// Upload the document to the provider file store, returning its id
    async fn upload(&self, file: &UploadedFile) -> Result<String, AnalyzerError> {
        let part = multipart::Part::bytes(file.raw_bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| AnalyzerError::UploadFailed(format!("invalid mime type: {e}")))?;
        let form = multipart::Form::new()
            .text("purpose", UPLOAD_PURPOSE)
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::response_error(response).await);
        }

        let uploaded: FileUploadReply = response.json().await?;
        tracing::debug!(file = %file.name, file_id = %uploaded.id, "Uploaded document to provider");
        Ok(uploaded.id)
    }

    /// One extraction call referencing an already-uploaded file
    async fn request_extraction(
        &self,
        file_id: &str,
        file: &UploadedFile,
        prompts: &ExtractionPrompts,
    ) -> Result<String, AnalyzerError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [
                {
                    "role": "system",
                    "content": [ { "type": "input_text", "text": prompts.system } ]
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "input_text", "text": format!("File name: {}", file.name) },
                        { "type": "input_file", "file_id": file_id },
                        { "type": "input_text", "text": prompts.instruction }
                    ]
                }
            ],
            "max_output_tokens": MAX_OUTPUT_TOKENS,
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::response_error(response).await);
        }

        let reply: ResponsesReply = response.json().await?;
        let text = collect_output_text(&reply);
        if text.trim().is_empty() {
            return Err(AnalyzerError::EmptyReply);
        }
        Ok(text)
    }

    /// Best-effort removal of the uploaded file; failures are logged only
    async fn delete_file(&self, file_id: &str) {
        let url = format!("{}/files/{}", self.base_url, file_id);
        match self.client.delete(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(file_id = %file_id, "Deleted provider file");
            }
            Ok(response) => {
                tracing::warn!(
                    file_id = %file_id,
                    status = response.status().as_u16(),
                    "Could not delete provider file"
                );
            }
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "Could not delete provider file");
            }
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for OpenAiDocClient {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Upload
    }

    async fn analyze(
        &self,
        file: &UploadedFile,
        prompts: &ExtractionPrompts,
    ) -> Result<Value, AnalyzerError> {
        let file_id =
            retry_with_backoff(self.retry, "provider file upload", || self.upload(file)).await?;

        // From here the remote file exists; it is deleted on every path.
        let extraction = retry_with_backoff(self.retry, "provider extraction", || {
            self.request_extraction(&file_id, file, prompts)
        })
        .await;

        self.delete_file(&file_id).await;

        let text = extraction?;
        extract_json(&file.name, &text).ok_or(AnalyzerError::InvalidJson)
    }
}

#[derive(Debug, Deserialize)]
struct FileUploadReply {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputBlock>,
}

#[derive(Debug, Deserialize)]
struct OutputBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Concatenate all `output_text` blocks of a responses reply
fn collect_output_text(reply: &ResponsesReply) -> String {
    let mut text = String::new();
    for item in &reply.output {
        for block in &item.content {
            if block.kind == "output_text" {
                text.push_str(&block.text);
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_output_text_flattens_blocks() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "id": "resp_123",
            "output": [
                {
                    "type": "message",
                    "content": [
                        { "type": "output_text", "text": "{\"statements\"" },
                        { "type": "refusal", "text": "ignored" },
                        { "type": "output_text", "text": ": []}" }
                    ]
                }
            ]
        }))
        .unwrap();

        assert_eq!(collect_output_text(&reply), "{\"statements\": []}");
    }

    #[test]
    fn test_reply_without_output_is_empty() {
        let reply: ResponsesReply =
            serde_json::from_value(serde_json::json!({ "id": "resp_123" })).unwrap();
        assert!(collect_output_text(&reply).is_empty());
    }
}
