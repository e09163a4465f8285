//! Inline vision/document analysis client (Anthropic messages API)
//!
//! Carries the document bytes inside the request itself: PDFs as base64
//! document blocks, images as base64 image blocks, anything else as
//! truncated plain text.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::UploadedFile;
use crate::provider::{AnalyzerError, AnalyzerKind, DocumentAnalyzer, ExtractionPrompts};
use crate::service::json::extract_json;
use crate::service::retry::{retry_with_backoff, RetryPolicy};

const USER_AGENT: &str = "dealdesk-doc-intel/1.0";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Textual documents are clipped to keep prompts inside the token budget
const MAX_INLINE_TEXT_CHARS: usize = 50_000;

/// Client for the inline-bytes provider
pub struct AnthropicDocClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl AnthropicDocClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        max_tokens: u32,
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
            max_tokens,
            retry,
        }
    }

    async fn request_extraction(
        &self,
        file: &UploadedFile,
        prompts: &ExtractionPrompts,
    ) -> Result<String, AnalyzerError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: prompts.system.to_string(),
            messages: vec![Message {
                role: "user",
                content: build_content(file, prompts.instruction),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::response_error(response).await);
        }

        let reply: MessagesReply = response.json().await?;
        let text = collect_reply_text(&reply);
        if text.trim().is_empty() {
            return Err(AnalyzerError::EmptyReply);
        }
        Ok(text)
    }
}

#[async_trait]
impl DocumentAnalyzer for AnthropicDocClient {
    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Inline
    }

    async fn analyze(
        &self,
        file: &UploadedFile,
        prompts: &ExtractionPrompts,
    ) -> Result<Value, AnalyzerError> {
        let text = retry_with_backoff(self.retry, "provider messages", || {
            self.request_extraction(file, prompts)
        })
        .await?;

        extract_json(&file.name, &text).ok_or(AnalyzerError::InvalidJson)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Document { source: BinarySource },
    Image { source: BinarySource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BinarySource {
    Base64 { media_type: String, data: String },
}

/// Content blocks for one document: the file itself in the shape the
/// provider understands, followed by the extraction instruction
fn build_content(file: &UploadedFile, instruction: &str) -> Vec<ContentBlock> {
    let mut content = Vec::with_capacity(2);

    if file.is_pdf() {
        content.push(ContentBlock::Document {
            source: BinarySource::Base64 {
                media_type: "application/pdf".to_string(),
                data: STANDARD.encode(&file.raw_bytes),
            },
        });
    } else if file.is_image() {
        content.push(ContentBlock::Image {
            source: BinarySource::Base64 {
                media_type: file.mime_type.clone(),
                data: STANDARD.encode(&file.raw_bytes),
            },
        });
    } else {
        let text: String = String::from_utf8_lossy(&file.raw_bytes)
            .chars()
            .take(MAX_INLINE_TEXT_CHARS)
            .collect();
        content.push(ContentBlock::Text {
            text: format!("Document content:\n{text}"),
        });
    }

    content.push(ContentBlock::Text {
        text: instruction.to_string(),
    });
    content
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ReplyBlock>,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn collect_reply_text(reply: &MessagesReply) -> String {
    reply
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            mime_type: mime.to_string(),
            raw_bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_pdf_becomes_document_block() {
        let blocks = build_content(&file("s.pdf", "application/pdf", b"%PDF-1.4"), "Extract.");
        let value = serde_json::to_value(&blocks).unwrap();

        assert_eq!(value[0]["type"], "document");
        assert_eq!(value[0]["source"]["type"], "base64");
        assert_eq!(value[0]["source"]["media_type"], "application/pdf");
        assert_eq!(value[1]["type"], "text");
        assert_eq!(value[1]["text"], "Extract.");
    }

    #[test]
    fn test_image_becomes_image_block() {
        let blocks = build_content(&file("scan.png", "image/png", &[137, 80]), "Extract.");
        let value = serde_json::to_value(&blocks).unwrap();

        assert_eq!(value[0]["type"], "image");
        assert_eq!(value[0]["source"]["media_type"], "image/png");
    }

    #[test]
    fn test_text_file_is_inlined_and_clipped() {
        let long = "a".repeat(MAX_INLINE_TEXT_CHARS + 100);
        let blocks = build_content(&file("export.csv", "text/csv", long.as_bytes()), "Extract.");
        let value = serde_json::to_value(&blocks).unwrap();

        assert_eq!(value[0]["type"], "text");
        let text = value[0]["text"].as_str().unwrap();
        assert!(text.starts_with("Document content:\n"));
        assert_eq!(
            text.len(),
            "Document content:\n".len() + MAX_INLINE_TEXT_CHARS
        );
    }

    #[test]
    fn test_reply_text_skips_non_text_blocks() {
        let reply: MessagesReply = serde_json::from_value(serde_json::json!({
            "content": [
                { "type": "text", "text": "{\"statements\":" },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": " []}" }
            ]
        }))
        .unwrap();
        assert_eq!(collect_reply_text(&reply), "{\"statements\": []}");
    }
}
