//! Analysis providers that turn an uploaded document into structured JSON

mod anthropic;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::model::UploadedFile;

pub use anthropic::AnthropicDocClient;
pub use openai::OpenAiDocClient;

/// Prompt pair sent with every analysis call
#[derive(Debug, Clone, Copy)]
pub struct ExtractionPrompts {
    /// System prompt carrying the output schema and extraction rules
    pub system: &'static str,
    /// Instruction appended after the document content
    pub instruction: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("provider returned status {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("file upload was rejected: {0}")]
    UploadFailed(String),

    #[error("provider returned an empty reply")]
    EmptyReply,

    #[error("provider reply was not valid JSON")]
    InvalidJson,
}

impl AnalyzerError {
    /// Rate-limit failures are the only retryable class. Providers signal
    /// them as HTTP 429 or as error bodies mentioning the rate limit.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            AnalyzerError::RateLimited(_) => true,
            AnalyzerError::Http(e) => e
                .status()
                .is_some_and(|s| s == reqwest::StatusCode::TOO_MANY_REQUESTS),
            AnalyzerError::Api { status, detail } => {
                if *status == 429 {
                    return true;
                }
                let lower = detail.to_lowercase();
                lower.contains("rate_limit_error") || lower.contains("rate limit")
            }
            _ => false,
        }
    }
}

/// Map a non-success provider reply to the matching error variant,
/// keeping a readable slice of the body for warnings and logs
pub(crate) async fn response_error(response: reqwest::Response) -> AnalyzerError {
    let status = response.status();
    let detail: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(300)
        .collect();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        AnalyzerError::RateLimited(detail)
    } else {
        AnalyzerError::Api {
            status: status.as_u16(),
            detail,
        }
    }
}

/// Provider rate-limit class, used to pick batch schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    /// Upload-then-reference provider with generous rate limits
    Upload,
    /// Inline-bytes vision/document provider with tight token budgets
    Inline,
}

/// A provider variant able to analyze one document. The set is closed:
/// an upload-based client and an inline vision/document client.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Provider name as it appears in warnings
    fn name(&self) -> &'static str;

    /// Rate-limit class for schedule selection
    fn kind(&self) -> AnalyzerKind;

    /// Analyze one document and return the model's parsed JSON reply
    async fn analyze(
        &self,
        file: &UploadedFile,
        prompts: &ExtractionPrompts,
    ) -> Result<Value, AnalyzerError>;
}

/// Ordered analyzer preference for one document.
///
/// PDFs go to the upload provider first for its rate-limit headroom, with
/// the inline provider as fallback. Anything else (images, text exports)
/// can only be carried inline.
pub fn select_analyzers(
    file: &UploadedFile,
    analyzers: &[Arc<dyn DocumentAnalyzer>],
) -> Vec<Arc<dyn DocumentAnalyzer>> {
    if file.is_pdf() {
        let mut ordered: Vec<Arc<dyn DocumentAnalyzer>> = analyzers
            .iter()
            .filter(|a| a.kind() == AnalyzerKind::Upload)
            .cloned()
            .collect();
        ordered.extend(
            analyzers
                .iter()
                .filter(|a| a.kind() == AnalyzerKind::Inline)
                .cloned(),
        );
        ordered
    } else {
        analyzers
            .iter()
            .filter(|a| a.kind() == AnalyzerKind::Inline)
            .cloned()
            .collect()
    }
}
