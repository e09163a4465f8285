//! Application state and service initialization
//!
//! This module centralizes pipeline assembly and dependency injection,
//! making it easier to manage the application lifecycle and test handlers.

use std::sync::Arc;

use crate::model::Config;
use crate::provider::{AnthropicDocClient, DocumentAnalyzer, OpenAiDocClient};
use crate::service::archive::DriveArchive;
use crate::service::extraction::prompts::{DEAL_PROMPTS, STATEMENT_PROMPTS};
use crate::service::{DocumentArchive, ExtractionService, RetryPolicy};

/// Bank statements are compact tabular replies
const STATEMENT_MAX_TOKENS: u32 = 800;
/// Deal documents produce the full profile plus owners and statements
const DEAL_MAX_TOKENS: u32 = 4096;

/// Application state containing both parsing pipelines and shared resources
///
/// This struct centralizes pipeline assembly and makes it easy to inject
/// dependencies into Actix-web handlers.
pub struct AppState {
    /// Bank statement parsing pipeline
    pub statement_pipeline: ExtractionService,
    /// Deal document parsing pipeline
    pub deal_pipeline: ExtractionService,
    /// Optional archive for original deal documents
    pub archive: Option<Arc<dyn DocumentArchive>>,
    pub openai_configured: bool,
    pub anthropic_configured: bool,
}

impl AppState {
    /// Build both pipelines from the environment configuration.
    ///
    /// Missing provider credentials are not a startup error: the server
    /// still runs and every parse request answers 500 until a key is set.
    pub fn new(config: &Config) -> Self {
        let retry = RetryPolicy::default();

        let openai_configured = config.providers.openai_api_key.is_some();
        let anthropic_configured = config.providers.anthropic_api_key.is_some();
        if !openai_configured && !anthropic_configured {
            tracing::warn!(
                "No analysis provider configured, parse endpoints will reject requests"
            );
        }

        let archive: Option<Arc<dyn DocumentArchive>> =
            DriveArchive::from_config(&config.archive, config.processing.request_timeout)
                .map(|drive| Arc::new(drive) as Arc<dyn DocumentArchive>);

        let statement_pipeline = ExtractionService::new(
            "Bank statement parsing",
            Self::build_analyzers(
                config,
                config.providers.statement_model.clone(),
                STATEMENT_MAX_TOKENS,
                retry,
            ),
            STATEMENT_PROMPTS,
            config.processing.clone(),
        );

        let deal_pipeline = ExtractionService::new(
            "Document parsing",
            Self::build_analyzers(
                config,
                config.providers.deal_model.clone(),
                DEAL_MAX_TOKENS,
                retry,
            ),
            DEAL_PROMPTS,
            config.processing.clone(),
        );

        Self {
            statement_pipeline,
            deal_pipeline,
            archive,
            openai_configured,
            anthropic_configured,
        }
    }

    /// Analyzer chain for one pipeline: the upload-based provider first,
    /// the inline provider as fallback and image path.
    fn build_analyzers(
        config: &Config,
        anthropic_model: String,
        anthropic_max_tokens: u32,
        retry: RetryPolicy,
    ) -> Vec<Arc<dyn DocumentAnalyzer>> {
        let mut analyzers: Vec<Arc<dyn DocumentAnalyzer>> = Vec::new();
        let request_timeout = config.processing.request_timeout;

        if let Some(api_key) = &config.providers.openai_api_key {
            analyzers.push(Arc::new(OpenAiDocClient::new(
                api_key.clone(),
                config.providers.openai_base_url.clone(),
                config.providers.openai_model.clone(),
                request_timeout,
                retry,
            )));
        }

        if let Some(api_key) = &config.providers.anthropic_api_key {
            analyzers.push(Arc::new(AnthropicDocClient::new(
                api_key.clone(),
                config.providers.anthropic_base_url.clone(),
                anthropic_model,
                anthropic_max_tokens,
                request_timeout,
                retry,
            )));
        }

        analyzers
    }
}
