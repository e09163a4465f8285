//! Document extraction pipeline: fans uploaded files out to the
//! configured analyzers in rate-limited batches, normalizes each reply
//! and folds everything into a single aggregate under a time budget.

pub mod normalize;
pub mod prompts;

use std::sync::Arc;

use serde_json::Value;

use crate::model::config::ProcessingConfig;
use crate::model::{ScheduleSettings, UploadedFile};
use crate::provider::{select_analyzers, AnalyzerKind, DocumentAnalyzer, ExtractionPrompts};
use crate::service::batch::process_in_batches;

/// Aggregate produced by a parsing pipeline.
///
/// Implementations normalize raw model JSON into typed results and
/// define how per-file results fold into the response aggregate.
pub trait ExtractionOutcome: Default + Send + 'static {
    fn from_model_value(value: Value) -> Self;
    fn push_warning(&mut self, warning: String);
    fn dedup_warnings(&mut self);
    fn merge(&mut self, other: Self);
    /// Runs once after the last file has been merged
    fn finalize(&mut self) {}
}

/// One configured parsing pipeline (bank statements or deal documents).
/// The two instances differ only in analyzers, prompts and label.
pub struct ExtractionService {
    label: &'static str,
    analyzers: Vec<Arc<dyn DocumentAnalyzer>>,
    prompts: ExtractionPrompts,
    processing: ProcessingConfig,
}

impl ExtractionService {
    pub fn new(
        label: &'static str,
        analyzers: Vec<Arc<dyn DocumentAnalyzer>>,
        prompts: ExtractionPrompts,
        processing: ProcessingConfig,
    ) -> Self {
        Self {
            label,
            analyzers,
            prompts,
            processing,
        }
    }

    pub fn has_analyzers(&self) -> bool {
        !self.analyzers.is_empty()
    }

    /// Upload-capable analyzers tolerate wider batches; inline-only
    /// configurations fall back to the conservative schedule.
    fn schedule(&self) -> ScheduleSettings {
        if self
            .analyzers
            .iter()
            .any(|analyzer| analyzer.kind() == AnalyzerKind::Upload)
        {
            self.processing.upload_schedule
        } else {
            self.processing.inline_schedule
        }
    }

    /// Analyzes every file and merges the results in submission order.
    /// On budget exhaustion all partial results are discarded and the
    /// aggregate carries a single budget warning instead.
    pub async fn run<E: ExtractionOutcome>(&self, files: &[UploadedFile]) -> E {
        let schedule = self.schedule();
        tracing::info!(
            pipeline = self.label,
            files = files.len(),
            batch_size = schedule.batch_size,
            "Starting document analysis"
        );

        let queue: Vec<&UploadedFile> = files.iter().collect();
        let work = process_in_batches(queue, schedule, |file| self.analyze_file::<E>(file));

        let mut aggregate = match tokio::time::timeout(self.processing.time_budget, work).await {
            Ok(outcomes) => {
                let mut aggregate = E::default();
                for outcome in outcomes {
                    aggregate.merge(outcome);
                }
                aggregate
            }
            Err(_) => {
                let secs = self.processing.time_budget.as_secs();
                tracing::warn!(
                    pipeline = self.label,
                    budget_secs = secs,
                    "Analysis ran out of budget, discarding partial results"
                );
                let mut aggregate = E::default();
                aggregate.push_warning(format!(
                    "{} exceeded {}s budget; some files may not have been processed.",
                    self.label, secs
                ));
                aggregate
            }
        };

        aggregate.finalize();
        aggregate
    }

    /// Runs one file through the analyzer chain. Gating happens here,
    /// before any provider call: empty payloads and oversized files
    /// produce a warning-only outcome.
    async fn analyze_file<E: ExtractionOutcome>(&self, file: &UploadedFile) -> E {
        let mut outcome = E::default();

        if file.raw_bytes.is_empty() {
            tracing::warn!(file = %file.name, "Uploaded file decoded to zero bytes");
            outcome.push_warning(format!(
                "The file {} appears to be empty and could not be processed.",
                file.name
            ));
            return outcome;
        }

        if file.raw_bytes.len() > self.processing.max_inline_bytes {
            let limit_mb = self.processing.max_inline_bytes / (1024 * 1024);
            tracing::warn!(
                file = %file.name,
                size = file.raw_bytes.len(),
                "Uploaded file exceeds the analysis size limit"
            );
            outcome.push_warning(format!(
                "Skipping {}: exceeds {}MB limit for fast analysis.",
                file.name, limit_mb
            ));
            return outcome;
        }

        let candidates = select_analyzers(file, &self.analyzers);
        if candidates.is_empty() {
            outcome.push_warning(format!(
                "No supported analysis provider configured for {}.",
                file.name
            ));
            return outcome;
        }

        for analyzer in candidates {
            match analyzer.analyze(file, &self.prompts).await {
                Ok(value) => {
                    tracing::info!(
                        file = %file.name,
                        provider = analyzer.name(),
                        "File analyzed"
                    );
                    outcome.merge(E::from_model_value(value));
                    outcome.dedup_warnings();
                    return outcome;
                }
                Err(err) => {
                    tracing::warn!(
                        file = %file.name,
                        provider = analyzer.name(),
                        error = %err,
                        "Analyzer failed, trying next candidate"
                    );
                    outcome.push_warning(format!(
                        "{} analysis failed for {}: {}",
                        analyzer.name(),
                        file.name,
                        err
                    ));
                }
            }
        }

        outcome.dedup_warnings();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatementExtraction;
    use crate::provider::AnalyzerError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedAnalyzer {
        provider_name: &'static str,
        provider_kind: AnalyzerKind,
        fail: bool,
        delay: Option<Duration>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedAnalyzer {
        fn new(provider_name: &'static str, provider_kind: AnalyzerKind) -> Self {
            Self {
                provider_name,
                provider_kind,
                fail: false,
                delay: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl DocumentAnalyzer for ScriptedAnalyzer {
        fn name(&self) -> &'static str {
            self.provider_name
        }

        fn kind(&self) -> AnalyzerKind {
            self.provider_kind
        }

        async fn analyze(
            &self,
            file: &UploadedFile,
            _prompts: &ExtractionPrompts,
        ) -> Result<Value, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AnalyzerError::Api {
                    status: 500,
                    detail: "scripted failure".to_string(),
                });
            }
            Ok(json!({
                "statements": [{ "bank_name": file.name }],
                "confidence": { "statements": [90] }
            }))
        }
    }

    fn pdf(name: &str, bytes: usize) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            raw_bytes: vec![0u8; bytes],
        }
    }

    fn processing() -> ProcessingConfig {
        ProcessingConfig {
            time_budget: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            max_inline_bytes: 1024 * 1024,
            upload_schedule: ScheduleSettings {
                batch_size: 5,
                pause: Duration::from_millis(0),
            },
            inline_schedule: ScheduleSettings {
                batch_size: 1,
                pause: Duration::from_millis(0),
            },
        }
    }

    fn service(analyzers: Vec<Arc<dyn DocumentAnalyzer>>) -> ExtractionService {
        ExtractionService::new(
            "Bank statement parsing",
            analyzers,
            prompts::STATEMENT_PROMPTS,
            processing(),
        )
    }

    #[tokio::test]
    async fn test_failed_analyzer_falls_back_to_next_candidate() {
        let mut primary = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        primary.fail = true;
        let primary_calls = primary.calls.clone();
        let secondary = ScriptedAnalyzer::new("Anthropic", AnalyzerKind::Inline);
        let secondary_calls = secondary.calls.clone();

        let service = service(vec![Arc::new(primary), Arc::new(secondary)]);
        let outcome: StatementExtraction = service.run(&[pdf("march.pdf", 64)]).await;

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.statements.len(), 1);
        assert_eq!(outcome.statements[0].bank_name.as_deref(), Some("march.pdf"));
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("OpenAI analysis failed for march.pdf:"));
    }

    #[tokio::test]
    async fn test_all_analyzers_failing_yields_warnings_only() {
        let mut primary = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        primary.fail = true;
        let mut secondary = ScriptedAnalyzer::new("Anthropic", AnalyzerKind::Inline);
        secondary.fail = true;

        let service = service(vec![Arc::new(primary), Arc::new(secondary)]);
        let outcome: StatementExtraction = service.run(&[pdf("march.pdf", 64)]).await;

        assert!(outcome.statements.is_empty());
        assert_eq!(outcome.warnings.len(), 2);
        assert!(outcome.warnings[0].starts_with("OpenAI analysis failed"));
        assert!(outcome.warnings[1].starts_with("Anthropic analysis failed"));
    }

    #[tokio::test]
    async fn test_oversized_file_is_gated_before_any_provider_call() {
        let analyzer = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        let calls = analyzer.calls.clone();

        let service = service(vec![Arc::new(analyzer)]);
        let outcome: StatementExtraction =
            service.run(&[pdf("huge.pdf", 1024 * 1024 + 1)]).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            outcome.warnings,
            vec!["Skipping huge.pdf: exceeds 1MB limit for fast analysis.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_file_is_gated_before_any_provider_call() {
        let analyzer = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        let calls = analyzer.calls.clone();

        let service = service(vec![Arc::new(analyzer)]);
        let outcome: StatementExtraction = service.run(&[pdf("empty.pdf", 0)]).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            outcome.warnings,
            vec![
                "The file empty.pdf appears to be empty and could not be processed.".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_unsupported_file_type_gets_provider_warning() {
        // Upload analyzers only accept PDFs, so an image finds no candidate
        let analyzer = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        let calls = analyzer.calls.clone();

        let service = service(vec![Arc::new(analyzer)]);
        let outcome: StatementExtraction = service
            .run(&[UploadedFile {
                name: "photo.png".to_string(),
                mime_type: "image/png".to_string(),
                raw_bytes: vec![1, 2, 3],
            }])
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            outcome.warnings,
            vec!["No supported analysis provider configured for photo.png.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_results_keep_submission_order_regardless_of_completion() {
        let mut slow = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        slow.delay = Some(Duration::from_millis(30));

        let service = service(vec![Arc::new(slow)]);
        let outcome: StatementExtraction = service
            .run(&[pdf("a.pdf", 8), pdf("b.pdf", 8), pdf("c.pdf", 8)])
            .await;

        let names: Vec<Option<&str>> = outcome
            .statements
            .iter()
            .map(|s| s.bank_name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("a.pdf"), Some("b.pdf"), Some("c.pdf")]);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_discards_partials_and_warns() {
        let mut slow = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        slow.delay = Some(Duration::from_millis(500));

        let mut config = processing();
        config.time_budget = Duration::from_millis(50);
        let service = ExtractionService::new(
            "Bank statement parsing",
            vec![Arc::new(slow)],
            prompts::STATEMENT_PROMPTS,
            config,
        );

        let outcome: StatementExtraction = service.run(&[pdf("march.pdf", 64)]).await;

        assert!(outcome.statements.is_empty());
        assert_eq!(
            outcome.warnings,
            vec![
                "Bank statement parsing exceeded 0s budget; some files may not have been processed."
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_inline_only_configuration_uses_conservative_schedule() {
        let inline = ScriptedAnalyzer::new("Anthropic", AnalyzerKind::Inline);
        let service = service(vec![Arc::new(inline)]);
        assert_eq!(service.schedule().batch_size, 1);

        let upload = ScriptedAnalyzer::new("OpenAI", AnalyzerKind::Upload);
        let service = self::service(vec![Arc::new(upload)]);
        assert_eq!(service.schedule().batch_size, 5);
    }
}
