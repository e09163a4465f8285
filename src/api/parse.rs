//! REST API endpoints for document parsing

use actix_web::{post, route, web, HttpResponse, Responder};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::cors_headers;
use crate::api::error::ApiError;
use crate::app::AppState;
use crate::model::{DealExtraction, StatementExtraction, UploadedFile};
use crate::service::{archive_documents, decode_base64_content};

/// Uploads arrive fully in the request body, so the JSON limit has to
/// sit well above the per-file analysis ceiling.
const JSON_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// One uploaded document, base64 in `content` (optionally a data: URL)
#[derive(Debug, Deserialize, ToSchema)]
pub struct IncomingFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ParseBankStatementsRequest {
    pub files: Option<Vec<IncomingFile>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ParseDealDocumentsRequest {
    pub files: Option<Vec<IncomingFile>>,
    /// Legacy clients send the same base64 objects under this key
    #[serde(rename = "fileUrls")]
    pub file_urls: Option<Vec<IncomingFile>>,
}

/// Parse a batch of bank statements
#[utoipa::path(
    post,
    path = "/v1/parse/bank-statements",
    request_body = ParseBankStatementsRequest,
    responses(
        (status = 200, description = "Extraction results with per-file warnings", body = StatementExtraction),
        (status = 400, description = "Missing files array or malformed body", body = crate::api::error::ErrorResponse),
        (status = 500, description = "No analysis provider configured", body = crate::api::error::ErrorResponse)
    ),
    tag = "parse"
)]
#[post("/v1/parse/bank-statements")]
pub async fn parse_bank_statements(
    state: web::Data<AppState>,
    body: web::Json<ParseBankStatementsRequest>,
) -> Result<HttpResponse, ApiError> {
    let files = require_files(body.into_inner().files)?;
    if !state.statement_pipeline.has_analyzers() {
        return Err(ApiError::NoProviderConfigured);
    }

    let outcome: StatementExtraction = state.statement_pipeline.run(&decode_files(files)).await;

    Ok(cors_headers(&mut HttpResponse::Ok()).json(outcome))
}

#[route("/v1/parse/bank-statements", method = "OPTIONS")]
pub async fn bank_statements_preflight() -> impl Responder {
    cors_headers(&mut HttpResponse::Ok()).finish()
}

/// Parse a mixed batch of deal documents
///
/// Merges per-file results into one deal profile, archives the originals
/// when an archive is configured and tags the response with a log id.
#[utoipa::path(
    post,
    path = "/v1/parse/deal-documents",
    request_body = ParseDealDocumentsRequest,
    responses(
        (status = 200, description = "Merged deal extraction", body = DealExtraction),
        (status = 400, description = "Missing files array or malformed body", body = crate::api::error::ErrorResponse),
        (status = 500, description = "No analysis provider configured", body = crate::api::error::ErrorResponse)
    ),
    tag = "parse"
)]
#[post("/v1/parse/deal-documents")]
pub async fn parse_deal_documents(
    state: web::Data<AppState>,
    body: web::Json<ParseDealDocumentsRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let files = require_files(request.files.or(request.file_urls))?;
    if !state.deal_pipeline.has_analyzers() {
        return Err(ApiError::NoProviderConfigured);
    }
    let files = decode_files(files);

    let log_id = Uuid::new_v4().to_string();
    tracing::info!(log_id = %log_id, files = files.len(), "Parsing deal documents");

    let mut outcome: DealExtraction = state.deal_pipeline.run(&files).await;
    outcome.log_id = Some(log_id);

    // Archiving is best-effort: a failure downgrades to a warning so the
    // extraction results still reach the caller
    if let Some(archive) = state.archive.as_deref() {
        let business_name = outcome.deal.legal_business_name.as_deref();
        match archive_documents(archive, business_name, &files).await {
            Ok(folder) => outcome.documents_folder = Some(folder),
            Err(e) => {
                tracing::error!(error = %e, "Could not archive deal documents");
                outcome
                    .warnings
                    .push(format!("Could not archive original documents: {}", e));
            }
        }
    }

    Ok(cors_headers(&mut HttpResponse::Ok()).json(outcome))
}

#[route("/v1/parse/deal-documents", method = "OPTIONS")]
pub async fn deal_documents_preflight() -> impl Responder {
    cors_headers(&mut HttpResponse::Ok()).finish()
}

fn require_files(files: Option<Vec<IncomingFile>>) -> Result<Vec<IncomingFile>, ApiError> {
    match files {
        Some(files) if !files.is_empty() => Ok(files),
        _ => Err(ApiError::MissingFiles),
    }
}

/// Decode the incoming base64 payloads. Undecodable content becomes an
/// empty file here and is reported per file by the pipeline, not as a
/// request-level error.
fn decode_files(files: Vec<IncomingFile>) -> Vec<UploadedFile> {
    files
        .into_iter()
        .map(|file| UploadedFile {
            raw_bytes: decode_base64_content(&file.content),
            name: file.name,
            mime_type: file.mime_type,
        })
        .collect()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DealDesk Document Intelligence",
        description = "Extracts structured lending data from uploaded bank statements and deal documents"
    ),
    paths(
        parse_bank_statements,
        parse_deal_documents,
        crate::api::health::liveness,
        crate::api::health::readiness
    ),
    components(schemas(
        ParseBankStatementsRequest,
        ParseDealDocumentsRequest,
        IncomingFile,
        crate::model::StatementExtraction,
        crate::model::StatementConfidence,
        crate::model::BankStatement,
        crate::model::FundingPosition,
        crate::model::PaymentFrequency,
        crate::model::DealExtraction,
        crate::model::DealConfidence,
        crate::model::DealProfile,
        crate::model::DealOwner,
        crate::model::LoanType,
        crate::model::ArchivedFolder,
        crate::model::ArchivedFile,
        crate::api::error::ErrorResponse
    )),
    tags(
        (name = "parse", description = "Document parsing endpoints"),
        (name = "health", description = "Health probe endpoints")
    )
)]
pub struct ApiDoc;

/// Configure parse routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(|err, _req| ApiError::Parsing(err.to_string()).into()),
    )
    .service(parse_bank_statements)
    .service(bank_statements_preflight)
    .service(parse_deal_documents)
    .service(deal_documents_preflight);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::ProcessingConfig;
    use crate::provider::{
        AnalyzerError, AnalyzerKind, DocumentAnalyzer, ExtractionPrompts,
    };
    use crate::service::extraction::prompts::{DEAL_PROMPTS, STATEMENT_PROMPTS};
    use crate::service::ExtractionService;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct StubAnalyzer;

    #[async_trait]
    impl DocumentAnalyzer for StubAnalyzer {
        fn name(&self) -> &'static str {
            "Stub"
        }

        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Inline
        }

        async fn analyze(
            &self,
            file: &UploadedFile,
            _prompts: &ExtractionPrompts,
        ) -> Result<Value, AnalyzerError> {
            Ok(json!({
                "statements": [{ "bank_name": file.name, "statement_month": "2024-03" }],
                "deal": { "legal_business_name": "Riverside Diner LLC" },
                "confidence": { "deal": 80, "statements": [92] }
            }))
        }
    }

    fn state(with_analyzer: bool) -> web::Data<AppState> {
        let analyzers: Vec<Arc<dyn DocumentAnalyzer>> = if with_analyzer {
            vec![Arc::new(StubAnalyzer)]
        } else {
            Vec::new()
        };

        web::Data::new(AppState {
            statement_pipeline: ExtractionService::new(
                "Bank statement parsing",
                analyzers.clone(),
                STATEMENT_PROMPTS,
                ProcessingConfig::default(),
            ),
            deal_pipeline: ExtractionService::new(
                "Document parsing",
                analyzers,
                DEAL_PROMPTS,
                ProcessingConfig::default(),
            ),
            archive: None,
            openai_configured: false,
            anthropic_configured: with_analyzer,
        })
    }

    fn encoded_file(name: &str) -> Value {
        json!({
            "name": name,
            "type": "image/png",
            "content": STANDARD.encode(b"fake scanned document")
        })
    }

    #[actix_web::test]
    async fn test_missing_files_array_is_a_400() {
        let app =
            test::init_service(App::new().app_data(state(true)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/parse/bank-statements")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "files array is required" }));
    }

    #[actix_web::test]
    async fn test_unconfigured_providers_are_a_500() {
        let app =
            test::init_service(App::new().app_data(state(false)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/parse/bank-statements")
            .set_json(json!({ "files": [encoded_file("march.pdf")] }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 500);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["error"],
            "No analysis provider configured (missing OPENAI_API_KEY and ANTHROPIC_API_KEY)"
        );
    }

    #[actix_web::test]
    async fn test_preflight_carries_cors_headers() {
        let app =
            test::init_service(App::new().app_data(state(true)).configure(configure)).await;

        let req = test::TestRequest::with_uri("/v1/parse/bank-statements")
            .method(actix_web::http::Method::OPTIONS)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        let headers = resp.headers();
        assert_eq!(headers.get("Access-Control-Allow-Origin").unwrap(), "*");
        assert_eq!(
            headers.get("Access-Control-Allow-Headers").unwrap(),
            "authorization, x-client-info, apikey, content-type"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Methods").unwrap(),
            "POST, OPTIONS"
        );
    }

    #[actix_web::test]
    async fn test_bank_statements_happy_path() {
        let app =
            test::init_service(App::new().app_data(state(true)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/parse/bank-statements")
            .set_json(json!({ "files": [encoded_file("march.png")] }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["statements"][0]["bank_name"], "march.png");
        assert_eq!(body["confidence"]["statements"][0], 92.0);
    }

    #[actix_web::test]
    async fn test_deal_documents_accepts_file_urls_alias() {
        let app =
            test::init_service(App::new().app_data(state(true)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/parse/deal-documents")
            .set_json(json!({ "fileUrls": [encoded_file("application.png")] }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["deal"]["legal_business_name"], "Riverside Diner LLC");
        assert!(body["logId"].is_string());
        // No archive configured, so the folder key is absent entirely
        assert!(body.get("documentsFolder").is_none());
        // ein was never extracted, so the recomputed gap list flags it
        assert!(body["missingFields"]
            .as_array()
            .unwrap()
            .contains(&json!("ein")));
    }

    #[actix_web::test]
    async fn test_malformed_json_maps_to_parsing_error() {
        let app =
            test::init_service(App::new().app_data(state(true)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/parse/bank-statements")
            .insert_header(("content-type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Error during parsing:"));
    }

    #[actix_web::test]
    async fn test_missing_files_reported_before_missing_providers() {
        let app =
            test::init_service(App::new().app_data(state(false)).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/v1/parse/deal-documents")
            .set_json(json!({ "files": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "files array is required");
    }
}
