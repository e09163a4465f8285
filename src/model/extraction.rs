//! Extraction outcome types shared by the parse pipelines

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::deal::{DealOwner, DealProfile};
use crate::model::statement::{BankStatement, FundingPosition};

/// A document submitted for analysis, already decoded to raw bytes
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub raw_bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("application/pdf")
            || self.name.to_lowercase().ends_with(".pdf")
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.to_lowercase().starts_with("image/")
    }
}

/// Per-statement confidence scores (0-100) for the bank pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StatementConfidence {
    pub statements: Vec<f64>,
}

/// Result of the bank-statement pipeline, both per file and aggregated
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StatementExtraction {
    pub statements: Vec<BankStatement>,
    #[serde(rename = "fundingPositions")]
    pub funding_positions: Vec<FundingPosition>,
    pub confidence: StatementConfidence,
    pub warnings: Vec<String>,
}

/// Confidence scores for the deal pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DealConfidence {
    pub deal: f64,
    pub owners: Vec<f64>,
    pub statements: Vec<f64>,
}

/// Result of the deal-document pipeline, both per file and aggregated.
/// `documents_folder` and `log_id` are filled by the request handler,
/// not by per-file analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DealExtraction {
    pub deal: DealProfile,
    pub owners: Vec<DealOwner>,
    pub statements: Vec<BankStatement>,
    #[serde(rename = "fundingPositions")]
    pub funding_positions: Vec<FundingPosition>,
    pub confidence: DealConfidence,
    #[serde(rename = "missingFields")]
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(rename = "documentsFolder", skip_serializing_if = "Option::is_none")]
    pub documents_folder: Option<ArchivedFolder>,
    #[serde(rename = "logId", skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
}

/// A file stored in the archive folder
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArchivedFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "webViewLink")]
    pub web_view_link: Option<String>,
}

/// Archive folder created for one deal submission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArchivedFolder {
    pub id: String,
    pub name: String,
    #[serde(rename = "webViewLink")]
    pub web_view_link: Option<String>,
    pub files: Vec<ArchivedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_detection_checks_mime_and_extension() {
        let by_mime = UploadedFile {
            name: "statement.bin".to_string(),
            mime_type: "application/pdf".to_string(),
            raw_bytes: vec![1],
        };
        let by_name = UploadedFile {
            name: "Statement.PDF".to_string(),
            mime_type: "application/octet-stream".to_string(),
            raw_bytes: vec![1],
        };
        let neither = UploadedFile {
            name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            raw_bytes: vec![1],
        };
        assert!(by_mime.is_pdf());
        assert!(by_name.is_pdf());
        assert!(!neither.is_pdf());
        assert!(neither.is_image());
    }

    #[test]
    fn test_statement_extraction_wire_names() {
        let extraction = StatementExtraction::default();
        let value = serde_json::to_value(&extraction).unwrap();
        assert!(value.get("fundingPositions").is_some());
        assert!(value.get("statements").is_some());
        assert!(value["confidence"].get("statements").is_some());
    }

    #[test]
    fn test_deal_extraction_omits_unset_folder_and_log() {
        let extraction = DealExtraction::default();
        let value = serde_json::to_value(&extraction).unwrap();
        assert!(value.get("documentsFolder").is_none());
        assert!(value.get("logId").is_none());
        assert!(value.get("missingFields").is_some());
    }
}
