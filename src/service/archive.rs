//! Cloud archival of original deal documents
//!
//! Each deal submission gets its own folder named after the merchant,
//! holding the original uploads. Archival is best-effort: failures turn
//! into response warnings, never request errors.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::model::config::ArchiveConfig;
use crate::model::{ArchivedFile, ArchivedFolder, UploadedFile};

const USER_AGENT: &str = "dealdesk-doc-intel/1.0";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const DEFAULT_FOLDER_STEM: &str = "Deal Upload";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("archive service returned status {status}: {detail}")]
    Api { status: u16, detail: String },
}

/// Storage backend for original document uploads
#[async_trait]
pub trait DocumentArchive: Send + Sync {
    /// Create a folder under the configured parent
    async fn create_folder(&self, name: &str) -> Result<ArchivedFolder, ArchiveError>;

    /// Store one document inside an existing folder
    async fn store_file(
        &self,
        folder_id: &str,
        file: &UploadedFile,
    ) -> Result<ArchivedFile, ArchiveError>;
}

/// Drive-style archive client using a pre-minted bearer credential
pub struct DriveArchive {
    client: Client,
    base_url: String,
    upload_base_url: String,
    parent_folder_id: String,
    service_token: String,
}

impl DriveArchive {
    /// Build the client when the archive is fully configured
    pub fn from_config(config: &ArchiveConfig, request_timeout: Duration) -> Option<Self> {
        let parent_folder_id = config.parent_folder_id.clone()?;
        let service_token = config.service_token.clone()?;

        if let Some(user) = &config.impersonate_user {
            tracing::info!(user = %user, "Archive uploads attributed to workspace identity");
        }

        Some(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(request_timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url.clone(),
            upload_base_url: config.upload_base_url.clone(),
            parent_folder_id,
            service_token,
        })
    }

    async fn api_error(response: reqwest::Response) -> ArchiveError {
        let status = response.status().as_u16();
        let detail: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(300)
            .collect();
        ArchiveError::Api { status, detail }
    }
}

#[async_trait]
impl DocumentArchive for DriveArchive {
    async fn create_folder(&self, name: &str) -> Result<ArchivedFolder, ArchiveError> {
        let body = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [self.parent_folder_id],
        });

        let response = self
            .client
            .post(format!(
                "{}/files?fields=id,name,webViewLink",
                self.base_url
            ))
            .bearer_auth(&self.service_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let created: DriveFileReply = response.json().await?;
        tracing::info!(folder_id = %created.id, name = %created.name, "Created archive folder");

        Ok(ArchivedFolder {
            id: created.id,
            name: created.name,
            web_view_link: created.web_view_link,
            files: Vec::new(),
        })
    }

    async fn store_file(
        &self,
        folder_id: &str,
        file: &UploadedFile,
    ) -> Result<ArchivedFile, ArchiveError> {
        let metadata = serde_json::json!({
            "name": file.name,
            "parents": [folder_id],
        });

        // The upload endpoint wants multipart/related (metadata part plus
        // media part), which reqwest's form-data builder cannot produce.
        let boundary = format!("part_{}", Uuid::new_v4().simple());
        let mut body: Vec<u8> = Vec::with_capacity(file.raw_bytes.len() + 512);
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(
            format!("\r\n--{boundary}\r\nContent-Type: {}\r\n\r\n", file.mime_type).as_bytes(),
        );
        body.extend_from_slice(&file.raw_bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());

        let response = self
            .client
            .post(format!(
                "{}/files?uploadType=multipart&fields=id,name,mimeType,webViewLink",
                self.upload_base_url
            ))
            .bearer_auth(&self.service_token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let stored: DriveFileReply = response.json().await?;
        Ok(ArchivedFile {
            id: stored.id,
            name: stored.name,
            mime_type: stored.mime_type.unwrap_or_else(|| file.mime_type.clone()),
            web_view_link: stored.web_view_link,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileReply {
    id: String,
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

/// Archive a whole submission: one folder, then each file in turn.
/// A failed file upload is logged and skipped; the folder still counts.
pub async fn archive_documents(
    archive: &dyn DocumentArchive,
    business_name: Option<&str>,
    files: &[UploadedFile],
) -> Result<ArchivedFolder, ArchiveError> {
    let name = folder_name(business_name, Utc::now().date_naive());
    let mut folder = archive.create_folder(&name).await?;

    for file in files {
        match archive.store_file(&folder.id, file).await {
            Ok(stored) => folder.files.push(stored),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "Could not archive document");
            }
        }
    }

    Ok(folder)
}

/// Folder display name: sanitized business name (or a default stem) plus
/// the submission date
pub fn folder_name(business_name: Option<&str>, date: NaiveDate) -> String {
    let stem = business_name
        .map(sanitize_name)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FOLDER_STEM.to_string());
    format!("{} - {}", stem, date.format("%Y-%m-%d"))
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
