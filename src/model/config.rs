use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

const ENV_CONFIG_PATH: &str = "DOC_INTEL_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
const ENV_OPENAI_BASE_URL: &str = "DOC_INTEL_OPENAI_URL";
const ENV_ANTHROPIC_BASE_URL: &str = "DOC_INTEL_ANTHROPIC_URL";
const ENV_OPENAI_MODEL: &str = "DOC_INTEL_OPENAI_MODEL";
const ENV_STATEMENT_MODEL: &str = "DOC_INTEL_STATEMENT_MODEL";
const ENV_DEAL_MODEL: &str = "DOC_INTEL_DEAL_MODEL";

const ENV_ARCHIVE_FOLDER_ID: &str = "ARCHIVE_FOLDER_ID";
const ENV_ARCHIVE_SERVICE_TOKEN: &str = "ARCHIVE_SERVICE_TOKEN";
const ENV_ARCHIVE_IMPERSONATE_USER: &str = "ARCHIVE_IMPERSONATE_USER";
const ENV_ARCHIVE_BASE_URL: &str = "DOC_INTEL_ARCHIVE_URL";
const ENV_ARCHIVE_UPLOAD_URL: &str = "DOC_INTEL_ARCHIVE_UPLOAD_URL";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ARCHIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_ARCHIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_STATEMENT_MODEL: &str = "claude-3-5-haiku-20241022";
const DEFAULT_DEAL_MODEL: &str = "claude-3-5-sonnet-20241022";

const DEFAULT_TIME_BUDGET_SECS: u64 = 100;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_INLINE_BYTES: usize = 18 * 1024 * 1024;

// Anthropic token budgets sit two orders of magnitude below OpenAI's,
// so inline analysis runs one file at a time with long pauses.
const DEFAULT_UPLOAD_BATCH_SIZE: usize = 5;
const DEFAULT_UPLOAD_PAUSE_MS: u64 = 500;
const DEFAULT_INLINE_BATCH_SIZE: usize = 1;
const DEFAULT_INLINE_PAUSE_MS: u64 = 20_000;

/// Batch sizing and inter-batch pause for one provider rate-limit class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub batch_size: usize,
    pub pause: Duration,
}

/// Schedule overrides for one provider class, as read from the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleOverride {
    pub batch_size: Option<usize>,
    pub pause_ms: Option<u64>,
}

impl ScheduleOverride {
    fn resolve(&self, default_batch: usize, default_pause_ms: u64) -> ScheduleSettings {
        ScheduleSettings {
            batch_size: self.batch_size.unwrap_or(default_batch).max(1),
            pause: Duration::from_millis(self.pause_ms.unwrap_or(default_pause_ms)),
        }
    }
}

/// Processing limit overrides, as read from the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitsOverride {
    pub time_budget_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_inline_bytes: Option<usize>,
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub limits: LimitsOverride,
    /// Scheduling for the upload-based (high-throughput) provider class
    #[serde(default)]
    pub upload_schedule: ScheduleOverride,
    /// Scheduling for the inline-bytes (vision/document) provider class
    #[serde(default)]
    pub inline_schedule: ScheduleOverride,
}

/// Analysis provider credentials and endpoints
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub openai_model: String,
    /// Vision model for the bank-statement pipeline
    pub statement_model: String,
    /// Vision model for the deal-document pipeline (larger output budget)
    pub deal_model: String,
}

impl ProviderConfig {
    /// At least one analysis provider has credentials
    pub fn any_configured(&self) -> bool {
        self.openai_api_key.is_some() || self.anthropic_api_key.is_some()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            statement_model: DEFAULT_STATEMENT_MODEL.to_string(),
            deal_model: DEFAULT_DEAL_MODEL.to_string(),
        }
    }
}

/// Cloud archive (document folder) configuration for the deal pipeline
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub upload_base_url: String,
    pub parent_folder_id: Option<String>,
    /// Opaque bearer credential minted for the archive service account
    pub service_token: Option<String>,
    /// Workspace identity the uploads are attributed to
    pub impersonate_user: Option<String>,
}

impl ArchiveConfig {
    pub fn is_configured(&self) -> bool {
        self.parent_folder_id.is_some() && self.service_token.is_some()
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            upload_base_url: DEFAULT_ARCHIVE_UPLOAD_URL.to_string(),
            parent_folder_id: None,
            service_token: None,
            impersonate_user: None,
        }
    }
}

/// Batch processing limits and schedules
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// Wall-clock budget for an entire parse request
    pub time_budget: Duration,
    /// Per-HTTP-call timeout for provider requests
    pub request_timeout: Duration,
    /// Hard ceiling for documents carried inline to a provider
    pub max_inline_bytes: usize,
    pub upload_schedule: ScheduleSettings,
    pub inline_schedule: ScheduleSettings,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(DEFAULT_TIME_BUDGET_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
            upload_schedule: ScheduleSettings {
                batch_size: DEFAULT_UPLOAD_BATCH_SIZE,
                pause: Duration::from_millis(DEFAULT_UPLOAD_PAUSE_MS),
            },
            inline_schedule: ScheduleSettings {
                batch_size: DEFAULT_INLINE_BATCH_SIZE,
                pause: Duration::from_millis(DEFAULT_INLINE_PAUSE_MS),
            },
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub providers: ProviderConfig,
    pub archive: ArchiveConfig,
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            providers: ProviderConfig::default(),
            archive: ArchiveConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        let providers = ProviderConfig {
            openai_api_key: env_non_empty(ENV_OPENAI_API_KEY),
            anthropic_api_key: env_non_empty(ENV_ANTHROPIC_API_KEY),
            openai_base_url: env_non_empty(ENV_OPENAI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            anthropic_base_url: env_non_empty(ENV_ANTHROPIC_BASE_URL)
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            openai_model: env_non_empty(ENV_OPENAI_MODEL)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            statement_model: env_non_empty(ENV_STATEMENT_MODEL)
                .unwrap_or_else(|| DEFAULT_STATEMENT_MODEL.to_string()),
            deal_model: env_non_empty(ENV_DEAL_MODEL)
                .unwrap_or_else(|| DEFAULT_DEAL_MODEL.to_string()),
        };

        let archive = ArchiveConfig {
            base_url: env_non_empty(ENV_ARCHIVE_BASE_URL)
                .unwrap_or_else(|| DEFAULT_ARCHIVE_BASE_URL.to_string()),
            upload_base_url: env_non_empty(ENV_ARCHIVE_UPLOAD_URL)
                .unwrap_or_else(|| DEFAULT_ARCHIVE_UPLOAD_URL.to_string()),
            parent_folder_id: env_non_empty(ENV_ARCHIVE_FOLDER_ID),
            service_token: env_non_empty(ENV_ARCHIVE_SERVICE_TOKEN),
            impersonate_user: env_non_empty(ENV_ARCHIVE_IMPERSONATE_USER),
        };

        let limits = &file.limits;
        let processing = ProcessingConfig {
            time_budget: Duration::from_secs(
                limits.time_budget_secs.unwrap_or(DEFAULT_TIME_BUDGET_SECS),
            ),
            request_timeout: Duration::from_secs(
                limits
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            max_inline_bytes: limits.max_inline_bytes.unwrap_or(DEFAULT_MAX_INLINE_BYTES),
            upload_schedule: file
                .upload_schedule
                .resolve(DEFAULT_UPLOAD_BATCH_SIZE, DEFAULT_UPLOAD_PAUSE_MS),
            inline_schedule: file
                .inline_schedule
                .resolve(DEFAULT_INLINE_BATCH_SIZE, DEFAULT_INLINE_PAUSE_MS),
        };

        Self {
            port,
            host,
            providers,
            archive,
            processing,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Handle empty file
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
