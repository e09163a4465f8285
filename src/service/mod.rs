pub mod archive;
pub mod batch;
pub mod decode;
pub mod extraction;
pub mod json;
pub mod retry;

pub use archive::{archive_documents, folder_name, DocumentArchive, DriveArchive};
pub use decode::decode_base64_content;
pub use extraction::{ExtractionOutcome, ExtractionService};
pub use json::extract_json;
pub use retry::RetryPolicy;
