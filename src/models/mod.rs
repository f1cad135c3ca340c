use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

/// Per-request upload context. Owned by the `UploadHandler` built for one request.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Room that receives progress events. `None` means nobody is listening.
    pub session_id: Option<String>,
    pub destination_folder: PathBuf,
    pub progress_interval: Duration,
}

impl UploadSession {
    pub fn new(
        session_id: Option<String>,
        destination_folder: impl Into<PathBuf>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            session_id: session_id.filter(|id| !id.is_empty()),
            destination_folder: destination_folder.into(),
            progress_interval,
        }
    }
}

/// One file discovered in a multipart body, alive only while it is being transferred.
pub struct FilePart<S> {
    pub field_name: String,
    pub file_name: String,
    pub byte_stream: S,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProgressEvent {
    #[serde(rename = "processedAlready")]
    pub processed_already: u64,
    pub filename: String,
}

/// Inventory entry derived from filesystem attributes on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileMetadata {
    #[serde(rename = "file")]
    pub file_name: String,
    #[serde(rename = "size")]
    pub size_human_readable: String,
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
    pub owner: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub result: String,
}

impl UploadResponse {
    pub fn success() -> Self {
        Self {
            result: "File uploaded with success!".to_string(),
        }
    }
}
