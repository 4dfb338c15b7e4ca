use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// One row per uploaded file, keyed by `fileKey`.
///
/// `fileKey` is derived at upload time as `files/<epoch-ms>-<original-name>`
/// and doubles as the S3 object key the presigned URLs point at.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_key: String,
    pub target_id: String,
    pub target_type: String,
    pub user_email: String,
    #[serde(default)]
    pub user_nickname: String,
    pub file_size: i64,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub content_type: String,
    pub original_file_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub download_count: i64,
}

/// Usage events recorded against the log table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogAction {
    Download,
    Delete,
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogAction::Download => write!(f, "DOWNLOAD"),
            LogAction::Delete => write!(f, "DELETE"),
        }
    }
}

impl FromStr for LogAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOWNLOAD" => Ok(LogAction::Download),
            "DELETE" => Ok(LogAction::Delete),
            other => Err(format!("unknown log action: {other}")),
        }
    }
}

/// Append-only usage log entry.
///
/// Carries a denormalized snapshot of the file metadata at event time, so
/// later metadata changes never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
    pub log_id: String,
    pub action: LogAction,
    pub file_key: String,
    #[serde(default)]
    pub original_file_name: String,
    #[serde(default)]
    pub uploader_email: String,
    pub user_email: String,
    #[serde(default)]
    pub user_role: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
}
