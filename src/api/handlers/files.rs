use crate::api::error::AppError;
use crate::models::{FileRecord, LogAction, UsageLogEntry};
use crate::services::storage::PresignAction;
use crate::utils::identity::RequestIdentity;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Percent-decode a file key, treating undecodable input as already decoded.
pub(crate) fn decode_file_key(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadRequest {
    pub original_file_name: String,
    pub target_id: String,
    pub target_type: String,
    pub user_email: String,
    pub user_nickname: String,
    pub file_size: i64,
    pub content_type: Option<String>,
    pub actual_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub presigned_url: String,
    pub file_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlResponse {
    pub presigned_url: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PresignRequest {
    pub action: String,
    pub file_key: String,
    pub content_type: Option<String>,
}

#[utoipa::path(
    post,
    path = "/files/upload",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Upload URL issued and metadata stored", body = UploadResponse),
        (status = 400, description = "Missing required field")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<crate::AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    if req.original_file_name.is_empty() || req.target_id.is_empty() || req.user_email.is_empty() {
        return Err(AppError::BadRequest(
            "originalFileName, targetId and userEmail are required".to_string(),
        ));
    }

    let decoded_name = decode_file_key(&req.original_file_name);
    let file_key = format!("files/{}-{}", Utc::now().timestamp_millis(), decoded_name);

    let presigned_url = state
        .objects
        .presign_put(
            &file_key,
            req.actual_type.as_deref().or(req.content_type.as_deref()),
        )
        .await?;

    let record = FileRecord {
        file_key: file_key.clone(),
        target_id: req.target_id,
        target_type: req.target_type,
        user_email: req.user_email,
        user_nickname: req.user_nickname,
        file_size: req.file_size,
        extension: extension_of(&decoded_name),
        content_type: req.content_type.unwrap_or_default(),
        original_file_name: decoded_name,
        created_at: req.created_at.unwrap_or_else(Utc::now),
        download_count: 0,
    };
    state.metadata.put(&record).await?;

    tracing::info!("📤 Upload registered: {}", file_key);

    Ok(Json(UploadResponse {
        presigned_url,
        file_key,
    }))
}

#[utoipa::path(
    post,
    path = "/files/presign",
    request_body = PresignRequest,
    responses(
        (status = 200, description = "Presigned URL issued", body = PresignedUrlResponse),
        (status = 400, description = "Missing field or invalid action")
    ),
    tag = "files"
)]
pub async fn presign_url(
    State(state): State<crate::AppState>,
    Json(req): Json<PresignRequest>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    if req.action.is_empty() || req.file_key.is_empty() {
        return Err(AppError::BadRequest(
            "action and fileKey are required".to_string(),
        ));
    }

    let action: PresignAction = req
        .action
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid action: {}", req.action)))?;

    let file_key = decode_file_key(&req.file_key);
    let presigned_url = state
        .objects
        .presign(action, &file_key, req.content_type.as_deref())
        .await?;

    Ok(Json(PresignedUrlResponse { presigned_url }))
}

#[utoipa::path(
    get,
    path = "/files/view/{fileKey}",
    params(
        ("fileKey" = String, Path, description = "File key, URL-encoded")
    ),
    responses(
        (status = 200, description = "Preview URL issued", body = PresignedUrlResponse)
    ),
    tag = "files"
)]
pub async fn view_file(
    State(state): State<crate::AppState>,
    Path(file_key): Path<String>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    let file_key = decode_file_key(&file_key);
    let presigned_url = state.objects.presign_get(&file_key, None).await?;

    Ok(Json(PresignedUrlResponse { presigned_url }))
}

#[utoipa::path(
    get,
    path = "/files/download/{fileKey}",
    params(
        ("fileKey" = String, Path, description = "File key, URL-encoded")
    ),
    responses(
        (status = 200, description = "Download URL issued, count incremented", body = PresignedUrlResponse),
        (status = 404, description = "No metadata for key")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<crate::AppState>,
    identity: RequestIdentity,
    Path(file_key): Path<String>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    let file_key = decode_file_key(&file_key);

    // Single guarded call: bump the count and read the row it bumped
    let record = state
        .metadata
        .increment_download(&file_key)
        .await?
        .ok_or(AppError::NotFound("File not found".to_string()))?;

    let content_type = (!record.content_type.is_empty()).then_some(record.content_type.as_str());
    let presigned_url = state.objects.presign_get(&file_key, content_type).await?;

    state
        .logs
        .record(usage_entry(LogAction::Download, &record, &identity))
        .await;

    Ok(Json(PresignedUrlResponse { presigned_url }))
}

#[utoipa::path(
    delete,
    path = "/files/{fileKey}",
    params(
        ("fileKey" = String, Path, description = "File key, URL-encoded")
    ),
    responses(
        (status = 200, description = "Metadata removed, delete URL issued", body = PresignedUrlResponse),
        (status = 404, description = "No metadata for key")
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<crate::AppState>,
    identity: RequestIdentity,
    Path(file_key): Path<String>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    let file_key = decode_file_key(&file_key);

    // Metadata goes first; the object itself is removed by the caller via
    // the returned URL. Two racing deletes resolve here: the loser sees None.
    let record = state
        .metadata
        .delete(&file_key)
        .await?
        .ok_or(AppError::NotFound("File not found".to_string()))?;

    let presigned_url = state.objects.presign_delete(&file_key).await?;

    state
        .logs
        .record(usage_entry(LogAction::Delete, &record, &identity))
        .await;

    tracing::info!("🗑️  Metadata removed: {}", file_key);

    Ok(Json(PresignedUrlResponse { presigned_url }))
}

fn usage_entry(action: LogAction, record: &FileRecord, identity: &RequestIdentity) -> UsageLogEntry {
    UsageLogEntry {
        log_id: String::new(), // assigned on append
        action,
        file_key: record.file_key.clone(),
        original_file_name: record.original_file_name.clone(),
        uploader_email: record.user_email.clone(),
        user_email: identity.email.clone(),
        user_role: identity.role.clone(),
        created_at: Utc::now(),
        file_size: record.file_size,
        target_id: record.target_id.clone(),
        target_type: record.target_type.clone(),
        ip_address: identity.ip_address.clone(),
        user_agent: identity.user_agent.clone(),
    }
}
