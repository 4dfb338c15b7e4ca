use crate::api::error::AppError;
use crate::models::FileRecord;
use crate::services::metadata::{PageKey, TargetQuery};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadataRequest {
    pub file_key: String,
    /// Remaining FileRecord fields, merged with `fileKey` before storage
    #[schema(value_type = Object)]
    pub metadata: serde_json::Map<String, Value>,
}

#[utoipa::path(
    post,
    path = "/files/metadata",
    request_body = StoreMetadataRequest,
    responses(
        (status = 200, description = "Record stored", body = FileRecord),
        (status = 400, description = "Missing fileKey or malformed metadata")
    ),
    tag = "metadata"
)]
pub async fn store_metadata(
    State(state): State<crate::AppState>,
    Json(req): Json<StoreMetadataRequest>,
) -> Result<Json<FileRecord>, AppError> {
    if req.file_key.is_empty() {
        return Err(AppError::BadRequest("fileKey is required".to_string()));
    }

    let mut fields = req.metadata;
    fields.insert("fileKey".to_string(), Value::String(req.file_key));
    let record: FileRecord = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::BadRequest(format!("Malformed metadata: {e}")))?;

    state.metadata.put(&record).await?;

    Ok(Json(record))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TargetListParams {
    pub target_id: Option<String>,
    pub target_type: Option<String>,
    pub limit: Option<i32>,
    /// JSON-encoded key returned by a previous page
    pub last_evaluated_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetListResponse {
    pub items: Vec<FileRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<String>,
}

#[utoipa::path(
    get,
    path = "/files",
    params(TargetListParams),
    responses(
        (status = 200, description = "Files for a target, newest first", body = TargetListResponse),
        (status = 400, description = "Missing targetId or unparsable pagination key")
    ),
    tag = "metadata"
)]
pub async fn list_by_target(
    State(state): State<crate::AppState>,
    Query(params): Query<TargetListParams>,
) -> Result<Json<TargetListResponse>, AppError> {
    let target_id = params
        .target_id
        .filter(|t| !t.is_empty())
        .ok_or(AppError::BadRequest("targetId is required".to_string()))?;

    let start_key = match params.last_evaluated_key.as_deref() {
        Some(raw) => Some(serde_json::from_str::<PageKey>(raw).map_err(|_| {
            AppError::BadRequest("lastEvaluatedKey is not a valid page key".to_string())
        })?),
        None => None,
    };

    let page = state
        .metadata
        .query_by_target(TargetQuery {
            target_id,
            target_type: params.target_type.filter(|t| !t.is_empty()),
            limit: params.limit,
            start_key,
        })
        .await?;

    let last_evaluated_key = page
        .last_evaluated_key
        .map(|key| serde_json::to_string(&key))
        .transpose()
        .map_err(|e| AppError::Internal(format!("Failed to encode page key: {e}")))?;

    Ok(Json(TargetListResponse {
        items: page.items,
        last_evaluated_key,
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserUsageParams {
    pub user_email: Option<String>,
}

#[utoipa::path(
    get,
    path = "/files/usage",
    params(UserUsageParams),
    responses(
        (status = 200, description = "Everything the user uploaded", body = [FileRecord]),
        (status = 400, description = "Missing userEmail")
    ),
    tag = "metadata"
)]
pub async fn user_usage(
    State(state): State<crate::AppState>,
    Query(params): Query<UserUsageParams>,
) -> Result<Json<Vec<FileRecord>>, AppError> {
    let user_email = params
        .user_email
        .filter(|e| !e.is_empty())
        .ok_or(AppError::BadRequest("userEmail is required".to_string()))?;

    let items = state.metadata.query_by_user(&user_email).await?;

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/admin/files",
    responses(
        (status = 200, description = "Every metadata row in the table", body = [FileRecord])
    ),
    tag = "admin"
)]
pub async fn list_all(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<FileRecord>>, AppError> {
    let items = state.metadata.scan_all().await?;

    Ok(Json(items))
}
