use crate::api::error::AppError;
use crate::models::{LogAction, UsageLogEntry};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct LogListResponse {
    pub items: Vec<UsageLogEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogDeleteResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LogUserParams {
    pub user_email: Option<String>,
}

#[utoipa::path(
    get,
    path = "/logs/action/{action}",
    params(
        ("action" = String, Path, description = "DOWNLOAD or DELETE")
    ),
    responses(
        (status = 200, description = "Entries for one action", body = LogListResponse),
        (status = 400, description = "Unknown action")
    ),
    tag = "logs"
)]
pub async fn list_by_action(
    State(state): State<crate::AppState>,
    Path(action): Path<String>,
) -> Result<Json<LogListResponse>, AppError> {
    let action: LogAction = action
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid action: {action}")))?;

    let items = state.logs.query_by_action(action).await?;

    Ok(Json(LogListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/logs/user-delete",
    params(LogUserParams),
    responses(
        (status = 200, description = "DELETE entries against the user's uploads", body = LogListResponse),
        (status = 400, description = "Missing userEmail")
    ),
    tag = "logs"
)]
pub async fn list_user_deletes(
    State(state): State<crate::AppState>,
    Query(params): Query<LogUserParams>,
) -> Result<Json<LogListResponse>, AppError> {
    let user_email = params
        .user_email
        .filter(|e| !e.is_empty())
        .ok_or(AppError::BadRequest("userEmail is required".to_string()))?;

    let items = state.logs.query_uploader_deletes(&user_email).await?;

    Ok(Json(LogListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/logs/user-download",
    params(LogUserParams),
    responses(
        (status = 200, description = "DOWNLOAD entries performed by the user", body = LogListResponse),
        (status = 400, description = "Missing userEmail")
    ),
    tag = "logs"
)]
pub async fn list_user_downloads(
    State(state): State<crate::AppState>,
    Query(params): Query<LogUserParams>,
) -> Result<Json<LogListResponse>, AppError> {
    let user_email = params
        .user_email
        .filter(|e| !e.is_empty())
        .ok_or(AppError::BadRequest("userEmail is required".to_string()))?;

    let items = state.logs.query_user_downloads(&user_email).await?;

    Ok(Json(LogListResponse { items }))
}

#[utoipa::path(
    delete,
    path = "/logs/{logId}",
    params(
        ("logId" = String, Path, description = "Log entry id")
    ),
    responses(
        (status = 200, description = "Entry deleted", body = LogDeleteResponse)
    ),
    tag = "logs"
)]
pub async fn delete_log(
    State(state): State<crate::AppState>,
    Path(log_id): Path<String>,
) -> Result<Json<LogDeleteResponse>, AppError> {
    state.logs.delete(&log_id).await?;

    Ok(Json(LogDeleteResponse {
        message: format!("Log entry {log_id} deleted"),
    }))
}
