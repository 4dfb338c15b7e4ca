pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::logs::UsageLogService;
use crate::services::metadata::MetadataStore;
use crate::services::storage::ObjectStore;
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::presign_url,
        api::handlers::files::view_file,
        api::handlers::files::download_file,
        api::handlers::files::delete_file,
        api::handlers::metadata::store_metadata,
        api::handlers::metadata::list_by_target,
        api::handlers::metadata::user_usage,
        api::handlers::metadata::list_all,
        api::handlers::logs::list_by_action,
        api::handlers::logs::list_user_deletes,
        api::handlers::logs::list_user_downloads,
        api::handlers::logs::delete_log,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::files::UploadRequest,
            api::handlers::files::UploadResponse,
            api::handlers::files::PresignRequest,
            api::handlers::files::PresignedUrlResponse,
            api::handlers::metadata::StoreMetadataRequest,
            api::handlers::metadata::TargetListResponse,
            api::handlers::logs::LogListResponse,
            api::handlers::logs::LogDeleteResponse,
            api::handlers::health::HealthResponse,
            models::FileRecord,
            models::UsageLogEntry,
            models::LogAction,
        )
    ),
    tags(
        (name = "files", description = "Presigned URL issuance and file lifecycle"),
        (name = "metadata", description = "File metadata queries"),
        (name = "logs", description = "Usage log queries"),
        (name = "admin", description = "Administrative endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub metadata: Arc<dyn MetadataStore>,
    pub logs: UsageLogService,
    pub objects: Arc<dyn ObjectStore>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/files", get(api::handlers::metadata::list_by_target))
        .route("/files/upload", post(api::handlers::files::upload_file))
        .route("/files/presign", post(api::handlers::files::presign_url))
        .route(
            "/files/metadata",
            post(api::handlers::metadata::store_metadata),
        )
        .route("/files/usage", get(api::handlers::metadata::user_usage))
        .route("/files/view/*file_key", get(api::handlers::files::view_file))
        .route(
            "/files/download/*file_key",
            get(api::handlers::files::download_file),
        )
        .route("/files/*file_key", delete(api::handlers::files::delete_file))
        .route("/admin/files", get(api::handlers::metadata::list_all))
        .route(
            "/logs/action/:action",
            get(api::handlers::logs::list_by_action),
        )
        .route(
            "/logs/user-delete",
            get(api::handlers::logs::list_user_deletes),
        )
        .route(
            "/logs/user-download",
            get(api::handlers::logs::list_user_downloads),
        )
        .route("/logs/:log_id", delete(api::handlers::logs::delete_log))
        .layer(cors)
        .with_state(state)
}
