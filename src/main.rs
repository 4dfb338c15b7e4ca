use dotenvy::dotenv;
use esquad_file_backend::config::AppConfig;
use esquad_file_backend::infrastructure::aws;
use esquad_file_backend::services::logs::{DynamoUsageLogStore, UsageLogService};
use esquad_file_backend::services::metadata::DynamoMetadataStore;
use esquad_file_backend::services::storage::S3ObjectStore;
use esquad_file_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esquad_file_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Esquad file backend...");

    let config = AppConfig::from_env();
    let clients = aws::setup_aws(&config).await;

    let objects = Arc::new(S3ObjectStore::new(
        clients.s3,
        config.s3_bucket.clone(),
        config.presign_expiry_secs,
    ));
    let metadata = Arc::new(DynamoMetadataStore::new(
        clients.dynamodb.clone(),
        config.metadata_table.clone(),
        config.target_index.clone(),
        config.user_index.clone(),
    ));
    let logs = UsageLogService::new(Arc::new(DynamoUsageLogStore::new(
        clients.dynamodb,
        config.logs_table.clone(),
        config.log_action_index.clone(),
        config.log_uploader_index.clone(),
        config.log_user_index.clone(),
    )));

    let state = AppState {
        metadata,
        logs,
        objects,
        config: config.clone(),
    };

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr: SocketAddr = config.bind_addr.parse()?;
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
