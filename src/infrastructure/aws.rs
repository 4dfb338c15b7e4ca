use crate::config::AppConfig;
use aws_sdk_s3::config::Region;
use tracing::info;

/// AWS SDK clients, built once at startup and shared via `AppState`.
pub struct AwsClients {
    pub s3: aws_sdk_s3::Client,
    pub dynamodb: aws_sdk_dynamodb::Client,
}

pub async fn setup_aws(config: &AppConfig) -> AwsClients {
    let mut loader = aws_config::from_env().region(Region::new(config.aws_region.clone()));

    if let Some(endpoint_url) = &config.endpoint_url {
        info!("☁️  AWS endpoint override: {}", endpoint_url);
        loader = loader.endpoint_url(endpoint_url);
    }

    let aws_config = loader.load().await;

    // Path-style addressing is what MinIO and LocalStack expect
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.endpoint_url.is_some())
        .build();

    info!(
        "☁️  S3 bucket: {} | DynamoDB tables: {} / {}",
        config.s3_bucket, config.metadata_table, config.logs_table
    );

    AwsClients {
        s3: aws_sdk_s3::Client::from_conf(s3_config),
        dynamodb: aws_sdk_dynamodb::Client::new(&aws_config),
    }
}
