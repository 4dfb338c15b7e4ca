use std::env;

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to (default: "127.0.0.1:3000")
    pub bind_addr: String,

    /// AWS region (default: "ap-northeast-2")
    pub aws_region: String,

    /// Optional endpoint override for MinIO / DynamoDB Local
    pub endpoint_url: Option<String>,

    /// S3 bucket presigned URLs are issued against
    pub s3_bucket: String,

    /// DynamoDB table holding file metadata
    pub metadata_table: String,

    /// DynamoDB table holding usage log entries
    pub logs_table: String,

    /// Metadata GSI: hash `targetId`, range `createdAt`
    pub target_index: String,

    /// Metadata GSI: hash `userEmail`
    pub user_index: String,

    /// Log GSI: hash `action`
    pub log_action_index: String,

    /// Log GSI: hash `uploaderEmail`
    pub log_uploader_index: String,

    /// Log GSI: hash `userEmail`
    pub log_user_index: String,

    /// Presigned URL lifetime in seconds (default: 300)
    pub presign_expiry_secs: u64,

    /// Allowed CORS origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            aws_region: "ap-northeast-2".to_string(),
            endpoint_url: None,
            s3_bucket: "esquad-files".to_string(),
            metadata_table: "esquad-file-metadata".to_string(),
            logs_table: "esquad-file-logs".to_string(),
            target_index: "targetId-createdAt-index".to_string(),
            user_index: "userEmail-index".to_string(),
            log_action_index: "action-index".to_string(),
            log_uploader_index: "uploaderEmail-index".to_string(),
            log_user_index: "userEmail-index".to_string(),
            presign_expiry_secs: 300,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(default.bind_addr),

            aws_region: env::var("AWS_REGION").unwrap_or(default.aws_region),

            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),

            s3_bucket: env::var("S3_BUCKET").unwrap_or(default.s3_bucket),

            metadata_table: env::var("METADATA_TABLE").unwrap_or(default.metadata_table),

            logs_table: env::var("LOGS_TABLE").unwrap_or(default.logs_table),

            target_index: env::var("METADATA_TARGET_INDEX").unwrap_or(default.target_index),

            user_index: env::var("METADATA_USER_INDEX").unwrap_or(default.user_index),

            log_action_index: env::var("LOGS_ACTION_INDEX").unwrap_or(default.log_action_index),

            log_uploader_index: env::var("LOGS_UPLOADER_INDEX")
                .unwrap_or(default.log_uploader_index),

            log_user_index: env::var("LOGS_USER_INDEX").unwrap_or(default.log_user_index),

            presign_expiry_secs: env::var("PRESIGN_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.presign_expiry_secs),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.presign_expiry_secs, 300);
        assert_eq!(config.target_index, "targetId-createdAt-index");
        assert!(config.endpoint_url.is_none());
    }

    #[test]
    fn test_from_env_presign_expiry() {
        unsafe { env::set_var("PRESIGN_EXPIRY_SECS", "600") };
        let config = AppConfig::from_env();
        assert_eq!(config.presign_expiry_secs, 600);

        unsafe { env::set_var("PRESIGN_EXPIRY_SECS", "not-a-number") };
        let config = AppConfig::from_env();
        unsafe { env::remove_var("PRESIGN_EXPIRY_SECS") };
        assert_eq!(config.presign_expiry_secs, 300);
    }

    #[test]
    fn test_allowed_origins_are_split_and_trimmed() {
        unsafe {
            env::set_var(
                "ALLOWED_ORIGINS",
                "https://esquad.example.com, http://localhost:5173",
            )
        };
        let config = AppConfig::from_env();
        unsafe { env::remove_var("ALLOWED_ORIGINS") };
        assert_eq!(
            config.allowed_origins,
            vec![
                "https://esquad.example.com".to_string(),
                "http://localhost:5173".to_string()
            ]
        );
    }
}
