use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use std::str::FromStr;
use std::time::Duration;

/// S3 actions a presigned URL can be issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignAction {
    GetObject,
    PutObject,
    DeleteObject,
}

impl FromStr for PresignAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getObject" => Ok(PresignAction::GetObject),
            "putObject" => Ok(PresignAction::PutObject),
            "deleteObject" => Ok(PresignAction::DeleteObject),
            other => Err(format!("invalid action: {other}")),
        }
    }
}

/// Issues time-limited URLs for direct client-to-S3 transfer. File bytes
/// never transit this service.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn presign_get(&self, key: &str, content_type: Option<&str>) -> Result<String>;
    async fn presign_put(&self, key: &str, content_type: Option<&str>) -> Result<String>;
    async fn presign_delete(&self, key: &str) -> Result<String>;

    async fn presign(
        &self,
        action: PresignAction,
        key: &str,
        content_type: Option<&str>,
    ) -> Result<String> {
        match action {
            PresignAction::GetObject => self.presign_get(key, content_type).await,
            PresignAction::PutObject => self.presign_put(key, content_type).await,
            PresignAction::DeleteObject => self.presign_delete(key).await,
        }
    }
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    expiry: Duration,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String, expiry_secs: u64) -> Self {
        Self {
            client,
            bucket,
            expiry: Duration::from_secs(expiry_secs),
        }
    }

    fn presigning_config(&self) -> Result<PresigningConfig> {
        Ok(PresigningConfig::expires_in(self.expiry)?)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_get(&self, key: &str, content_type: Option<&str>) -> Result<String> {
        let mut req = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(ct) = content_type {
            req = req.response_content_type(ct);
        }
        let presigned = req.presigned(self.presigning_config()?).await?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_put(&self, key: &str, content_type: Option<&str>) -> Result<String> {
        let mut req = self.client.put_object().bucket(&self.bucket).key(key);
        if let Some(ct) = content_type {
            req = req.content_type(ct);
        }
        let presigned = req.presigned(self.presigning_config()?).await?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_delete(&self, key: &str) -> Result<String> {
        let presigned = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning_config()?)
            .await?;
        Ok(presigned.uri().to_string())
    }
}
