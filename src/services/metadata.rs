use crate::models::FileRecord;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exclusive-start key for forward pagination over the target index.
///
/// Serialized form is the JSON object the caller passes back verbatim in
/// `lastEvaluatedKey`; it carries the table key plus both index key
/// attributes, which is exactly what DynamoDB hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageKey {
    pub file_key: String,
    pub target_id: String,
    pub created_at: String,
}

impl PageKey {
    pub fn to_attributes(&self) -> HashMap<String, AttributeValue> {
        let mut key = HashMap::new();
        key.insert(
            "fileKey".to_string(),
            AttributeValue::S(self.file_key.clone()),
        );
        key.insert(
            "targetId".to_string(),
            AttributeValue::S(self.target_id.clone()),
        );
        key.insert(
            "createdAt".to_string(),
            AttributeValue::S(self.created_at.clone()),
        );
        key
    }

    pub fn from_attributes(key: &HashMap<String, AttributeValue>) -> Self {
        Self {
            file_key: attr_s(key, "fileKey"),
            target_id: attr_s(key, "targetId"),
            created_at: attr_s(key, "createdAt"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TargetQuery {
    pub target_id: String,
    pub target_type: Option<String>,
    pub limit: Option<i32>,
    pub start_key: Option<PageKey>,
}

#[derive(Debug, Clone)]
pub struct FilePage {
    pub items: Vec<FileRecord>,
    pub last_evaluated_key: Option<PageKey>,
}

/// File metadata CRUD, keyed by `fileKey`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn put(&self, record: &FileRecord) -> Result<()>;

    /// Atomically bumps `downloadCount` and returns the updated record.
    /// Returns `None` when no row exists for the key.
    async fn increment_download(&self, file_key: &str) -> Result<Option<FileRecord>>;

    /// Removes the row and returns its last state. Returns `None` when the
    /// row was already gone, so two racing deletes resolve to one winner.
    async fn delete(&self, file_key: &str) -> Result<Option<FileRecord>>;

    /// Newest-first page of files attached to one target.
    async fn query_by_target(&self, query: TargetQuery) -> Result<FilePage>;

    /// Everything a user has uploaded. Unpaginated.
    async fn query_by_user(&self, user_email: &str) -> Result<Vec<FileRecord>>;

    /// Full table contents. Follows scan pages to completion, so cost grows
    /// with table size.
    async fn scan_all(&self) -> Result<Vec<FileRecord>>;
}

fn attr_s(item: &HashMap<String, AttributeValue>, name: &str) -> String {
    match item.get(name) {
        Some(AttributeValue::S(s)) => s.clone(),
        _ => String::new(),
    }
}

fn attr_n(item: &HashMap<String, AttributeValue>, name: &str) -> i64 {
    match item.get(name) {
        Some(AttributeValue::N(n)) => n.parse().unwrap_or(0),
        _ => 0,
    }
}

fn attr_time(item: &HashMap<String, AttributeValue>, name: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&attr_s(item, name))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn to_item(record: &FileRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        "fileKey".to_string(),
        AttributeValue::S(record.file_key.clone()),
    );
    item.insert(
        "targetId".to_string(),
        AttributeValue::S(record.target_id.clone()),
    );
    item.insert(
        "targetType".to_string(),
        AttributeValue::S(record.target_type.clone()),
    );
    item.insert(
        "userEmail".to_string(),
        AttributeValue::S(record.user_email.clone()),
    );
    item.insert(
        "userNickname".to_string(),
        AttributeValue::S(record.user_nickname.clone()),
    );
    item.insert(
        "fileSize".to_string(),
        AttributeValue::N(record.file_size.to_string()),
    );
    item.insert(
        "extension".to_string(),
        AttributeValue::S(record.extension.clone()),
    );
    item.insert(
        "contentType".to_string(),
        AttributeValue::S(record.content_type.clone()),
    );
    item.insert(
        "originalFileName".to_string(),
        AttributeValue::S(record.original_file_name.clone()),
    );
    item.insert(
        "createdAt".to_string(),
        AttributeValue::S(record.created_at.to_rfc3339()),
    );
    item.insert(
        "downloadCount".to_string(),
        AttributeValue::N(record.download_count.to_string()),
    );
    item
}

fn from_item(item: &HashMap<String, AttributeValue>) -> FileRecord {
    FileRecord {
        file_key: attr_s(item, "fileKey"),
        target_id: attr_s(item, "targetId"),
        target_type: attr_s(item, "targetType"),
        user_email: attr_s(item, "userEmail"),
        user_nickname: attr_s(item, "userNickname"),
        file_size: attr_n(item, "fileSize"),
        extension: attr_s(item, "extension"),
        content_type: attr_s(item, "contentType"),
        original_file_name: attr_s(item, "originalFileName"),
        created_at: attr_time(item, "createdAt"),
        download_count: attr_n(item, "downloadCount"),
    }
}

pub struct DynamoMetadataStore {
    client: Client,
    table_name: String,
    target_index: String,
    user_index: String,
}

impl DynamoMetadataStore {
    pub fn new(
        client: Client,
        table_name: String,
        target_index: String,
        user_index: String,
    ) -> Self {
        Self {
            client,
            table_name,
            target_index,
            user_index,
        }
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn put(&self, record: &FileRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(record)))
            .send()
            .await?;
        Ok(())
    }

    async fn increment_download(&self, file_key: &str) -> Result<Option<FileRecord>> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("fileKey", AttributeValue::S(file_key.to_string()))
            .update_expression("SET downloadCount = if_not_exists(downloadCount, :zero) + :one")
            .condition_expression("attribute_exists(fileKey)")
            .expression_attribute_values(":zero", AttributeValue::N("0".to_string()))
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(out) => Ok(out.attributes().map(from_item)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, file_key: &str) -> Result<Option<FileRecord>> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("fileKey", AttributeValue::S(file_key.to_string()))
            .condition_expression("attribute_exists(fileKey)")
            .return_values(ReturnValue::AllOld)
            .send()
            .await;

        match result {
            Ok(out) => Ok(out.attributes().map(from_item)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn query_by_target(&self, query: TargetQuery) -> Result<FilePage> {
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.target_index)
            .key_condition_expression("targetId = :targetId")
            .expression_attribute_values(":targetId", AttributeValue::S(query.target_id))
            .scan_index_forward(false);

        if let Some(target_type) = query.target_type {
            request = request
                .filter_expression("targetType = :targetType")
                .expression_attribute_values(":targetType", AttributeValue::S(target_type));
        }

        if let Some(limit) = query.limit {
            request = request.limit(limit);
        }

        if let Some(start_key) = query.start_key {
            request = request.set_exclusive_start_key(Some(start_key.to_attributes()));
        }

        let result = request.send().await?;

        let items = result.items().iter().map(from_item).collect();
        let last_evaluated_key = result.last_evaluated_key().map(PageKey::from_attributes);

        Ok(FilePage {
            items,
            last_evaluated_key,
        })
    }

    async fn query_by_user(&self, user_email: &str) -> Result<Vec<FileRecord>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.user_index)
            .key_condition_expression("userEmail = :userEmail")
            .expression_attribute_values(":userEmail", AttributeValue::S(user_email.to_string()))
            .send()
            .await?;

        Ok(result.items().iter().map(from_item).collect())
    }

    async fn scan_all(&self) -> Result<Vec<FileRecord>> {
        let mut records = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request = self.client.scan().table_name(&self.table_name);

            if let Some(key) = &exclusive_start_key {
                request = request.set_exclusive_start_key(Some(key.clone()));
            }

            let result = request.send().await?;

            for item in result.items() {
                records.push(from_item(item));
            }

            if result.last_evaluated_key().is_none() {
                break;
            }
            exclusive_start_key = result.last_evaluated_key().cloned();
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FileRecord {
        FileRecord {
            file_key: "files/1700000000000-report.pdf".to_string(),
            target_id: "T1".to_string(),
            target_type: "CHAT".to_string(),
            user_email: "alice@example.com".to_string(),
            user_nickname: "alice".to_string(),
            file_size: 2048,
            extension: "pdf".to_string(),
            content_type: "application/pdf".to_string(),
            original_file_name: "report.pdf".to_string(),
            created_at: Utc::now(),
            download_count: 3,
        }
    }

    #[test]
    fn test_item_roundtrip() {
        let record = sample_record();
        let restored = from_item(&to_item(&record));
        assert_eq!(restored.file_key, record.file_key);
        assert_eq!(restored.file_size, 2048);
        assert_eq!(restored.download_count, 3);
        assert_eq!(
            restored.created_at.timestamp_millis(),
            record.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_from_item_tolerates_missing_attributes() {
        let mut item = HashMap::new();
        item.insert(
            "fileKey".to_string(),
            AttributeValue::S("files/1-x.txt".to_string()),
        );
        let record = from_item(&item);
        assert_eq!(record.file_key, "files/1-x.txt");
        assert_eq!(record.download_count, 0);
        assert_eq!(record.user_email, "");
    }

    #[test]
    fn test_page_key_json_roundtrip() {
        let key = PageKey {
            file_key: "files/1700000000000-a.png".to_string(),
            target_id: "T9".to_string(),
            created_at: "2025-11-01T12:00:00+00:00".to_string(),
        };
        let encoded = serde_json::to_string(&key).unwrap();
        assert!(encoded.contains("\"fileKey\""));
        let decoded: PageKey = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_page_key_attribute_roundtrip() {
        let key = PageKey {
            file_key: "files/2-b.txt".to_string(),
            target_id: "T2".to_string(),
            created_at: "2025-11-02T08:30:00+00:00".to_string(),
        };
        assert_eq!(PageKey::from_attributes(&key.to_attributes()), key);
    }
}
