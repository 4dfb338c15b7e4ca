use crate::models::{LogAction, UsageLogEntry};
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Append-only usage log table access.
#[async_trait]
pub trait UsageLogStore: Send + Sync {
    async fn append(&self, entry: &UsageLogEntry) -> Result<()>;
    async fn query_by_action(&self, action: LogAction) -> Result<Vec<UsageLogEntry>>;

    /// DELETE events against files a given user uploaded.
    async fn query_uploader_deletes(&self, uploader_email: &str) -> Result<Vec<UsageLogEntry>>;

    /// DOWNLOAD events performed by a given user.
    async fn query_user_downloads(&self, user_email: &str) -> Result<Vec<UsageLogEntry>>;

    async fn delete(&self, log_id: &str) -> Result<()>;
}

/// Front door for usage logging. Queries pass straight through; `record`
/// is the fire-and-forget append used by the download/delete handlers:
/// validation and write failures are traced and swallowed, the enclosing
/// request still succeeds.
#[derive(Clone)]
pub struct UsageLogService {
    store: Arc<dyn UsageLogStore>,
}

impl UsageLogService {
    pub fn new(store: Arc<dyn UsageLogStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, mut entry: UsageLogEntry) {
        if entry.file_key.is_empty() || entry.user_email.is_empty() {
            error!(
                "Dropping usage log entry with missing fields: action={} fileKey={:?}",
                entry.action, entry.file_key
            );
            return;
        }

        entry.log_id = Uuid::new_v4().to_string();

        info!(
            target: "usage",
            action = %entry.action,
            file_key = %entry.file_key,
            user_email = %entry.user_email,
            user_role = %entry.user_role,
            ip_address = %entry.ip_address,
            "Usage event"
        );

        if let Err(e) = self.store.append(&entry).await {
            error!("Failed to persist usage log entry: {}", e);
        }
    }

    pub async fn query_by_action(&self, action: LogAction) -> Result<Vec<UsageLogEntry>> {
        self.store.query_by_action(action).await
    }

    pub async fn query_uploader_deletes(
        &self,
        uploader_email: &str,
    ) -> Result<Vec<UsageLogEntry>> {
        self.store.query_uploader_deletes(uploader_email).await
    }

    pub async fn query_user_downloads(&self, user_email: &str) -> Result<Vec<UsageLogEntry>> {
        self.store.query_user_downloads(user_email).await
    }

    pub async fn delete(&self, log_id: &str) -> Result<()> {
        self.store.delete(log_id).await
    }
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

fn to_item(entry: &UsageLogEntry) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("logId".to_string(), AttributeValue::S(entry.log_id.clone()));
    item.insert(
        "action".to_string(),
        AttributeValue::S(entry.action.to_string()),
    );
    item.insert(
        "fileKey".to_string(),
        AttributeValue::S(entry.file_key.clone()),
    );
    item.insert(
        "originalFileName".to_string(),
        AttributeValue::S(entry.original_file_name.clone()),
    );
    item.insert(
        "uploaderEmail".to_string(),
        AttributeValue::S(entry.uploader_email.clone()),
    );
    item.insert(
        "userEmail".to_string(),
        AttributeValue::S(entry.user_email.clone()),
    );
    item.insert(
        "userRole".to_string(),
        AttributeValue::S(entry.user_role.clone()),
    );
    item.insert(
        "createdAt".to_string(),
        AttributeValue::S(entry.created_at.to_rfc3339()),
    );
    item.insert(
        "fileSize".to_string(),
        AttributeValue::N(entry.file_size.to_string()),
    );
    item.insert(
        "targetId".to_string(),
        AttributeValue::S(entry.target_id.clone()),
    );
    item.insert(
        "targetType".to_string(),
        AttributeValue::S(entry.target_type.clone()),
    );
    item.insert(
        "ipAddress".to_string(),
        AttributeValue::S(entry.ip_address.clone()),
    );
    item.insert(
        "userAgent".to_string(),
        AttributeValue::S(entry.user_agent.clone()),
    );
    item
}

fn from_item(item: &HashMap<String, AttributeValue>) -> UsageLogEntry {
    UsageLogEntry {
        log_id: attr_s(item, "logId"),
        action: attr_s(item, "action")
            .parse()
            .unwrap_or(LogAction::Download),
        file_key: attr_s(item, "fileKey"),
        original_file_name: attr_s(item, "originalFileName"),
        uploader_email: attr_s(item, "uploaderEmail"),
        user_email: attr_s(item, "userEmail"),
        user_role: attr_s(item, "userRole"),
        created_at: DateTime::parse_from_rfc3339(&attr_s(item, "createdAt"))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::UNIX_EPOCH),
        file_size: attr_n(item, "fileSize"),
        target_id: attr_s(item, "targetId"),
        target_type: attr_s(item, "targetType"),
        ip_address: attr_s(item, "ipAddress"),
        user_agent: attr_s(item, "userAgent"),
    }
}

pub struct DynamoUsageLogStore {
    client: Client,
    table_name: String,
    action_index: String,
    uploader_index: String,
    user_index: String,
}

impl DynamoUsageLogStore {
    pub fn new(
        client: Client,
        table_name: String,
        action_index: String,
        uploader_index: String,
        user_index: String,
    ) -> Self {
        Self {
            client,
            table_name,
            action_index,
            uploader_index,
            user_index,
        }
    }
}

#[async_trait]
impl UsageLogStore for DynamoUsageLogStore {
    async fn append(&self, entry: &UsageLogEntry) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(entry)))
            .send()
            .await?;
        Ok(())
    }

    async fn query_by_action(&self, action: LogAction) -> Result<Vec<UsageLogEntry>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.action_index)
            .key_condition_expression("#action = :action")
            .expression_attribute_names("#action", "action")
            .expression_attribute_values(":action", AttributeValue::S(action.to_string()))
            .send()
            .await?;

        Ok(result.items().iter().map(from_item).collect())
    }

    async fn query_uploader_deletes(&self, uploader_email: &str) -> Result<Vec<UsageLogEntry>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.uploader_index)
            .key_condition_expression("uploaderEmail = :uploaderEmail")
            .filter_expression("#action = :action")
            .expression_attribute_names("#action", "action")
            .expression_attribute_values(
                ":uploaderEmail",
                AttributeValue::S(uploader_email.to_string()),
            )
            .expression_attribute_values(
                ":action",
                AttributeValue::S(LogAction::Delete.to_string()),
            )
            .send()
            .await?;

        Ok(result.items().iter().map(from_item).collect())
    }

    async fn query_user_downloads(&self, user_email: &str) -> Result<Vec<UsageLogEntry>> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.user_index)
            .key_condition_expression("userEmail = :userEmail")
            .filter_expression("#action = :action")
            .expression_attribute_names("#action", "action")
            .expression_attribute_values(":userEmail", AttributeValue::S(user_email.to_string()))
            .expression_attribute_values(
                ":action",
                AttributeValue::S(LogAction::Download.to_string()),
            )
            .send()
            .await?;

        Ok(result.items().iter().map(from_item).collect())
    }

    async fn delete(&self, log_id: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("logId", AttributeValue::S(log_id.to_string()))
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_item_roundtrip() {
        let entry = UsageLogEntry {
            log_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            action: LogAction::Delete,
            file_key: "files/1700000000000-notes.txt".to_string(),
            original_file_name: "notes.txt".to_string(),
            uploader_email: "alice@example.com".to_string(),
            user_email: "bob@example.com".to_string(),
            user_role: "admin".to_string(),
            created_at: Utc::now(),
            file_size: 128,
            target_id: "T1".to_string(),
            target_type: "STUDY".to_string(),
            ip_address: "10.0.0.1".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
        };

        let restored = from_item(&to_item(&entry));
        assert_eq!(restored.log_id, entry.log_id);
        assert_eq!(restored.action, LogAction::Delete);
        assert_eq!(restored.uploader_email, "alice@example.com");
        assert_eq!(restored.file_size, 128);
    }
}
