pub mod http;

use crate::error::Error;
use crate::model::{DuplicateRecord, ProjectResource, ProjectResources, Service};
use crate::scope::ScanScope;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

pub use http::HttpBackend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub user_id: String,
    pub project_id: String,
    pub service: Service,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

impl ScanRequest {
    pub fn new(user_id: &str, scope: &ScanScope) -> Self {
        Self {
            user_id: user_id.to_string(),
            project_id: scope.project_id.clone(),
            service: scope.service,
            database_id: scope.database_id.clone(),
            collection_id: scope.collection_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScanResponse {
    pub status: String,
    #[serde(default, deserialize_with = "deserialize_records")]
    pub data: Vec<DuplicateRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScanResponse {
    pub fn success(data: Vec<DuplicateRecord>) -> Self {
        Self {
            status: "success".to_string(),
            data,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// Records are decoded one by one so a single bad entry only drops itself.
fn deserialize_records<'de, D>(deserializer: D) -> Result<Vec<DuplicateRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();
    let records: Vec<DuplicateRecord> = raw
        .into_iter()
        .filter_map(|value| {
            let id = value
                .get("$id")
                .and_then(|v| v.as_str())
                .unwrap_or("<no id>")
                .to_string();
            match serde_json::from_value::<DuplicateRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed duplicate record {}: {}", id, e);
                    None
                }
            }
        })
        .collect();
    if records.len() < total {
        warn!("Kept {} of {} duplicate records from scan", records.len(), total);
    }
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSingleRequest {
    pub user_id: String,
    pub project_id: String,
    pub duplicate_id: String,
    /// Also delete the underlying document or file, not just the tracking record.
    pub delete_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBulkRequest {
    pub user_id: String,
    pub project_id: String,
    pub duplicate_ids: Vec<String>,
    pub delete_data: bool,
}

/// Counts only; the backend does not say which ids failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    #[serde(default)]
    pub success_count: usize,
    #[serde(default)]
    pub fail_count: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// The duplicate-detection service this client drives.
#[async_trait]
pub trait DuplicateBackend: Send + Sync {
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, Error>;

    async fn delete_single(&self, request: &DeleteSingleRequest) -> Result<(), Error>;

    async fn delete_bulk(&self, request: &DeleteBulkRequest) -> Result<BulkDeleteResponse, Error>;

    async fn list_resources(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<ProjectResources, Error>;

    async fn list_collections(
        &self,
        user_id: &str,
        project_id: &str,
        database_id: &str,
    ) -> Result<Vec<ProjectResource>, Error>;
}
