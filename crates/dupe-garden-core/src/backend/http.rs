use super::{
    BulkDeleteResponse, DeleteBulkRequest, DeleteSingleRequest, DuplicateBackend, ScanRequest,
    ScanResponse,
};
use crate::activity::{Activity, ActivitySink, NewActivity};
use crate::config::AppConfig;
use crate::error::Error;
use crate::model::{ProjectResource, ProjectResources};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// REST client for the duplicate and activity APIs.
///
/// Timeouts come from the configured `reqwest` client; there is no retry.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct ResourcesBody {
    #[serde(default)]
    databases: Vec<ProjectResource>,
    #[serde(default)]
    storages: Vec<ProjectResource>,
}

#[derive(Deserialize)]
struct CollectionsBody {
    #[serde(default)]
    collections: Vec<ProjectResource>,
}

#[derive(Deserialize)]
struct ActivitiesBody {
    #[serde(default)]
    activities: Vec<Activity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearedBody {
    #[serde(default)]
    deleted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRef<'a> {
    user_id: &'a str,
    activity_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectBody<'a> {
    user_id: &'a str,
    project_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_id: Option<&'a str>,
}

impl HttpBackend {
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("dupe-garden/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    fn url(&self, api: &str, route: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, api, route)
    }

    async fn post<B, R>(&self, api: &str, route: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(api, route);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        decode(response).await
    }

    /// Activities for `user_id`, newest first.
    pub async fn list_activities(&self, user_id: &str) -> Result<Vec<Activity>, Error> {
        let url = self.url("activities", "list");
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("userId", user_id)])
            .send()
            .await?;
        let body: ActivitiesBody = decode(response).await?;
        Ok(body.activities)
    }

    /// Delete one activity. The backend refuses entries owned by another user.
    pub async fn delete_activity(&self, user_id: &str, activity_id: &str) -> Result<(), Error> {
        let url = self.url("activities", "delete-single");
        debug!("DELETE {}", url);
        let response = self
            .client
            .delete(&url)
            .json(&ActivityRef {
                user_id,
                activity_id,
            })
            .send()
            .await?;
        let _ack: serde_json::Value = decode(response).await?;
        Ok(())
    }

    /// Delete every activity of `user_id`, returning how many the backend removed.
    pub async fn clear_activities(&self, user_id: &str) -> Result<usize, Error> {
        let url = self.url("activities", "delete");
        debug!("DELETE {}", url);
        let response = self
            .client
            .delete(&url)
            .query(&[("userId", user_id)])
            .send()
            .await?;
        let body: ClearedBody = decode(response).await?;
        Ok(body.deleted_count)
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, Error> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).trim().to_string());
        return Err(Error::Backend {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl DuplicateBackend for HttpBackend {
    #[instrument(skip(self, request), fields(project = %request.project_id, service = %request.service))]
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, Error> {
        self.post("duplicates", "scan", request).await
    }

    async fn delete_single(&self, request: &DeleteSingleRequest) -> Result<(), Error> {
        let _ack: serde_json::Value = self.post("duplicates", "delete_single", request).await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(project = %request.project_id, count = request.duplicate_ids.len()))]
    async fn delete_bulk(&self, request: &DeleteBulkRequest) -> Result<BulkDeleteResponse, Error> {
        self.post("duplicates", "delete_bulk", request).await
    }

    async fn list_resources(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<ProjectResources, Error> {
        let body = ProjectBody {
            user_id,
            project_id,
            database_id: None,
        };
        let resources: ResourcesBody = self.post("duplicates", "list", &body).await?;
        Ok(ProjectResources {
            databases: resources.databases,
            storages: resources.storages,
        })
    }

    async fn list_collections(
        &self,
        user_id: &str,
        project_id: &str,
        database_id: &str,
    ) -> Result<Vec<ProjectResource>, Error> {
        let body = ProjectBody {
            user_id,
            project_id,
            database_id: Some(database_id),
        };
        let collections: CollectionsBody = self.post("duplicates", "collections", &body).await?;
        Ok(collections.collections)
    }
}

#[async_trait]
impl ActivitySink for HttpBackend {
    async fn record(&self, activity: &NewActivity) -> Result<(), Error> {
        let _ack: serde_json::Value = self.post("activities", "add", activity).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(&AppConfig {
            backend_url: url.to_string(),
            user_id: "u1".to_string(),
            request_timeout_secs: 5,
            journal_path: None,
        })
        .unwrap()
    }

    #[test]
    fn test_route_urls() {
        let backend = backend("https://dupes.example.com/");
        assert_eq!(
            backend.url("duplicates", "delete_bulk"),
            "https://dupes.example.com/api/duplicates/delete_bulk"
        );
        assert_eq!(
            backend.url("activities", "add"),
            "https://dupes.example.com/api/activities/add"
        );
    }

    #[test]
    fn test_collections_body_omits_missing_database() {
        let body = ProjectBody {
            user_id: "u1",
            project_id: "p1",
            database_id: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"userId": "u1", "projectId": "p1"})
        );
    }
}
