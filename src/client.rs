// --------------------------------------------------
// Remote persistence seam used by the client task store.
//
// `TaskApi` is the contract; `HttpTaskApi` speaks it to the
// `/api/tasks` endpoints with bearer authentication.
// --------------------------------------------------

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorBody, StoreError};
use crate::models::{
    ItemEnvelope, ListEnvelope, SuccessEnvelope, Task, TaskDraft, TaskPatch, TaskStatus,
};

/// Filters for a task listing. Serialized form doubles as the cache key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TaskQuery {
    fn to_pairs(&self, page: u32, limit: u32) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(tag) = &self.tag {
            pairs.push(("tag", tag.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

pub type TaskPage = ListEnvelope<Task>;

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(
        &self,
        query: &TaskQuery,
        page: u32,
        limit: u32,
        token: &str,
    ) -> Result<TaskPage, StoreError>;

    async fn create_task(&self, draft: &TaskDraft, token: &str) -> Result<Task, StoreError>;

    async fn update_task(&self, id: &str, patch: &TaskPatch, token: &str)
    -> Result<Task, StoreError>;

    async fn delete_task(&self, id: &str, token: &str) -> Result<(), StoreError>;
}

/// `TaskApi` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    base_url: String,
    http: Client,
}

impl HttpTaskApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    tracing::warn!(error = %err, "task api request failed");
    StoreError::Remote(err.to_string())
}

// Non-2xx -> message from `{error}`, else a generic one.
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|b| b.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        return Err(StoreError::Remote(message));
    }
    resp.json::<T>().await.map_err(transport)
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(
        &self,
        query: &TaskQuery,
        page: u32,
        limit: u32,
        token: &str,
    ) -> Result<TaskPage, StoreError> {
        let resp = self
            .http
            .get(self.url("/tasks"))
            .bearer_auth(token)
            .query(&query.to_pairs(page, limit))
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }

    async fn create_task(&self, draft: &TaskDraft, token: &str) -> Result<Task, StoreError> {
        let resp = self
            .http
            .post(self.url("/tasks"))
            .bearer_auth(token)
            .json(draft)
            .send()
            .await
            .map_err(transport)?;
        let body: ItemEnvelope<Task> = read_json(resp).await?;
        Ok(body.item)
    }

    async fn update_task(
        &self,
        id: &str,
        patch: &TaskPatch,
        token: &str,
    ) -> Result<Task, StoreError> {
        let resp = self
            .http
            .patch(self.url(&format!("/tasks/{id}")))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await
            .map_err(transport)?;
        let body: ItemEnvelope<Task> = read_json(resp).await?;
        Ok(body.item)
    }

    async fn delete_task(&self, id: &str, token: &str) -> Result<(), StoreError> {
        let resp = self
            .http
            .delete(self.url(&format!("/tasks/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let body: SuccessEnvelope = read_json(resp).await?;
        if !body.success {
            return Err(StoreError::Remote("Delete failed".to_string()));
        }
        Ok(())
    }
}
