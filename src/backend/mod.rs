//! Backend REST API client
//!
//! All network access of the core services goes through the [`BackendApi`]
//! trait: dashboard search, folder listing, and tag/sort metadata. The
//! production implementation is [`HttpBackend`] over `reqwest`; tests
//! substitute in-memory fakes.
//!
//! # Endpoints
//!
//! - `GET /api/search` - dashboard search, returns [`DashboardSearchHit`]s
//! - `GET /api/folder/all` - folder DTOs
//! - `GET /api/dashboard/tags` - tag terms with usage counts
//! - `GET /api/search/sorting` - available sort orders

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::{DatavError, Result};
use crate::models::{
    DashboardSearchHit, DashboardSearchItemType, FolderDto, SearchQuery, SortOption, TagDto,
};

/// The backend operations the core services depend on.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Dashboard search with the given query parameters.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<DashboardSearchHit>>;

    /// All folders visible to the current user.
    async fn folders(&self) -> Result<Vec<FolderDto>>;

    /// Tag terms in use across dashboards.
    async fn dashboard_tags(&self) -> Result<Vec<TagDto>>;

    /// Sort orders the search UI can offer.
    async fn sort_options(&self) -> Result<Vec<SortOption>>;
}

/// HTTP implementation of [`BackendApi`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client against the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        operation: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, operation, "backend request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|err| DatavError::BackendRequest {
                operation: operation.to_string(),
                message: err.to_string(),
                detail: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            // The backend reports errors as { "message": "..." }; carry that
            // through so editors can show it instead of the status line.
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(String::from));
            return Err(DatavError::BackendRequest {
                operation: operation.to_string(),
                message: format!("HTTP {status}"),
                detail,
            });
        }

        response.json::<T>().await.map_err(|err| DatavError::BackendRequest {
            operation: operation.to_string(),
            message: format!("invalid response body: {err}"),
            detail: None,
        })
    }
}

fn search_params(query: &SearchQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if !query.query.is_empty() {
        params.push(("query".to_string(), query.query.clone()));
    }
    for tag in &query.tags {
        params.push(("tag".to_string(), tag.clone()));
    }
    if query.starred {
        params.push(("starred".to_string(), "true".to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    for id in &query.dashboard_ids {
        params.push(("dashboardIds".to_string(), id.to_string()));
    }
    for id in &query.folder_ids {
        params.push(("folderIds".to_string(), id.to_string()));
    }
    if let Some(item_type) = query.item_type {
        let value = match item_type {
            DashboardSearchItemType::DashDB => "dash-db",
            DashboardSearchItemType::DashFolder => "dash-folder",
        };
        params.push(("type".to_string(), value.to_string()));
    }
    params
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<DashboardSearchHit>> {
        self.get_json("/api/search", &search_params(query), "search").await
    }

    async fn folders(&self) -> Result<Vec<FolderDto>> {
        self.get_json("/api/folder/all", &[], "folders").await
    }

    async fn dashboard_tags(&self) -> Result<Vec<TagDto>> {
        self.get_json("/api/dashboard/tags", &[], "dashboard_tags").await
    }

    async fn sort_options(&self) -> Result<Vec<SortOption>> {
        self.get_json("/api/search/sorting", &[], "sort_options").await
    }
}
