//! Dashboard search models
//!
//! [`DashboardSearchHit`] is the backend's search result row, read-only
//! from this crate's perspective. [`Section`] is the aggregation bucket the
//! search UI renders; sections are built fresh per search call and never
//! persisted.

use serde::{Deserialize, Serialize};

/// Kind of a search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashboardSearchItemType {
    #[serde(rename = "dash-db")]
    DashDB,
    #[serde(rename = "dash-folder")]
    DashFolder,
}

/// One row of a backend dashboard search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSearchHit {
    pub id: i64,
    #[serde(default)]
    pub uid: String,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: DashboardSearchItemType,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub folder_uid: Option<String>,
    #[serde(default)]
    pub folder_title: Option<String>,
    #[serde(default)]
    pub folder_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub url: String,
}

/// Identity of a search section.
///
/// Folder id `0`, a null folder id, and a missing folder id all meant the
/// General folder in the backend wire format; this tagged key removes that
/// ambiguity in exactly one place ([`SectionKey::for_hit`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKey {
    /// Synthetic recently-opened section, score -1
    Recent,
    /// Synthetic starred section, score -2
    Starred,
    /// The General folder (backend folder id 0)
    General,
    /// A concrete folder
    Folder(i64),
}

impl SectionKey {
    /// The section a non-folder hit belongs to.
    pub fn for_hit(folder_id: Option<i64>) -> Self {
        match folder_id {
            Some(id) if id != 0 => Self::Folder(id),
            _ => Self::General,
        }
    }
}

/// An ordered bucket of search results shown in the dashboard search UI.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub key: SectionKey,
    pub uid: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub icon: String,
    /// Sections render in ascending score order; synthetic sections carry
    /// negative scores so they always sort before folders
    pub score: i64,
    pub expanded: bool,
    pub items: Vec<DashboardSearchHit>,
    pub item_type: DashboardSearchItemType,
}

impl Section {
    /// The unlabeled wrapper section used by list-layout searches.
    pub fn unlabeled(items: Vec<DashboardSearchHit>) -> Self {
        Self {
            key: SectionKey::General,
            uid: None,
            title: String::new(),
            url: None,
            icon: String::new(),
            score: 0,
            expanded: false,
            items,
            item_type: DashboardSearchItemType::DashFolder,
        }
    }

    /// The General section, synthesized when a hit has no folder.
    pub fn general(score: i64) -> Self {
        Self {
            key: SectionKey::General,
            uid: None,
            title: "General".to_string(),
            url: None,
            icon: "folder-open".to_string(),
            score,
            expanded: false,
            items: Vec::new(),
            item_type: DashboardSearchItemType::DashFolder,
        }
    }
}

/// Layout requested by the search UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchLayout {
    /// Hierarchical folder sections
    #[default]
    Folders,
    /// Flat list, bypassing recent/starred aggregation
    List,
}

/// Backend-facing search parameters for `/api/search`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchQuery {
    pub query: String,
    pub tags: Vec<String>,
    pub starred: bool,
    pub limit: Option<u32>,
    pub dashboard_ids: Vec<i64>,
    pub folder_ids: Vec<i64>,
    pub item_type: Option<DashboardSearchItemType>,
}

/// UI-facing search request handled by [`crate::search::SearchService`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchRequest {
    pub query: String,
    pub tags: Vec<String>,
    pub starred: bool,
    pub folder_ids: Vec<i64>,
    pub layout: SearchLayout,
    /// Skip the recent-dashboards side query
    pub skip_recent: bool,
    /// Skip the starred-dashboards side query
    pub skip_starred: bool,
}

impl SearchRequest {
    /// Whether any explicit filter is present: tag, query text, starred
    /// flag, or a non-empty folder-id list.
    pub fn has_filters(&self) -> bool {
        !self.query.is_empty() || !self.tags.is_empty() || self.starred || !self.folder_ids.is_empty()
    }
}

/// Folder DTO from `GET /api/folder/all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDto {
    pub id: i64,
    #[serde(default)]
    pub uid: String,
    pub title: String,
}

/// Tag DTO from `GET /api/dashboard/tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDto {
    pub term: String,
    #[serde(default)]
    pub count: u64,
}

/// Sort option DTO from `GET /api/search/sorting`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOption {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}
