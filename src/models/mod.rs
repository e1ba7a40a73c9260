//! Shared data models for the Datav core services
//!
//! Wire-crossing types (search hits, folder/tag/sort DTOs, datasource
//! settings) are serde-derived against the backend's camelCase JSON.
//! Dashboard-local state (variables, sections, link specs) is plain data;
//! dashboard persistence is out of scope for this crate.

mod datasource;
mod link;
mod search;
mod variable;

pub use datasource::{DataSourcePluginMeta, DataSourceSelectItem, DatasourceInstanceSettings};
pub use link::{DashboardLink, ResolvedLink};
pub use search::{
    DashboardSearchHit, DashboardSearchItemType, FolderDto, SearchLayout, SearchQuery,
    SearchRequest, Section, SectionKey, SortOption, TagDto,
};
pub use variable::{
    CurrentSelection, MetricFindOptions, MetricFindValue, QueryVariableModel, TimeRange,
    VariableIdentifier, VariableOption, VariableRefresh, VariableSort,
};
