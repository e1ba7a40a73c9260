//! Datasource settings and plugin metadata
//!
//! [`DatasourceInstanceSettings`] is the boot-configuration record for one
//! configured datasource. It is immutable once loaded; the live plugin
//! object built from it is cached by [`crate::datasource::DatasourceService`].

use serde::{Deserialize, Serialize};

/// Static metadata describing a datasource plugin.
///
/// `module` names the plugin module to load; the capability flags gate
/// which dashboard features the datasource participates in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourcePluginMeta {
    /// Plugin id, e.g. `prometheus`. The ids `datav`, `dashboard` and
    /// `mixed` are reserved and sort to the bottom of metric source lists.
    pub id: String,
    /// Human-readable plugin name
    pub name: String,
    /// Plugin kind, always `datasource` for entries handled here
    #[serde(rename = "type")]
    pub type_id: String,
    /// Module path resolved by the plugin loader
    pub module: String,
    /// Whether the datasource can serve metric queries
    #[serde(default)]
    pub metrics: bool,
    /// Whether the datasource can serve annotation queries
    #[serde(default)]
    pub annotations: bool,
    /// Whether this is the synthetic mixed datasource
    #[serde(default)]
    pub mixed: bool,
    /// Whether the plugin ships with the application
    #[serde(default)]
    pub builtin: bool,
}

/// One configured datasource, as established by boot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceInstanceSettings {
    /// Numeric id assigned by the backend
    pub id: i64,
    /// Stable unique id
    pub uid: String,
    /// Display name; also the cache key after alias resolution
    pub name: String,
    /// Datasource type id, matching `meta.id`
    #[serde(rename = "type")]
    pub type_id: String,
    /// Whether this datasource is the global default
    #[serde(default)]
    pub is_default: bool,
    /// Backend URL of the datasource, if proxied
    #[serde(default)]
    pub url: String,
    /// Plugin metadata
    pub meta: DataSourcePluginMeta,
}

/// A selectable metric source entry produced by
/// [`crate::datasource::DatasourceService::get_metric_sources`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceSelectItem {
    /// Display name; `$name` for datasource-variable pseudo-sources
    pub name: String,
    /// Selection value. `None` marks the synthetic `default` alias.
    pub value: Option<String>,
    /// Plugin metadata of the underlying datasource
    pub meta: DataSourcePluginMeta,
    /// Sort key; reserved plugin ids carry sentinel high-codepoint keys
    pub sort: String,
}

impl DataSourceSelectItem {
    /// The blank leading entry variable editors show before a datasource
    /// has been picked.
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            value: Some(String::new()),
            meta: DataSourcePluginMeta {
                id: String::new(),
                name: String::new(),
                type_id: String::new(),
                module: String::new(),
                metrics: false,
                annotations: false,
                mixed: false,
                builtin: false,
            },
            sort: String::new(),
        }
    }
}
