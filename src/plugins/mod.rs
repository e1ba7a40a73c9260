//! Datasource plugin contract and loader
//!
//! A datasource plugin is a module that can construct a live
//! [`DataSourceApi`] instance from [`DatasourceInstanceSettings`] and
//! describes the editor components it ships. How plugin modules reach the
//! process (bundling, dynamic import) is out of scope; this module pins the
//! contract a loader must satisfy and provides [`RegistryPluginLoader`],
//! which resolves `meta.module` paths against an explicit registry.
//!
//! Plugin factories may fail with arbitrary errors, so the loader boundary
//! speaks [`anyhow::Error`]; the datasource cache converts failures into
//! the closed taxonomy ([`crate::core::DatavError::PluginLoadError`]) and
//! logs the original.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::Result;
use crate::models::{
    DataSourcePluginMeta, DatasourceInstanceSettings, MetricFindOptions, MetricFindValue,
};

/// The editor component id used when a plugin ships no variable query editor.
pub const DEFAULT_VARIABLE_QUERY_EDITOR: &str = "DefaultVariableQueryEditor";

/// A live datasource client object, constructed by its plugin.
///
/// Not every datasource supports variable queries; the default
/// implementation reports no metric-find capability, and the resolver
/// treats that as a no-op rather than an error.
#[async_trait]
pub trait DataSourceApi: Send + Sync {
    /// The settings this instance was constructed from.
    fn settings(&self) -> &DatasourceInstanceSettings;

    /// Whether [`Self::metric_find_query`] is implemented.
    fn supports_metric_find(&self) -> bool {
        false
    }

    /// Candidate variable values for a metric-find query string.
    async fn metric_find_query(
        &self,
        query: &str,
        options: &MetricFindOptions,
    ) -> Result<Vec<MetricFindValue>> {
        let _ = (query, options);
        Ok(Vec::new())
    }
}

/// UI component descriptors a plugin module exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginComponents {
    /// Component id of the plugin's variable query editor, if it ships one
    pub variable_query_editor: Option<String>,
}

/// Factory signature constructing a datasource instance from settings.
pub type DataSourceFactory =
    dyn Fn(DatasourceInstanceSettings) -> anyhow::Result<Arc<dyn DataSourceApi>> + Send + Sync;

/// A loaded datasource plugin module: a constructor plus its components.
pub struct DataSourcePluginModule {
    components: PluginComponents,
    factory: Box<DataSourceFactory>,
}

impl DataSourcePluginModule {
    pub fn new(
        factory: impl Fn(DatasourceInstanceSettings) -> anyhow::Result<Arc<dyn DataSourceApi>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self { components: PluginComponents::default(), factory: Box::new(factory) }
    }

    #[must_use]
    pub fn with_components(mut self, components: PluginComponents) -> Self {
        self.components = components;
        self
    }

    pub fn components(&self) -> &PluginComponents {
        &self.components
    }

    /// Construct a datasource instance from the given settings.
    pub fn instantiate(
        &self,
        settings: DatasourceInstanceSettings,
    ) -> anyhow::Result<Arc<dyn DataSourceApi>> {
        (self.factory)(settings)
    }
}

impl std::fmt::Debug for DataSourcePluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourcePluginModule").field("components", &self.components).finish()
    }
}

/// Resolves plugin metadata to a loaded plugin module.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Load the plugin module named by `meta.module`.
    async fn load(&self, meta: &DataSourcePluginMeta) -> anyhow::Result<Arc<DataSourcePluginModule>>;
}

/// A [`PluginLoader`] backed by an explicit module registry.
///
/// The application registers every bundled plugin at startup under its
/// module path; lookups never touch the network.
#[derive(Debug, Default)]
pub struct RegistryPluginLoader {
    modules: DashMap<String, Arc<DataSourcePluginModule>>,
}

impl RegistryPluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin module under its module path. Re-registering a
    /// path replaces the previous module.
    pub fn register(&self, module_path: impl Into<String>, module: DataSourcePluginModule) {
        self.modules.insert(module_path.into(), Arc::new(module));
    }
}

#[async_trait]
impl PluginLoader for RegistryPluginLoader {
    async fn load(&self, meta: &DataSourcePluginMeta) -> anyhow::Result<Arc<DataSourcePluginModule>> {
        self.modules
            .get(&meta.module)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| anyhow!("plugin module '{}' is not registered", meta.module))
    }
}
