//! Datasource plugin instance cache
//!
//! [`DatasourceService`] resolves a datasource name to a live plugin
//! instance with at-most-one-instance-per-name memoization. Instances live
//! for the process: there is no invalidation API, no refresh after first
//! load, and no eviction: reloading a plugin requires a restart.
//!
//! # Name resolution
//!
//! An omitted name and the literal alias `default` both resolve to the
//! configured default datasource name before the cache lookup, so
//! `get(None)`, `get(Some("default"))` and `get(Some(<default name>))`
//! all yield the identical cached instance.
//!
//! # Concurrency
//!
//! The cache is a concurrent map read lock-free on the hit path. First
//! loads are deduplicated per name through a keyed load-lock map: two
//! concurrent `get` calls for the same uncached name construct the plugin
//! instance exactly once, with the loser of the race observing the
//! winner's instance after a double-check under the lock.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::BootConfig;
use crate::core::{DatavError, Result};
use crate::models::{
    DataSourcePluginMeta, DataSourceSelectItem, DatasourceInstanceSettings,
};
use crate::plugins::{DataSourceApi, PluginComponents, PluginLoader};
use crate::templating::{TemplateService, VariableKind};

/// Reserved display name of the built-in pseudo-datasource backed by the
/// backend's own metric store. Its settings are constructed inline rather
/// than read from boot configuration.
pub const BUILTIN_DATASOURCE_NAME: &str = "-- Datav --";

// Sentinel sort keys pinning the reserved plugin ids to the bottom of
// metric source lists, in this relative order.
const SORT_LAST_DATAV: &str = "\u{fd}";
const SORT_LAST_DASHBOARD: &str = "\u{fe}";
const SORT_LAST_MIXED: &str = "\u{ff}";

/// A cached live datasource: the plugin instance plus the metadata and
/// components attached at load time.
pub struct DataSourceInstance {
    settings: DatasourceInstanceSettings,
    components: PluginComponents,
    api: Arc<dyn DataSourceApi>,
}

impl DataSourceInstance {
    pub fn settings(&self) -> &DatasourceInstanceSettings {
        &self.settings
    }

    pub fn meta(&self) -> &DataSourcePluginMeta {
        &self.settings.meta
    }

    pub fn components(&self) -> &PluginComponents {
        &self.components
    }

    pub fn api(&self) -> &Arc<dyn DataSourceApi> {
        &self.api
    }
}

impl std::fmt::Debug for DataSourceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceInstance")
            .field("name", &self.settings.name)
            .field("type", &self.settings.type_id)
            .finish()
    }
}

/// Options for [`DatasourceService::get_metric_sources`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricSourcesOptions {
    /// Leave datasource-typed template variables out of the list
    pub skip_variables: bool,
}

/// The process-wide datasource plugin cache.
pub struct DatasourceService {
    boot: Arc<BootConfig>,
    loader: Arc<dyn PluginLoader>,
    template: Arc<TemplateService>,
    instances: DashMap<String, Arc<DataSourceInstance>>,
    load_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DatasourceService {
    pub fn new(
        boot: Arc<BootConfig>,
        loader: Arc<dyn PluginLoader>,
        template: Arc<TemplateService>,
    ) -> Self {
        Self {
            boot,
            loader,
            template,
            instances: DashMap::new(),
            load_locks: DashMap::new(),
        }
    }

    /// Settings lookup by uid over boot configuration.
    pub fn settings_by_uid(&self, uid: &str) -> Option<DatasourceInstanceSettings> {
        self.boot.settings_by_uid(uid).cloned()
    }

    /// Resolve a datasource name to its live plugin instance.
    ///
    /// `None`, `Some("")` and `Some("default")` resolve to the configured
    /// default datasource. A cached name returns the cached instance
    /// without re-fetch or re-validation.
    ///
    /// # Errors
    ///
    /// - [`DatavError::EmptyDatasources`] when nothing is configured and no
    ///   name was given
    /// - [`DatavError::DatasourceNotFound`] when the name is not configured
    /// - [`DatavError::PluginLoadError`] when the plugin module fails to
    ///   load or instantiate
    pub async fn get(&self, name: Option<&str>) -> Result<Arc<DataSourceInstance>> {
        let resolved = match name {
            None | Some("") | Some("default") => self.boot.default_datasource_name(),
            Some(concrete) => Some(concrete.to_string()),
        };

        if let Some(name) = &resolved {
            if let Some(cached) = self.instances.get(name) {
                return Ok(Arc::clone(cached.value()));
            }
        }

        self.load_datasource(resolved).await
    }

    async fn load_datasource(&self, name: Option<String>) -> Result<Arc<DataSourceInstance>> {
        let name = match name {
            Some(name) => name,
            None => {
                // No name and no default: fall back to the first configured
                // datasource, or fail when there is none.
                let mut names: Vec<&String> = self.boot.datasources.keys().collect();
                if names.is_empty() {
                    return Err(DatavError::EmptyDatasources);
                }
                names.sort();
                names[0].clone()
            }
        };

        // Single-flight: one load per name, double-checked under the lock.
        let lock = self
            .load_locks
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(cached) = self.instances.get(&name) {
            return Ok(Arc::clone(cached.value()));
        }

        let settings = if name == BUILTIN_DATASOURCE_NAME {
            Self::builtin_settings()
        } else {
            self.boot
                .settings(&name)
                .cloned()
                .ok_or_else(|| DatavError::DatasourceNotFound { name: name.clone() })?
        };

        match self.instantiate(&settings).await {
            Ok(instance) => {
                debug!(datasource = %name, plugin = %settings.meta.id, "datasource plugin loaded");
                self.instances.insert(name, Arc::clone(&instance));
                Ok(instance)
            }
            Err(source) => {
                // The plugin's own failure is diagnostics-only; callers see
                // the generic not-found-in-plugins message.
                warn!(datasource = %name, error = %format!("{source:#}"), "datasource plugin failed to load");
                Err(DatavError::PluginLoadError { name, source: source.into() })
            }
        }
    }

    async fn instantiate(
        &self,
        settings: &DatasourceInstanceSettings,
    ) -> anyhow::Result<Arc<DataSourceInstance>> {
        let module = self.loader.load(&settings.meta).await?;
        let api = module.instantiate(settings.clone())?;
        Ok(Arc::new(DataSourceInstance {
            settings: settings.clone(),
            components: module.components().clone(),
            api,
        }))
    }

    fn builtin_settings() -> DatasourceInstanceSettings {
        DatasourceInstanceSettings {
            id: 0,
            uid: "0".to_string(),
            name: BUILTIN_DATASOURCE_NAME.to_string(),
            type_id: "datav".to_string(),
            is_default: false,
            url: String::new(),
            meta: DataSourcePluginMeta {
                id: "datav".to_string(),
                name: BUILTIN_DATASOURCE_NAME.to_string(),
                type_id: "datasource".to_string(),
                module: "built-in/datasource/datav".to_string(),
                metrics: true,
                annotations: true,
                mixed: false,
                builtin: true,
            },
        }
    }

    /// Selectable metric sources for pickers and editors.
    ///
    /// Pure read over boot configuration: every metrics-capable datasource,
    /// a synthetic `default` alias for the global default, and (unless
    /// skipped) datasource-typed template variables as `$name`
    /// pseudo-sources. The list is stable-sorted by lower-cased sort key;
    /// the reserved plugin ids `datav`, `dashboard` and `mixed` carry
    /// sentinel keys that pin them after everything else.
    pub fn get_metric_sources(&self, options: MetricSourcesOptions) -> Vec<DataSourceSelectItem> {
        let mut sources = Vec::new();
        let default_name = self.boot.default_datasource_name();

        let mut names: Vec<&String> = self.boot.datasources.keys().collect();
        names.sort();
        for key in names {
            let settings = &self.boot.datasources[key];
            if !settings.meta.metrics {
                continue;
            }

            let sort = match settings.meta.id.as_str() {
                "datav" => SORT_LAST_DATAV.to_string(),
                "dashboard" => SORT_LAST_DASHBOARD.to_string(),
                "mixed" => SORT_LAST_MIXED.to_string(),
                _ => key.clone(),
            };
            sources.push(DataSourceSelectItem {
                name: key.clone(),
                value: Some(key.clone()),
                meta: settings.meta.clone(),
                sort,
            });

            if Some(key) == default_name.as_ref() {
                sources.push(DataSourceSelectItem {
                    name: "default".to_string(),
                    value: None,
                    meta: settings.meta.clone(),
                    sort: key.clone(),
                });
            }
        }

        if !options.skip_variables {
            self.add_datasource_variables(&mut sources);
        }

        sources.sort_by(|a, b| a.sort.to_lowercase().cmp(&b.sort.to_lowercase()));
        sources
    }

    /// Append datasource-typed template variables as `$name` pseudo-sources.
    fn add_datasource_variables(&self, list: &mut Vec<DataSourceSelectItem>) {
        let default_name = self.boot.default_datasource_name();
        for variable in self.template.variables() {
            if variable.kind != VariableKind::Datasource {
                continue;
            }
            let first = match variable.values.first().map(String::as_str) {
                Some("default") => default_name.clone(),
                Some(value) => Some(value.to_string()),
                None => None,
            };
            let Some(target) = first else { continue };
            if let Some(settings) = self.boot.settings(&target) {
                let key = format!("${}", variable.name);
                list.push(DataSourceSelectItem {
                    name: key.clone(),
                    value: Some(key.clone()),
                    meta: settings.meta.clone(),
                    sort: key,
                });
            }
        }
    }
}

impl std::fmt::Debug for DatasourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasourceService").field("cached", &self.instances.len()).finish()
    }
}
