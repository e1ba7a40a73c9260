//! Shared fixtures for the integration suites: an in-memory backend, a
//! scriptable datasource plugin, and boot configuration builders.

// Each suite uses its own subset of the fixtures.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::TimeZone;

use datav_core::backend::BackendApi;
use datav_core::config::{BootConfig, SessionContext};
use datav_core::core::{DatavError, Result};
use datav_core::models::{
    DashboardSearchHit, DashboardSearchItemType, DataSourcePluginMeta, DatasourceInstanceSettings,
    FolderDto, MetricFindOptions, MetricFindValue, SearchQuery, SortOption, TagDto, TimeRange,
};
use datav_core::plugins::{
    DataSourceApi, DataSourcePluginModule, PluginComponents, RegistryPluginLoader,
};
use datav_core::variables::TimeProvider;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging once, honoring `RUST_LOG`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// In-memory [`BackendApi`] answering from a canned hit list and recording
/// every query it receives.
pub struct FakeBackend {
    pub hits: Vec<DashboardSearchHit>,
    pub queries: Mutex<Vec<SearchQuery>>,
    pub fail_dashboard_id_queries: bool,
    pub fail_all: bool,
}

impl FakeBackend {
    pub fn new(hits: Vec<DashboardSearchHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
            fail_dashboard_id_queries: false,
            fail_all: false,
        }
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<DashboardSearchHit>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_all || (self.fail_dashboard_id_queries && !query.dashboard_ids.is_empty()) {
            return Err(DatavError::BackendRequest {
                operation: "search".to_string(),
                message: "HTTP 500".to_string(),
                detail: None,
            });
        }
        Ok(self
            .hits
            .iter()
            .filter(|hit| {
                if !query.dashboard_ids.is_empty() {
                    return query.dashboard_ids.contains(&hit.id);
                }
                if query.starred && !hit.is_starred {
                    return false;
                }
                if !query.tags.is_empty() && !query.tags.iter().any(|t| hit.tags.contains(t)) {
                    return false;
                }
                if let Some(item_type) = query.item_type {
                    return hit.item_type == item_type;
                }
                true
            })
            .cloned()
            .collect())
    }

    async fn folders(&self) -> Result<Vec<FolderDto>> {
        Ok(vec![FolderDto { id: 1, uid: "f1".to_string(), title: "Infra".to_string() }])
    }

    async fn dashboard_tags(&self) -> Result<Vec<TagDto>> {
        Ok(vec![TagDto { term: "prod".to_string(), count: 2 }])
    }

    async fn sort_options(&self) -> Result<Vec<SortOption>> {
        Ok(vec![SortOption {
            name: "alpha-asc".to_string(),
            display_name: "Alphabetically (A-Z)".to_string(),
            description: String::new(),
        }])
    }
}

pub fn dash(id: i64, title: &str, folder_id: Option<i64>, starred: bool) -> DashboardSearchHit {
    DashboardSearchHit {
        id,
        uid: format!("uid-{id}"),
        title: title.to_string(),
        item_type: DashboardSearchItemType::DashDB,
        folder_id,
        folder_uid: folder_id.map(|f| format!("fuid-{f}")),
        folder_title: folder_id.map(|f| format!("Folder {f}")),
        folder_url: None,
        tags: Vec::new(),
        is_starred: starred,
        url: format!("/d/uid-{id}"),
    }
}

pub fn folder(id: i64, title: &str) -> DashboardSearchHit {
    DashboardSearchHit {
        id,
        uid: format!("fuid-{id}"),
        title: title.to_string(),
        item_type: DashboardSearchItemType::DashFolder,
        folder_id: None,
        folder_uid: None,
        folder_title: None,
        folder_url: None,
        tags: Vec::new(),
        is_starred: false,
        url: format!("/f/fuid-{id}"),
    }
}

/// A scriptable metric-find datasource: query string -> canned values.
pub struct ScriptedDataSource {
    settings: DatasourceInstanceSettings,
    responses: HashMap<String, Vec<MetricFindValue>>,
    fail_with: Option<String>,
    pub seen_options: Mutex<Vec<MetricFindOptions>>,
}

#[async_trait]
impl DataSourceApi for ScriptedDataSource {
    fn settings(&self) -> &DatasourceInstanceSettings {
        &self.settings
    }

    fn supports_metric_find(&self) -> bool {
        true
    }

    async fn metric_find_query(
        &self,
        query: &str,
        options: &MetricFindOptions,
    ) -> Result<Vec<MetricFindValue>> {
        self.seen_options.lock().unwrap().push(options.clone());
        if let Some(detail) = &self.fail_with {
            return Err(DatavError::BackendRequest {
                operation: "metric_find".to_string(),
                message: "HTTP 502".to_string(),
                detail: Some(detail.clone()),
            });
        }
        Ok(self.responses.get(query).cloned().unwrap_or_default())
    }
}

/// Registry with one scripted plugin under `plugins/scripted`. Returns the
/// loader and a handle to the constructed datasource for inspection.
pub fn scripted_loader(
    responses: &[(&str, &[&str])],
    fail_with: Option<&str>,
) -> (Arc<RegistryPluginLoader>, Arc<Mutex<Vec<Arc<ScriptedDataSource>>>>) {
    let mut map = HashMap::new();
    for (query, values) in responses {
        map.insert(
            query.to_string(),
            values.iter().map(|v| MetricFindValue::new(*v)).collect::<Vec<_>>(),
        );
    }
    let fail_with = fail_with.map(ToString::to_string);
    let constructed: Arc<Mutex<Vec<Arc<ScriptedDataSource>>>> = Arc::new(Mutex::new(Vec::new()));

    let loader = RegistryPluginLoader::new();
    let constructed_in_factory = Arc::clone(&constructed);
    loader.register(
        "plugins/scripted",
        DataSourcePluginModule::new(move |settings| {
            let ds = Arc::new(ScriptedDataSource {
                settings,
                responses: map.clone(),
                fail_with: fail_with.clone(),
                seen_options: Mutex::new(Vec::new()),
            });
            constructed_in_factory.lock().unwrap().push(Arc::clone(&ds));
            Ok(ds as Arc<dyn DataSourceApi>)
        })
        .with_components(PluginComponents {
            variable_query_editor: Some("ScriptedQueryEditor".to_string()),
        }),
    );
    (Arc::new(loader), constructed)
}

/// Registry with a plugin that has no metric-find support.
pub fn inert_loader() -> Arc<RegistryPluginLoader> {
    struct InertDataSource {
        settings: DatasourceInstanceSettings,
    }

    #[async_trait]
    impl DataSourceApi for InertDataSource {
        fn settings(&self) -> &DatasourceInstanceSettings {
            &self.settings
        }
    }

    let loader = RegistryPluginLoader::new();
    loader.register(
        "plugins/scripted",
        DataSourcePluginModule::new(|settings| {
            Ok(Arc::new(InertDataSource { settings }) as Arc<dyn DataSourceApi>)
        }),
    );
    Arc::new(loader)
}

pub fn plugin_meta(id: &str) -> DataSourcePluginMeta {
    DataSourcePluginMeta {
        id: id.to_string(),
        name: id.to_string(),
        type_id: "datasource".to_string(),
        module: "plugins/scripted".to_string(),
        metrics: true,
        annotations: false,
        mixed: false,
        builtin: false,
    }
}

/// Boot configuration with one scripted default datasource named `scripted`.
pub fn boot_config() -> Arc<BootConfig> {
    let mut datasources = HashMap::new();
    datasources.insert(
        "scripted".to_string(),
        DatasourceInstanceSettings {
            id: 1,
            uid: "uid-scripted".to_string(),
            name: "scripted".to_string(),
            type_id: "scripted".to_string(),
            is_default: true,
            url: String::new(),
            meta: plugin_meta("scripted"),
        },
    );
    Arc::new(BootConfig {
        datasources,
        default_datasource: None,
        session: SessionContext { is_signed_in: true, user: Some("editor".to_string()), org_id: 1 },
    })
}

/// Fixed time provider for deterministic `range` assertions.
pub struct FixedTimeProvider;

impl TimeProvider for FixedTimeProvider {
    fn time_range(&self) -> TimeRange {
        TimeRange {
            from: chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            to: chrono::Utc.timestamp_opt(1_700_003_600, 0).unwrap(),
        }
    }
}
