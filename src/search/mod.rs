//! Dashboard search aggregation
//!
//! [`SearchService`] merges recent, starred, and main-query search results
//! into the ordered section tree the search UI renders. The three queries
//! run concurrently; the fold into the section map is positional (recent,
//! starred, then the main merge), so the result is deterministic regardless
//! of which branch settles first.
//!
//! Section ordering is by ascending score: starred -2, recent -1, then
//! folders and General in discovery order.

pub mod impression;

pub use impression::ImpressionTracker;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::backend::BackendApi;
use crate::config::SessionContext;
use crate::core::Result;
use crate::models::{
    DashboardSearchHit, DashboardSearchItemType, FolderDto, SearchLayout, SearchQuery,
    SearchRequest, Section, SectionKey, SortOption, TagDto,
};

/// Storage key prefix for section expansion preferences.
pub const SECTION_STORAGE_KEY: &str = "search.sections";

/// Both side queries cap at the 30 most relevant dashboards.
const RECENT_LIMIT: usize = 30;
const STARRED_LIMIT: u32 = 30;

/// Remembered expansion state of the synthetic sections.
#[derive(Debug, Default)]
pub struct SectionPrefs {
    values: RwLock<HashMap<String, bool>>,
}

impl SectionPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values.read().expect("section prefs poisoned").get(key).copied().unwrap_or(default)
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.values.write().expect("section prefs poisoned").insert(key.to_string(), value);
    }
}

/// Aggregates backend search results into sections.
pub struct SearchService {
    backend: Arc<dyn BackendApi>,
    impressions: Arc<ImpressionTracker>,
    session: SessionContext,
    prefs: Arc<SectionPrefs>,
}

impl SearchService {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        impressions: Arc<ImpressionTracker>,
        session: SessionContext,
    ) -> Self {
        Self { backend, impressions, session, prefs: Arc::new(SectionPrefs::new()) }
    }

    #[must_use]
    pub fn with_prefs(mut self, prefs: Arc<SectionPrefs>) -> Self {
        self.prefs = prefs;
        self
    }

    /// Run a dashboard search and aggregate the results into sections.
    ///
    /// List layout short-circuits to a single backend query restricted to
    /// dashboards, wrapped in one unlabeled section; recent/starred logic
    /// is bypassed entirely. Otherwise the main query is merged with the
    /// recent and starred side queries, which are skipped when any
    /// explicit filter is active (and starred additionally when the
    /// session is unauthenticated).
    ///
    /// # Errors
    ///
    /// Main-query and starred-query failures propagate; a recent-query
    /// failure degrades to "no recent dashboards".
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Section>> {
        if request.layout == SearchLayout::List {
            let mut query = to_backend_query(request);
            query.item_type = Some(DashboardSearchItemType::DashDB);
            let hits = self.backend.search(&query).await?;
            return Ok(if hits.is_empty() { Vec::new() } else { vec![Section::unlabeled(hits)] });
        }

        let filters = request.has_filters();
        let mut query = to_backend_query(request);
        if !filters {
            // Unfiltered browsing starts in the General folder; the side
            // queries still run unconstrained.
            query.folder_ids = vec![0];
        }

        let run_recent = !request.skip_recent && !filters;
        let run_starred = !request.skip_starred && !filters && self.session.is_signed_in;
        debug!(filters, run_recent, run_starred, "dashboard search");

        let (recent, starred, main) = tokio::join!(
            async {
                if run_recent {
                    self.query_recent_dashboards().await
                } else {
                    Vec::new()
                }
            },
            async {
                if run_starred {
                    Some(
                        self.backend
                            .search(&SearchQuery {
                                starred: true,
                                limit: Some(STARRED_LIMIT),
                                ..Default::default()
                            })
                            .await,
                    )
                } else {
                    None
                }
            },
            self.backend.search(&query),
        );

        let main_hits = main?;
        let starred_hits = match starred {
            Some(result) => result?,
            None => Vec::new(),
        };

        // Positional fold: synthetic sections first, then the main merge.
        let mut sections: HashMap<SectionKey, Section> = HashMap::new();
        if !recent.is_empty() {
            sections.insert(
                SectionKey::Recent,
                Section {
                    key: SectionKey::Recent,
                    uid: None,
                    title: "Recent".to_string(),
                    url: None,
                    icon: "clock-nine".to_string(),
                    score: -1,
                    expanded: self.prefs.get_bool(&format!("{SECTION_STORAGE_KEY}.recent"), true),
                    items: recent,
                    item_type: DashboardSearchItemType::DashFolder,
                },
            );
        }
        if !starred_hits.is_empty() {
            sections.insert(
                SectionKey::Starred,
                Section {
                    key: SectionKey::Starred,
                    uid: None,
                    title: "Starred".to_string(),
                    url: None,
                    icon: "star".to_string(),
                    score: -2,
                    expanded: self.prefs.get_bool(&format!("{SECTION_STORAGE_KEY}.starred"), true),
                    items: starred_hits,
                    item_type: DashboardSearchItemType::DashFolder,
                },
            );
        }
        handle_search_result(&mut sections, main_hits);

        let mut result: Vec<Section> = sections.into_values().collect();
        result.sort_by_key(|section| section.score);
        Ok(result)
    }

    /// The most recently opened dashboards, in impression order, excluding
    /// starred ones (they already show in the starred section). Failures
    /// and an empty impression list both yield an empty result.
    async fn query_recent_dashboards(&self) -> Vec<DashboardSearchHit> {
        let ids: Vec<i64> =
            self.impressions.dashboard_opened().into_iter().take(RECENT_LIMIT).collect();
        if ids.is_empty() {
            return Vec::new();
        }

        let query = SearchQuery { dashboard_ids: ids.clone(), ..Default::default() };
        match self.backend.search(&query).await {
            Ok(hits) => ids
                .iter()
                .filter_map(|id| hits.iter().find(|hit| hit.id == *id))
                .filter(|hit| !hit.is_starred)
                .cloned()
                .collect(),
            Err(err) => {
                debug!(error = %err, "recent dashboards query failed");
                Vec::new()
            }
        }
    }

    /// Tag terms in use, for the search filter dropdown.
    pub async fn get_dashboard_tags(&self) -> Result<Vec<TagDto>> {
        self.backend.dashboard_tags().await
    }

    /// Sort orders the backend offers.
    pub async fn get_sort_options(&self) -> Result<Vec<SortOption>> {
        self.backend.sort_options().await
    }

    /// All folders visible to the current user.
    pub async fn get_folders(&self) -> Result<Vec<FolderDto>> {
        self.backend.folders().await
    }
}

fn to_backend_query(request: &SearchRequest) -> SearchQuery {
    SearchQuery {
        query: request.query.clone(),
        tags: request.tags.clone(),
        starred: request.starred,
        limit: None,
        dashboard_ids: Vec::new(),
        folder_ids: request.folder_ids.clone(),
        item_type: None,
    }
}

/// Two-pass merge of main-query hits into the section map.
///
/// Pass 1 creates a section per folder hit, scored in discovery order.
/// Pass 2 places every non-folder hit into its folder's section (General
/// when it has none), synthesizing sections for folders that appear only
/// through their contents, and marks the receiving section expanded.
fn handle_search_result(
    sections: &mut HashMap<SectionKey, Section>,
    results: Vec<DashboardSearchHit>,
) {
    if results.is_empty() {
        return;
    }

    for hit in &results {
        if hit.item_type == DashboardSearchItemType::DashFolder {
            let score = sections.len() as i64;
            sections.insert(
                SectionKey::Folder(hit.id),
                Section {
                    key: SectionKey::Folder(hit.id),
                    uid: Some(hit.uid.clone()),
                    title: hit.title.clone(),
                    url: Some(hit.url.clone()),
                    icon: "folder".to_string(),
                    score,
                    expanded: false,
                    items: Vec::new(),
                    item_type: DashboardSearchItemType::DashFolder,
                },
            );
        }
    }

    for hit in results {
        if hit.item_type == DashboardSearchItemType::DashFolder {
            continue;
        }

        let key = SectionKey::for_hit(hit.folder_id);
        if !sections.contains_key(&key) {
            let score = sections.len() as i64;
            let section = match key {
                SectionKey::Folder(_) => Section {
                    key,
                    uid: hit.folder_uid.clone(),
                    title: hit.folder_title.clone().unwrap_or_default(),
                    url: hit.folder_url.clone(),
                    icon: "folder-open".to_string(),
                    score,
                    expanded: false,
                    items: Vec::new(),
                    item_type: DashboardSearchItemType::DashFolder,
                },
                _ => Section::general(score),
            };
            sections.insert(key, section);
        }

        let section = sections.get_mut(&key).expect("section synthesized above");
        section.expanded = true;
        section.items.push(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatavError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records queries and answers them from a canned hit list.
    struct FakeBackend {
        hits: Vec<DashboardSearchHit>,
        queries: Mutex<Vec<SearchQuery>>,
        fail_dashboard_id_queries: bool,
    }

    impl FakeBackend {
        fn new(hits: Vec<DashboardSearchHit>) -> Self {
            Self { hits, queries: Mutex::new(Vec::new()), fail_dashboard_id_queries: false }
        }

        fn queries(&self) -> Vec<SearchQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendApi for FakeBackend {
        async fn search(&self, query: &SearchQuery) -> Result<Vec<DashboardSearchHit>> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail_dashboard_id_queries && !query.dashboard_ids.is_empty() {
                return Err(DatavError::BackendRequest {
                    operation: "search".to_string(),
                    message: "HTTP 500".to_string(),
                    detail: None,
                });
            }
            let hits = self
                .hits
                .iter()
                .filter(|hit| {
                    if !query.dashboard_ids.is_empty() {
                        return query.dashboard_ids.contains(&hit.id);
                    }
                    if query.starred && !hit.is_starred {
                        return false;
                    }
                    if let Some(item_type) = query.item_type {
                        return hit.item_type == item_type;
                    }
                    true
                })
                .cloned()
                .collect();
            Ok(hits)
        }

        async fn folders(&self) -> Result<Vec<FolderDto>> {
            Ok(Vec::new())
        }

        async fn dashboard_tags(&self) -> Result<Vec<TagDto>> {
            Ok(Vec::new())
        }

        async fn sort_options(&self) -> Result<Vec<SortOption>> {
            Ok(Vec::new())
        }
    }

    fn dash(id: i64, title: &str, folder_id: Option<i64>, starred: bool) -> DashboardSearchHit {
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
            url: format!("/d/uid-{id}/{title}"),
        }
    }

    fn folder(id: i64, title: &str) -> DashboardSearchHit {
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
            url: format!("/f/fuid-{id}/{title}"),
        }
    }

    fn signed_in() -> SessionContext {
        SessionContext { is_signed_in: true, user: Some("editor".to_string()), org_id: 1 }
    }

    fn service(backend: Arc<FakeBackend>) -> SearchService {
        service_with(backend, Arc::new(ImpressionTracker::new()), signed_in())
    }

    fn service_with(
        backend: Arc<FakeBackend>,
        impressions: Arc<ImpressionTracker>,
        session: SessionContext,
    ) -> SearchService {
        SearchService::new(backend, impressions, session)
    }

    #[tokio::test]
    async fn test_merge_folders_and_general() {
        let mut sections = HashMap::new();
        handle_search_result(
            &mut sections,
            vec![folder(1, "F"), dash(10, "in-folder", Some(1), false), dash(11, "rootless", None, false)],
        );

        assert_eq!(sections.len(), 2);
        let f = &sections[&SectionKey::Folder(1)];
        assert_eq!(f.items.len(), 1);
        assert_eq!(f.items[0].id, 10);
        assert!(f.expanded);

        let general = &sections[&SectionKey::General];
        assert_eq!(general.title, "General");
        assert_eq!(general.items[0].id, 11);
    }

    #[tokio::test]
    async fn test_merge_synthesizes_missing_folder_section() {
        let mut sections = HashMap::new();
        handle_search_result(&mut sections, vec![dash(10, "orphan", Some(7), false)]);

        let synthesized = &sections[&SectionKey::Folder(7)];
        assert_eq!(synthesized.title, "Folder 7");
        assert_eq!(synthesized.icon, "folder-open");
        assert!(synthesized.expanded);
    }

    #[tokio::test]
    async fn test_folder_id_zero_means_general() {
        let mut sections = HashMap::new();
        handle_search_result(&mut sections, vec![dash(10, "a", Some(0), false)]);
        assert!(sections.contains_key(&SectionKey::General));
    }

    #[tokio::test]
    async fn test_search_orders_sections_by_score() {
        let backend = Arc::new(FakeBackend::new(vec![
            folder(1, "F"),
            dash(10, "in-folder", Some(1), false),
            dash(11, "rootless", None, false),
            dash(20, "starred", None, true),
        ]));
        let impressions = Arc::new(ImpressionTracker::new());
        impressions.add_dashboard_impression(11);
        let service = service_with(Arc::clone(&backend), impressions, signed_in());

        let sections = service.search(&SearchRequest::default()).await.unwrap();
        let keys: Vec<SectionKey> = sections.iter().map(|s| s.key).collect();
        assert_eq!(keys[0], SectionKey::Starred);
        assert_eq!(keys[1], SectionKey::Recent);
        // Folder and General sections follow with non-negative scores
        assert!(sections[2..].iter().all(|s| s.score >= 0));
    }

    #[tokio::test]
    async fn test_unfiltered_search_forces_general_folder_filter() {
        let backend = Arc::new(FakeBackend::new(Vec::new()));
        let service = service(Arc::clone(&backend));
        service.search(&SearchRequest { skip_recent: true, skip_starred: true, ..Default::default() })
            .await
            .unwrap();

        let queries = backend.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].folder_ids, vec![0]);
    }

    #[tokio::test]
    async fn test_filtered_search_skips_side_queries() {
        let backend = Arc::new(FakeBackend::new(Vec::new()));
        let impressions = Arc::new(ImpressionTracker::new());
        impressions.add_dashboard_impression(1);
        let service = service_with(Arc::clone(&backend), impressions, signed_in());

        service
            .search(&SearchRequest { query: "cpu".to_string(), ..Default::default() })
            .await
            .unwrap();

        let queries = backend.queries();
        assert_eq!(queries.len(), 1);
        // Filtered: folder filter passes through untouched
        assert!(queries[0].folder_ids.is_empty());
        assert_eq!(queries[0].query, "cpu");
    }

    #[tokio::test]
    async fn test_recent_preserves_impression_order() {
        let backend = Arc::new(FakeBackend::new(vec![
            dash(10, "ten", None, false),
            dash(20, "twenty", None, false),
            dash(30, "thirty", None, false),
        ]));
        let impressions = Arc::new(ImpressionTracker::new());
        // Impression order: 30 most recent, then 10, then 20
        impressions.add_dashboard_impression(20);
        impressions.add_dashboard_impression(10);
        impressions.add_dashboard_impression(30);
        let service = service_with(Arc::clone(&backend), impressions, signed_in());

        let sections = service
            .search(&SearchRequest { skip_starred: true, ..Default::default() })
            .await
            .unwrap();
        let recent = sections.iter().find(|s| s.key == SectionKey::Recent).unwrap();
        let ids: Vec<i64> = recent.items.iter().map(|hit| hit.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_recent_excludes_starred_hits() {
        let backend = Arc::new(FakeBackend::new(vec![
            dash(10, "plain", None, false),
            dash(20, "starred", None, true),
        ]));
        let impressions = Arc::new(ImpressionTracker::new());
        impressions.add_dashboard_impression(10);
        impressions.add_dashboard_impression(20);
        let service = service_with(Arc::clone(&backend), impressions, signed_in());

        let sections = service
            .search(&SearchRequest { skip_starred: true, ..Default::default() })
            .await
            .unwrap();
        let recent = sections.iter().find(|s| s.key == SectionKey::Recent).unwrap();
        assert_eq!(recent.items.len(), 1);
        assert_eq!(recent.items[0].id, 10);
    }

    #[tokio::test]
    async fn test_recent_failure_degrades_to_empty() {
        let mut backend = FakeBackend::new(vec![dash(10, "ten", None, false)]);
        backend.fail_dashboard_id_queries = true;
        let backend = Arc::new(backend);
        let impressions = Arc::new(ImpressionTracker::new());
        impressions.add_dashboard_impression(10);
        let service = service_with(Arc::clone(&backend), impressions, signed_in());

        let sections = service
            .search(&SearchRequest { skip_starred: true, ..Default::default() })
            .await
            .unwrap();
        assert!(sections.iter().all(|s| s.key != SectionKey::Recent));
    }

    #[tokio::test]
    async fn test_empty_impressions_issue_no_recent_query() {
        let backend = Arc::new(FakeBackend::new(Vec::new()));
        let service = service(Arc::clone(&backend));
        service
            .search(&SearchRequest { skip_starred: true, ..Default::default() })
            .await
            .unwrap();

        // Only the main query reached the backend
        assert_eq!(backend.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_starred_skipped_when_signed_out() {
        let backend = Arc::new(FakeBackend::new(vec![dash(20, "starred", None, true)]));
        let service = service_with(
            Arc::clone(&backend),
            Arc::new(ImpressionTracker::new()),
            SessionContext::default(),
        );

        let sections = service.search(&SearchRequest::default()).await.unwrap();
        assert!(sections.iter().all(|s| s.key != SectionKey::Starred));
        assert!(backend.queries().iter().all(|q| !q.starred));
    }

    #[tokio::test]
    async fn test_list_layout_bypasses_side_queries() {
        let backend = Arc::new(FakeBackend::new(vec![
            folder(1, "F"),
            dash(10, "a", None, true),
            dash(11, "b", None, false),
        ]));
        let impressions = Arc::new(ImpressionTracker::new());
        impressions.add_dashboard_impression(10);
        let service = service_with(Arc::clone(&backend), impressions, signed_in());

        let sections = service
            .search(&SearchRequest { layout: SearchLayout::List, ..Default::default() })
            .await
            .unwrap();

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "");
        // Folder hits are excluded by the dash-db type restriction
        assert!(sections[0].items.iter().all(|hit| hit.item_type == DashboardSearchItemType::DashDB));

        let queries = backend.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].item_type, Some(DashboardSearchItemType::DashDB));
    }

    #[tokio::test]
    async fn test_list_layout_empty_result_is_empty() {
        let backend = Arc::new(FakeBackend::new(Vec::new()));
        let service = service(backend);
        let sections = service
            .search(&SearchRequest { layout: SearchLayout::List, ..Default::default() })
            .await
            .unwrap();
        assert!(sections.is_empty());
    }

    #[tokio::test]
    async fn test_section_prefs_control_expansion() {
        let backend = Arc::new(FakeBackend::new(vec![dash(10, "ten", None, false)]));
        let impressions = Arc::new(ImpressionTracker::new());
        impressions.add_dashboard_impression(10);
        let prefs = Arc::new(SectionPrefs::new());
        prefs.set_bool("search.sections.recent", false);
        let service = service_with(Arc::clone(&backend), impressions, signed_in()).with_prefs(prefs);

        let sections = service
            .search(&SearchRequest { skip_starred: true, ..Default::default() })
            .await
            .unwrap();
        let recent = sections.iter().find(|s| s.key == SectionKey::Recent).unwrap();
        assert!(!recent.expanded);
    }
}
