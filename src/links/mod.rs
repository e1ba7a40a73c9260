//! Dashboard-to-dashboard link resolution
//!
//! A dashboard link spec carries a tag filter; dashboards matching those
//! tags become links. Search and resolution are separate steps:
//! [`DashboardLinkResolver::search_for_tags`] fetches the candidate hits,
//! [`DashboardLinkResolver::resolve_links`] turns them into sanitized
//! URL/title pairs. Resolution is a pure function of its inputs and the
//! injected template/time collaborators.

use std::sync::Arc;

use crate::backend::BackendApi;
use crate::core::Result;
use crate::models::{DashboardLink, DashboardSearchHit, ResolvedLink, SearchQuery};
use crate::templating::{TemplateFormat, TemplateService};
use crate::utils::{sanitize, sanitize_url};
use crate::variables::TimeProvider;

/// Tag searches cap at 100 candidate dashboards.
const TAG_SEARCH_LIMIT: u32 = 100;

/// Resolves tag-driven dashboard links.
pub struct DashboardLinkResolver {
    template: Arc<TemplateService>,
    time: Option<Arc<dyn TimeProvider>>,
}

impl DashboardLinkResolver {
    pub fn new(template: Arc<TemplateService>) -> Self {
        Self { template, time: None }
    }

    /// Attach a time provider so `keep_time` links can carry the current
    /// time range.
    #[must_use]
    pub fn with_time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = Some(time);
        self
    }

    /// Fetch the dashboards matching the link's tags.
    pub async fn search_for_tags(
        &self,
        backend: &dyn BackendApi,
        link: &DashboardLink,
    ) -> Result<Vec<DashboardSearchHit>> {
        backend
            .search(&SearchQuery {
                tags: link.tags.clone(),
                limit: Some(TAG_SEARCH_LIMIT),
                ..Default::default()
            })
            .await
    }

    /// Resolve search hits into sanitized links, excluding the current
    /// dashboard (a dashboard never links to itself).
    pub fn resolve_links(
        &self,
        dashboard_id: i64,
        link: &DashboardLink,
        search_hits: &[DashboardSearchHit],
    ) -> Vec<ResolvedLink> {
        search_hits
            .iter()
            .filter(|hit| hit.id != dashboard_id)
            .map(|hit| ResolvedLink {
                id: hit.id,
                title: sanitize(&hit.title),
                url: sanitize_url(&self.link_url(link, &hit.url)),
            })
            .collect()
    }

    /// Substitute template variables into the target URL and append the
    /// carried state the link asks for.
    fn link_url(&self, link: &DashboardLink, url: &str) -> String {
        let mut resolved = self.template.replace(url, TemplateFormat::Raw);
        let mut params: Vec<(String, String)> = Vec::new();

        if link.include_vars {
            for variable in self.template.variables() {
                for value in &variable.values {
                    params.push((format!("var-{}", variable.name), value.clone()));
                }
            }
        }
        if link.keep_time {
            if let Some(time) = &self.time {
                let range = time.time_range();
                params.push(("from".to_string(), range.from.timestamp_millis().to_string()));
                params.push(("to".to_string(), range.to.timestamp_millis().to_string()));
            }
        }

        if !params.is_empty() {
            let query: Vec<String> =
                params.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
            let separator = if resolved.contains('?') { '&' } else { '?' };
            resolved.push(separator);
            resolved.push_str(&query.join("&"));
        }
        resolved
    }
}
