//! Dashboard link models

/// A dashboard-to-dashboard link spec driven by tag search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardLink {
    pub title: String,
    /// Dashboards carrying any of these tags are link candidates
    pub tags: Vec<String>,
    pub as_dropdown: bool,
    pub target_blank: bool,
    pub tooltip: String,
    /// Carry the current time range into the linked dashboard
    pub keep_time: bool,
    /// Carry current template variable values into the linked dashboard
    pub include_vars: bool,
}

/// A resolved, sanitized link ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub id: i64,
    pub title: String,
    pub url: String,
}
