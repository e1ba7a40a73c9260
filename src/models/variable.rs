//! Template variable models
//!
//! A query variable draws its candidate values from a datasource
//! metric-find query. The model is mutated by the variable editor and by
//! resolution (option list replacement); it lives for the duration of a
//! dashboard and is torn down with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When a query variable re-resolves its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableRefresh {
    /// Only when the editor saves the variable
    #[default]
    Never,
    /// On every dashboard load
    OnDashboardLoad,
    /// On dashboard load and whenever the time range changes
    OnTimeRangeChanged,
}

/// Sort order applied to resolved variable options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableSort {
    /// Keep the datasource's order
    #[default]
    Disabled,
    AlphabeticalAsc,
    AlphabeticalDesc,
    /// Ascending by the first integer found in the text
    NumericalAsc,
    /// Descending by the first integer found in the text
    NumericalDesc,
    AlphabeticalCaseInsensitiveAsc,
    AlphabeticalCaseInsensitiveDesc,
}

/// One resolved value a variable can take.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariableOption {
    pub text: String,
    pub value: String,
    pub selected: bool,
}

/// The current selection of a variable. A single-value selection holds
/// exactly one entry in `values`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurrentSelection {
    /// Display text; multi-value selections join option texts with ` + `
    pub text: String,
    /// Selected option values
    pub values: Vec<String>,
}

/// A dashboard template variable of kind `query`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryVariableModel {
    /// Store identifier, unique per dashboard
    pub id: String,
    /// The `$name` token used in queries
    pub name: String,
    /// Optional display label
    pub label: Option<String>,
    /// Datasource name; `None` resolves to the configured default
    pub datasource: Option<String>,
    /// Datasource-specific metric-find query text
    pub query: String,
    /// Human-readable summary of the query shown in variable lists
    pub definition: String,
    /// Optional extraction regex applied to metric-find results.
    /// May itself reference other variables.
    pub regex: String,
    pub sort: VariableSort,
    pub refresh: VariableRefresh,
    /// Whether a secondary tags query augments the options
    pub use_tags: bool,
    pub tags_query: String,
    pub tag_values_query: String,
    /// Whether multiple values can be selected at once
    pub multi: bool,
    /// Resolved options, replaced wholesale on each resolution
    pub options: Vec<VariableOption>,
    pub current: CurrentSelection,
    /// Tag names from the last tags query
    pub tags: Vec<String>,
}

/// Addresses a variable in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableIdentifier {
    pub id: String,
}

impl VariableIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl From<&QueryVariableModel> for VariableIdentifier {
    fn from(variable: &QueryVariableModel) -> Self {
        Self { id: variable.id.clone() }
    }
}

/// One candidate variable value returned by a datasource metric-find query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricFindValue {
    pub text: String,
    /// Distinct underlying value, when it differs from the text
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub expandable: bool,
}

impl MetricFindValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), value: None, expandable: false }
    }
}

/// An absolute time range, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// The query-options envelope passed to a metric-find query.
///
/// `range` is populated only when the variable refreshes on time range
/// changes; variables that do not need a time range never force one.
#[derive(Debug, Clone, Default)]
pub struct MetricFindOptions {
    /// Snapshot of the variable being resolved
    pub variable: QueryVariableModel,
    /// Optional interactive search filter typed in the value picker
    pub search_filter: Option<String>,
    pub range: Option<TimeRange>,
}
