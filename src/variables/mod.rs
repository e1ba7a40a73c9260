//! Query variable state and resolution
//!
//! [`VariableStore`] owns the dashboard's query variables and the variable
//! editor's transient state (which variable is open, and its error slots).
//! [`VariableQueryResolver`] drives resolution: it fetches candidate values
//! from the variable's datasource, reduces them into options
//! ([`options::update_variable_options`]), and pushes the refreshed
//! selection into the template index so dependent variables and queries see
//! it.
//!
//! # Error containment
//!
//! Resolution failures never propagate out of
//! [`VariableQueryResolver::update_query_variable_options`]: the message is
//! attached to the editor's `update` error slot, and only when that
//! variable's editor is currently open, so one broken variable cannot
//! block dashboard rendering or other variables' resolution.
//!
//! # Staleness
//!
//! There is no request-generation token: a slow resolution applies its
//! results whenever it lands, even if a newer resolution finished earlier.
//! At-least-once-applied, possibly stale.

pub mod options;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::core::{DatavError, Result};
use crate::datasource::{DatasourceService, MetricSourcesOptions};
use crate::models::{
    DataSourceSelectItem, MetricFindOptions, QueryVariableModel, TimeRange, VariableIdentifier,
    VariableRefresh,
};
use crate::plugins::DEFAULT_VARIABLE_QUERY_EDITOR;
use crate::templating::{TemplateFormat, TemplateService, VariableKind, VariableSnapshot};

/// Error slots of the variable editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorErrorSlot {
    /// Errors attached to the query input (e.g. self-reference)
    Query,
    /// Errors from option resolution
    Update,
}

#[derive(Debug, Default)]
struct EditorState {
    open_id: Option<String>,
    errors: HashMap<EditorErrorSlot, String>,
    datasources: Vec<DataSourceSelectItem>,
    variable_query_editor: Option<String>,
}

/// Owns query variable models and editor state for one dashboard.
#[derive(Debug, Default)]
pub struct VariableStore {
    variables: RwLock<HashMap<String, QueryVariableModel>>,
    editor: RwLock<EditorState>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable, keyed by id.
    pub fn add_variable(&self, variable: QueryVariableModel) {
        let mut variables = self.variables.write().expect("variable store poisoned");
        variables.insert(variable.id.clone(), variable);
    }

    /// Remove a variable, e.g. on dashboard teardown.
    pub fn remove_variable(&self, id: &str) {
        let mut variables = self.variables.write().expect("variable store poisoned");
        variables.remove(id);
    }

    /// Snapshot of a variable by id.
    pub fn variable(&self, id: &str) -> Option<QueryVariableModel> {
        self.variables.read().expect("variable store poisoned").get(id).cloned()
    }

    /// Mark a variable's editor as open. Clears previous editor errors.
    pub fn open_editor(&self, id: &str) {
        let mut editor = self.editor.write().expect("editor state poisoned");
        editor.open_id = Some(id.to_string());
        editor.errors.clear();
    }

    pub fn close_editor(&self) {
        let mut editor = self.editor.write().expect("editor state poisoned");
        editor.open_id = None;
        editor.errors.clear();
        editor.variable_query_editor = None;
    }

    /// Whether the editor for `id` is currently open.
    pub fn is_editing(&self, id: &str) -> bool {
        self.editor.read().expect("editor state poisoned").open_id.as_deref() == Some(id)
    }

    pub fn editor_error(&self, slot: EditorErrorSlot) -> Option<String> {
        self.editor.read().expect("editor state poisoned").errors.get(&slot).cloned()
    }

    fn set_editor_error(&self, slot: EditorErrorSlot, message: String) {
        let mut editor = self.editor.write().expect("editor state poisoned");
        editor.errors.insert(slot, message);
    }

    fn clear_editor_error(&self, slot: EditorErrorSlot) {
        let mut editor = self.editor.write().expect("editor state poisoned");
        editor.errors.remove(&slot);
    }

    /// Datasource entries offered by the open editor.
    pub fn editor_datasources(&self) -> Vec<DataSourceSelectItem> {
        self.editor.read().expect("editor state poisoned").datasources.clone()
    }

    fn set_editor_datasources(&self, datasources: Vec<DataSourceSelectItem>) {
        let mut editor = self.editor.write().expect("editor state poisoned");
        editor.datasources = datasources;
    }

    /// Component id of the query editor the open variable should render.
    pub fn editor_query_editor(&self) -> Option<String> {
        self.editor.read().expect("editor state poisoned").variable_query_editor.clone()
    }

    fn set_editor_query_editor(&self, component: String) {
        let mut editor = self.editor.write().expect("editor state poisoned");
        editor.variable_query_editor = Some(component);
    }

    fn set_query(&self, id: &str, query: &str, definition: &str) {
        let mut variables = self.variables.write().expect("variable store poisoned");
        if let Some(variable) = variables.get_mut(id) {
            variable.query = query.to_string();
            variable.definition = definition.to_string();
        }
    }

    fn set_datasource(&self, id: &str, datasource: Option<String>) {
        let mut variables = self.variables.write().expect("variable store poisoned");
        if let Some(variable) = variables.get_mut(id) {
            variable.datasource = datasource;
        }
    }

    fn apply_options(&self, id: &str, update: options::OptionsUpdate) {
        let mut variables = self.variables.write().expect("variable store poisoned");
        if let Some(variable) = variables.get_mut(id) {
            variable.options = update.options;
            variable.current = update.current;
        }
    }

    fn set_tags(&self, id: &str, tags: Vec<String>) {
        let mut variables = self.variables.write().expect("variable store poisoned");
        if let Some(variable) = variables.get_mut(id) {
            variable.tags = tags;
        }
    }
}

/// Supplies the current dashboard time range for variables that refresh on
/// time range changes.
pub trait TimeProvider: Send + Sync {
    fn time_range(&self) -> TimeRange;
}

/// [`TimeProvider`] over the system clock with a fixed look-back window.
#[derive(Debug, Clone)]
pub struct SystemTimeProvider {
    window: chrono::Duration,
}

impl SystemTimeProvider {
    pub fn new(window: chrono::Duration) -> Self {
        Self { window }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self { window: chrono::Duration::hours(6) }
    }
}

impl TimeProvider for SystemTimeProvider {
    fn time_range(&self) -> TimeRange {
        let to = chrono::Utc::now();
        TimeRange { from: to - self.window, to }
    }
}

/// Resolves query variables against their datasources.
pub struct VariableQueryResolver {
    datasources: Arc<DatasourceService>,
    template: Arc<TemplateService>,
    store: Arc<VariableStore>,
    time: Arc<dyn TimeProvider>,
}

impl VariableQueryResolver {
    pub fn new(
        datasources: Arc<DatasourceService>,
        template: Arc<TemplateService>,
        store: Arc<VariableStore>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self { datasources, template, store, time }
    }

    /// Refresh a query variable's options from its datasource.
    ///
    /// Resolution failures are contained: the message lands in the editor's
    /// `update` error slot when that variable's editor is open, and nowhere
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Only [`DatavError::VariableNotFound`] when the identifier is
    /// unknown; downstream failures never reach the caller.
    pub async fn update_query_variable_options(
        &self,
        identifier: &VariableIdentifier,
        search_filter: Option<&str>,
    ) -> Result<()> {
        let variable = self
            .store
            .variable(&identifier.id)
            .ok_or_else(|| DatavError::VariableNotFound { id: identifier.id.clone() })?;

        if self.store.is_editing(&identifier.id) {
            self.store.clear_editor_error(EditorErrorSlot::Update);
        }

        if let Err(err) = self.resolve(&variable, search_filter).await {
            let message = err.editor_message();
            debug!(variable = %variable.name, error = %message, "variable resolution failed");
            if self.store.is_editing(&identifier.id) {
                self.store.set_editor_error(EditorErrorSlot::Update, message);
            }
        }
        Ok(())
    }

    async fn resolve(
        &self,
        variable: &QueryVariableModel,
        search_filter: Option<&str>,
    ) -> Result<()> {
        let instance = self.datasources.get(variable.datasource.as_deref()).await?;

        // Not every datasource supports variable queries; that is fine.
        if !instance.api().supports_metric_find() {
            return Ok(());
        }

        let query_options = MetricFindOptions {
            variable: variable.clone(),
            search_filter: search_filter.map(ToString::to_string),
            range: (variable.refresh == VariableRefresh::OnTimeRangeChanged)
                .then(|| self.time.time_range()),
        };

        let results = instance.api().metric_find_query(&variable.query, &query_options).await?;
        let templated_regex = self.templated_regex(variable);
        let update = options::update_variable_options(variable, &results, &templated_regex)?;
        self.store.apply_options(&variable.id, update);
        self.sync_template(&variable.id);

        if variable.use_tags {
            let tag_results =
                instance.api().metric_find_query(&variable.tags_query, &query_options).await?;
            self.store
                .set_tags(&variable.id, tag_results.into_iter().map(|v| v.text).collect());
        }

        Ok(())
    }

    /// The variable's regex with template tokens substituted, or an empty
    /// string when the variable has none (meaning: no filtering).
    fn templated_regex(&self, variable: &QueryVariableModel) -> String {
        if variable.regex.is_empty() {
            return String::new();
        }
        self.template.replace(&variable.regex, TemplateFormat::Regex)
    }

    fn sync_template(&self, id: &str) {
        if let Some(variable) = self.store.variable(id) {
            self.template.set_variable(VariableSnapshot {
                name: variable.name,
                kind: VariableKind::Query,
                current_text: variable.current.text,
                values: variable.current.values,
            });
        }
    }

    /// Commit a new query string for a variable and re-resolve its options.
    ///
    /// A query that references the variable itself (`$name` followed by
    /// `/`, a space, or end of string) is rejected before anything is
    /// committed; the error lands in the editor's `query` slot.
    pub async fn change_query_variable_query(
        &self,
        identifier: &VariableIdentifier,
        query: &str,
        definition: &str,
    ) -> Result<()> {
        let variable = self
            .store
            .variable(&identifier.id)
            .ok_or_else(|| DatavError::VariableNotFound { id: identifier.id.clone() })?;

        if references_self(&variable.name, query) {
            let err = DatavError::VariableSelfReference { name: variable.name.clone() };
            self.store.set_editor_error(EditorErrorSlot::Query, err.to_string());
            return Err(err);
        }

        self.store.clear_editor_error(EditorErrorSlot::Query);
        self.store.set_query(&identifier.id, query, definition);
        self.update_query_variable_options(identifier, None).await
    }

    /// Seed the editor for a variable: the selectable datasource list (a
    /// blank leading entry, then every non-mixed concrete metric source)
    /// and, when the variable already names a datasource, the plugin's
    /// query editor component.
    pub async fn init_query_variable_editor(&self, identifier: &VariableIdentifier) -> Result<()> {
        let sources: Vec<DataSourceSelectItem> = self
            .datasources
            .get_metric_sources(MetricSourcesOptions::default())
            .into_iter()
            .filter(|ds| !ds.meta.mixed && ds.value.is_some())
            .collect();

        let mut all = Vec::with_capacity(sources.len() + 1);
        all.push(DataSourceSelectItem::blank());
        all.extend(sources);
        self.store.set_editor_datasources(all);

        let variable = self
            .store
            .variable(&identifier.id)
            .ok_or_else(|| DatavError::VariableNotFound { id: identifier.id.clone() })?;
        if let Some(name) = variable.datasource.clone() {
            self.change_query_variable_datasource(identifier, Some(&name)).await;
        }
        Ok(())
    }

    /// Record the datasource a variable's editor selected, resolving which
    /// query editor component the plugin exposes. Failures are logged and
    /// never surfaced.
    pub async fn change_query_variable_datasource(
        &self,
        identifier: &VariableIdentifier,
        name: Option<&str>,
    ) {
        self.store.set_datasource(&identifier.id, name.map(ToString::to_string));
        match self.datasources.get(name).await {
            Ok(instance) => {
                let component = instance
                    .components()
                    .variable_query_editor
                    .clone()
                    .unwrap_or_else(|| DEFAULT_VARIABLE_QUERY_EDITOR.to_string());
                self.store.set_editor_query_editor(component);
            }
            Err(err) => {
                warn!(variable = %identifier.id, error = %err, "editor datasource change failed");
            }
        }
    }
}

/// Token-boundary check for a variable referencing itself: `$name` followed
/// by `/`, a space, or end of string. `$namespace` does not match `$name`.
fn references_self(name: &str, query: &str) -> bool {
    let pattern = format!(r"\${}(/| |$)", regex::escape(name));
    Regex::new(&pattern).map(|re| re.is_match(query)).unwrap_or(false)
}
