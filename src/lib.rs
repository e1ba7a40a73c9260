//! Datav core dashboard services
//!
//! The service layer behind the Datav dashboard frontend: everything the
//! UI needs to resolve datasources, template variables, search results,
//! and dashboard links, with no rendering concerns.
//!
//! # Architecture Overview
//!
//! Control flows from UI triggers (variable editor save, search box input,
//! dashboard render) into three services that share the datasource cache
//! and the template substitution index:
//!
//! - [`datasource::DatasourceService`] resolves datasource names to loaded
//!   plugin instances, memoized at-most-once per name for the process
//!   lifetime.
//! - [`variables::VariableQueryResolver`] refreshes query-variable options
//!   through datasource metric-find queries, applying templated regex
//!   extraction, sort orders, and selection reconciliation.
//! - [`search::SearchService`] aggregates recent/starred/main search
//!   results into the ordered section tree of the search UI.
//! - [`links::DashboardLinkResolver`] resolves tag-driven dashboard links
//!   into sanitized URL/title pairs.
//!
//! # Core Modules
//!
//! - [`core`] - error taxonomy shared by every service
//! - [`models`] - data model DTOs and enums
//! - [`config`] - read-only boot configuration and session context
//! - [`backend`] - REST backend client trait and HTTP implementation
//! - [`plugins`] - datasource plugin contract and registry loader
//! - [`datasource`] - datasource plugin instance cache
//! - [`templating`] - `$var` substitution service
//! - [`variables`] - query variable state, resolution, and option reduction
//! - [`search`] - search aggregation and impression tracking
//! - [`links`] - dashboard link resolution
//! - [`utils`] - sanitizers and small helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use datav_core::config::BootConfig;
//! use datav_core::datasource::DatasourceService;
//! use datav_core::plugins::RegistryPluginLoader;
//! use datav_core::templating::TemplateService;
//!
//! # async fn example() -> datav_core::core::Result<()> {
//! let boot = Arc::new(BootConfig::from_json(r#"{"datasources": {}}"#)?);
//! let loader = Arc::new(RegistryPluginLoader::new());
//! let template = Arc::new(TemplateService::new());
//! let datasources = DatasourceService::new(boot, loader, template);
//!
//! // Resolves the configured default datasource (or fails with
//! // EmptyDatasources here, since nothing is configured).
//! let instance = datasources.get(None).await;
//! assert!(instance.is_err());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod core;
pub mod datasource;
pub mod links;
pub mod models;
pub mod plugins;
pub mod search;
pub mod templating;
pub mod utils;
pub mod variables;

pub use crate::core::{DatavError, Result};
pub use crate::datasource::{DataSourceInstance, DatasourceService, BUILTIN_DATASOURCE_NAME};
pub use crate::search::{ImpressionTracker, SearchService};
pub use crate::templating::TemplateService;
pub use crate::variables::{VariableQueryResolver, VariableStore};
