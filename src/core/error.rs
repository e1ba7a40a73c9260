//! Error handling for the Datav core services
//!
//! The error system is a closed taxonomy: every failure mode of the
//! datasource cache, the variable resolver, and the search aggregator is an
//! enumerated [`DatavError`] variant. Callers match on the kind, never on
//! message shape.
//!
//! # Propagation policy
//!
//! - Datasource and plugin errors ([`DatavError::EmptyDatasources`],
//!   [`DatavError::DatasourceNotFound`], [`DatavError::PluginLoadError`])
//!   propagate to the immediate caller, which decides UI treatment.
//! - Variable-resolution errors are contained inside
//!   [`crate::variables::VariableQueryResolver`]: they land in the editor
//!   error slot of the affected variable and never block other variables.
//! - The recent-dashboards search sub-query swallows its failure to an
//!   empty result; the main search query propagates.
//!
//! Plugin construction can fail with any error a plugin author produces
//! (the loader boundary speaks [`anyhow::Error`]), so
//! [`DatavError::PluginLoadError`] carries the original as a boxed source.
//! The source is logged for diagnostics; the display message deliberately
//! does not include it.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, DatavError>;

/// The error type for all Datav core service operations.
#[derive(Error, Debug)]
pub enum DatavError {
    /// No datasources are configured and no name was given to resolve.
    #[error("There are no datasources in the boot configuration")]
    EmptyDatasources,

    /// A datasource name was requested that boot configuration does not know.
    #[error("Datasource named {name} was not found in boot configuration")]
    DatasourceNotFound {
        /// The datasource name that failed the lookup
        name: String,
    },

    /// The plugin module for a datasource failed to load or instantiate.
    ///
    /// The original failure is attached as the source for logging; the
    /// display message intentionally leaks no plugin-internal detail.
    #[error("Datasource named {name} was not found in plugins")]
    PluginLoadError {
        /// The datasource whose plugin failed to load
        name: String,
        /// The underlying import or construction failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A variable's query text references the variable itself.
    #[error("Query cannot contain a reference to itself. Variable: ${name}")]
    VariableSelfReference {
        /// Name of the self-referencing variable
        name: String,
    },

    /// No variable with the given identifier exists in the store.
    #[error("Variable with id {id} not found")]
    VariableNotFound {
        /// The identifier that failed the lookup
        id: String,
    },

    /// A templated regex did not compile.
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex {
        /// The pattern that failed to compile
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// A backend HTTP request failed or returned a non-success status.
    #[error("Backend request failed: {operation}: {message}")]
    BackendRequest {
        /// The backend operation that failed (e.g. "search", "folders")
        operation: String,
        /// Transport-level description of the failure
        message: String,
        /// The backend's own error message from the response body, if any.
        /// Takes precedence over `message` for editor display.
        detail: Option<String>,
    },

    /// Boot configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O error, e.g. while reading a boot configuration file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DatavError {
    /// The message to surface in a variable editor error slot.
    ///
    /// When a backend error carries its own message in the response body,
    /// that message supersedes the generic one.
    pub fn editor_message(&self) -> String {
        match self {
            Self::BackendRequest { detail: Some(detail), .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
