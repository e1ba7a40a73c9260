//! Boot configuration
//!
//! The boot configuration is established once at application startup and is
//! read-only afterwards: a map of datasource name to
//! [`DatasourceInstanceSettings`], the name of the default datasource, and
//! the session context of the signed-in user. Services hold it behind an
//! [`std::sync::Arc`] and never mutate it.
//!
//! The configuration is delivered by the backend as JSON; [`BootConfig`]
//! deserializes that payload directly. For tooling and tests it can also be
//! read from a file, with `DATAV_BOOT_CONFIG` overriding the path.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{DatavError, Result};
use crate::models::DatasourceInstanceSettings;

/// Session context of the current user, as known at boot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    #[serde(default)]
    pub is_signed_in: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub org_id: i64,
}

/// Process-wide, read-only boot configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootConfig {
    /// Configured datasources, keyed by display name
    #[serde(default)]
    pub datasources: HashMap<String, DatasourceInstanceSettings>,
    /// Explicit default datasource name, when the backend sends one
    #[serde(default)]
    pub default_datasource: Option<String>,
    #[serde(default)]
    pub session: SessionContext,
}

impl BootConfig {
    /// Parse a boot configuration from its JSON payload.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a boot configuration from a JSON file.
    ///
    /// The `DATAV_BOOT_CONFIG` environment variable overrides `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DatavError::Io`] if the file cannot be read,
    /// [`DatavError::Json`] if it is not valid JSON, or
    /// [`DatavError::Config`] if it fails validation.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let path = std::env::var("DATAV_BOOT_CONFIG")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| path.to_path_buf());
        let contents = std::fs::read_to_string(&path)?;
        Self::from_json(&contents)
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.default_datasource {
            if !self.datasources.contains_key(name) {
                return Err(DatavError::Config {
                    message: format!("default datasource '{name}' is not a configured datasource"),
                });
            }
        }
        for (key, settings) in &self.datasources {
            if key != &settings.name {
                return Err(DatavError::Config {
                    message: format!(
                        "datasource map key '{key}' does not match settings name '{}'",
                        settings.name
                    ),
                });
            }
        }
        Ok(())
    }

    /// Settings for a datasource by display name.
    pub fn settings(&self, name: &str) -> Option<&DatasourceInstanceSettings> {
        self.datasources.get(name)
    }

    /// Settings for a datasource by uid.
    pub fn settings_by_uid(&self, uid: &str) -> Option<&DatasourceInstanceSettings> {
        self.datasources.values().find(|ds| ds.uid == uid)
    }

    /// The name the `default` alias (and an omitted name) resolves to.
    ///
    /// Resolution order: the explicit `default_datasource` field, then the
    /// first datasource flagged `is_default`, then the lexicographically
    /// first configured name. Returns `None` when nothing is configured.
    pub fn default_datasource_name(&self) -> Option<String> {
        if let Some(name) = &self.default_datasource {
            return Some(name.clone());
        }
        if let Some(ds) = self.datasources.values().find(|ds| ds.is_default) {
            return Some(ds.name.clone());
        }
        self.datasources.keys().min().cloned()
    }
}
