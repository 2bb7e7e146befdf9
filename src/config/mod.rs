//! Configuration loading and management

mod io;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::recon::DEFAULT_SOURCE_LABEL;
use crate::recon::ingest::DEFAULT_CONTEXT_PREFIX;

/// Overrides the database path from the config file
pub const DB_ENV: &str = "FERRI_DB";
/// Overrides the source label from the config file
pub const SOURCE_ENV: &str = "FERRI_SOURCE";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ingest: IngestSettings,
}

/// Where the recon database lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file; a leading `~/` is expanded to the home directory
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/bugbounty/db/bounty.db".to_string()
}

/// Defaults applied to every ingested batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Source label used when `--source` / `FERRI_SOURCE` are not given
    #[serde(default = "default_source")]
    pub source: String,

    /// Observation context is this prefix followed by the source label
    #[serde(default = "default_context_prefix")]
    pub context_prefix: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            context_prefix: default_context_prefix(),
        }
    }
}

fn default_source() -> String {
    DEFAULT_SOURCE_LABEL.to_string()
}

fn default_context_prefix() -> String {
    DEFAULT_CONTEXT_PREFIX.to_string()
}

impl Config {
    /// Resolved database location
    pub fn database_path(&self) -> PathBuf {
        expand_path(&self.database.path)
    }

    /// Apply `FERRI_DB` / `FERRI_SOURCE` from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; blank values are ignored
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());

        if let Some(path) = non_blank(DB_ENV) {
            tracing::debug!("Database path overridden by {}: {}", DB_ENV, path);
            self.database.path = path;
        }
        if let Some(source) = non_blank(SOURCE_ENV) {
            self.ingest.source = source;
        }
    }
}

/// Expand a leading `~/` to the home directory.
///
/// Other paths are returned unchanged, as is the input when no home
/// directory is known.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}
