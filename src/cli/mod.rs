//! CLI command implementations

pub mod ingest;
pub mod init;
pub mod list;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use ferri::config::{Config, SOURCE_ENV};
use ferri::recon::{ReconManager, resolve_source_label};

/// Settings every command runs with, after flags, env and config are merged
pub struct CliContext {
    pub config: Config,
    /// Source label for ingested rows
    pub source: String,
    /// True when `--config` pointed at an explicit file
    pub explicit_config: bool,
}

impl CliContext {
    /// Merge in precedence order: flags, then environment, then config file
    pub fn resolve(
        config_path: Option<&Path>,
        db: Option<&Path>,
        source: Option<&str>,
    ) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                let mut config = Config::from_file(path)?;
                config.apply_env_overrides();
                config
            }
            None => Config::load()?,
        };

        if let Some(db) = db {
            config.database.path = db.to_string_lossy().into_owned();
        }

        let env_source = std::env::var(SOURCE_ENV).ok();
        let explicit = source.or(env_source.as_deref());
        let source = resolve_source_label(explicit, Some(&config.ingest.source));
        tracing::debug!("Source label: {}", source);

        Ok(Self {
            config,
            source,
            explicit_config: config_path.is_some(),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.database_path()
    }

    /// Open (creating if needed) the recon database
    pub fn open_manager(&self) -> Result<ReconManager> {
        let path = self.database_path();
        ReconManager::with_path(&path)
            .with_context(|| format!("Failed to open recon database at {}", path.display()))
    }
}
