//! Configuration file I/O operations

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

impl Config {
    /// Get the global config directory path (~/.ferri/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ferri")
    }

    /// Get the global config file path (~/.ferri/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Load configuration from a file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the global config, or defaults when it does not exist.
    ///
    /// Environment overrides are applied on top.
    pub fn load() -> Result<Self> {
        let global_path = Self::global_config_path();

        let mut config = if global_path.exists() {
            Self::from_file(&global_path)?
        } else {
            tracing::debug!("No config at {}, using defaults", global_path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration with an exclusive lock and an atomic rename
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        let lock_path = path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config lock")?;

        write_atomic(path, content.as_bytes())
        // lock released on drop
    }

    /// Write the default global config unless one exists.
    ///
    /// Returns the config path and whether it was written.
    pub fn init_global() -> Result<(PathBuf, bool)> {
        let path = Self::global_config_path();
        let written = Self::default().save_if_missing(&path)?;
        Ok((path, written))
    }

    /// Save to `path` only if no file is there yet, checked under the lock
    pub fn save_if_missing(&self, path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let lock_path = path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config lock for init")?;

        // Another process may have written it while we waited
        if path.exists() {
            return Ok(false);
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize default config")?;
        write_atomic(path, content.as_bytes())?;
        tracing::info!("Created config at {}", path.display());
        Ok(true)
    }
}

/// Temp file + sync + rename
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("toml.tmp");
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

    temp_file
        .write_all(content)
        .with_context(|| "Failed to write config content")?;

    temp_file
        .sync_all()
        .with_context(|| "Failed to sync config file")?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename config file: {}", path.display()))?;
    Ok(())
}
