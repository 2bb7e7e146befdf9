//! SQLite connection and schema management for the recon database
//!
//! The schema matches the layout other bug bounty tooling already reads
//! (`~/bugbounty/db/bounty.db`), so table and column names must not change.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::Config;

/// Database wrapper for recon data
#[derive(Clone)]
pub struct ReconDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ReconDb {
    /// Open or create the database at the location named by the global config
    pub fn open_default() -> Result<Self> {
        let config = Config::load()?;
        Self::open(&config.database_path())
    }

    /// Open or create the recon database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database dir: {}", parent.display())
                })?;
            }
        }

        let existed = path.exists();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open recon db: {}", path.display()))?;

        // WAL lets a second ferri process read while another one ingests
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        if !existed {
            tracing::info!("Creating recon database: {}", path.display());
        }

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open a private in-memory database (tests and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory recon db")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Get a reference to the connection
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Recon DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize recon schema")?;
        Ok(())
    }

    /// Delete all recon data (reset to empty state)
    pub fn reset_all(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            r#"
            DELETE FROM findings;
            DELETE FROM recon_data;
            DELETE FROM targets;
            DELETE FROM programs;
            "#,
        )?;
        Ok(())
    }
}

/// SQL schema for the recon database
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS programs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url TEXT,
    scope TEXT,
    out_of_scope TEXT,
    bounty_notes TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    program_id INTEGER NOT NULL,
    target TEXT NOT NULL,
    type TEXT,
    source TEXT,
    alive BOOLEAN DEFAULT 0,
    last_checked DATETIME,
    tested BOOLEAN DEFAULT 0,
    tested_date DATETIME,
    test_notes TEXT,
    notes TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (program_id) REFERENCES programs (id),
    UNIQUE(program_id, target)
);

CREATE TABLE IF NOT EXISTS recon_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL,
    tool TEXT NOT NULL,
    data TEXT NOT NULL,
    context TEXT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (target_id) REFERENCES targets (id)
);

CREATE TABLE IF NOT EXISTS findings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    type TEXT,
    severity TEXT,
    description TEXT,
    proof_of_concept TEXT,
    status TEXT DEFAULT 'open',
    reported_date DATETIME,
    report_id TEXT,
    notes TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (target_id) REFERENCES targets (id)
);

CREATE INDEX IF NOT EXISTS idx_targets_program ON targets(program_id);
CREATE INDEX IF NOT EXISTS idx_targets_alive ON targets(alive);
CREATE INDEX IF NOT EXISTS idx_recon_data_target ON recon_data(target_id);
"#;
