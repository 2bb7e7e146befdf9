//! Shared test utilities for ingestion tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ferri::recon::ReconManager;
use rusqlite::Connection;
use tempfile::TempDir;

/// A recon database in a fresh temp dir.
///
/// The dir is deleted when the returned `TempDir` drops, so keep it alive.
pub fn temp_manager() -> (TempDir, ReconManager, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("db").join("bounty.db");
    let manager = ReconManager::with_path(&path).expect("Failed to open recon db");
    (dir, manager, path)
}

/// Second raw connection to the same file, for assertions and fault injection
pub fn raw_conn(path: &Path) -> Connection {
    Connection::open(path).expect("Failed to open raw connection")
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .expect("Failed to count rows")
}

/// Make every insert of `target` into `targets` fail
pub fn reject_target(conn: &Connection, target: &str) {
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_target BEFORE INSERT ON targets \
         WHEN NEW.target = '{target}' \
         BEGIN SELECT RAISE(ABORT, 'target rejected'); END;"
    ))
    .expect("Failed to create trigger");
}

/// Make every observation for `data` fail
pub fn reject_observation(conn: &Connection, data: &str) {
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_observation BEFORE INSERT ON recon_data \
         WHEN NEW.data = '{data}' \
         BEGIN SELECT RAISE(ABORT, 'observation rejected'); END;"
    ))
    .expect("Failed to create trigger");
}
