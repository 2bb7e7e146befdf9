//! End-to-end ingestion tests against a SQLite file

mod common;

use std::cell::Cell;

use anyhow::Result;
use common::{count, raw_conn, reject_observation, reject_target, temp_manager};
use ferri::recon::{
    IngestError, IngestStore, Ingestor, LineStage, Program, ReconData, ReconManager, Resolution,
    Target, TargetType, ingest,
};

const BATCH: [&str; 3] = ["example.com", "api.example.com", "https://example.com/login"];

#[test]
fn test_end_to_end_batch() {
    let (_dir, manager, path) = temp_manager();

    let summary = ingest(&manager, BATCH[0], BATCH, "tool_x").unwrap();
    assert_eq!(summary.program_name, "example");
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.new_targets, 3);

    let conn = raw_conn(&path);
    assert_eq!(count(&conn, "programs"), 1);
    assert_eq!(count(&conn, "targets"), 3);
    assert_eq!(count(&conn, "recon_data"), 3);

    let program = manager.get_program_by_name("example").unwrap().unwrap();
    assert_eq!(program.scope.as_deref(), Some("*.example.com"));
    assert!(program.url.is_none());
    assert!(program.created_at.is_some());

    let types: Vec<TargetType> = manager
        .list_targets(program.id, false)
        .unwrap()
        .iter()
        .map(|t| t.target_type)
        .collect();
    assert_eq!(types, vec![TargetType::Domain, TargetType::Subdomain, TargetType::Url]);

    let contexts: Vec<String> = conn
        .prepare("SELECT context FROM recon_data WHERE tool = 'tool_x'")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert!(contexts.iter().all(|c| c == "Discovered via tool_x"));
}

#[test]
fn test_second_run_is_idempotent_for_programs_and_targets() {
    let (_dir, manager, path) = temp_manager();

    ingest(&manager, BATCH[0], BATCH, "tool_x").unwrap();
    let second = ingest(&manager, BATCH[0], BATCH, "tool_x").unwrap();

    assert!(!second.program_created);
    assert_eq!(second.new_targets, 0);
    assert!(second.lines.iter().all(|l| l.resolution == Resolution::Existing));

    let conn = raw_conn(&path);
    assert_eq!(count(&conn, "programs"), 1);
    assert_eq!(count(&conn, "targets"), 3);
    assert_eq!(count(&conn, "recon_data"), 6);
}

#[test]
fn test_reopened_database_keeps_identity() {
    let (dir, manager, path) = temp_manager();
    let first = manager.ingest_lines(BATCH, "tool_x").unwrap();
    drop(manager);

    let reopened = ReconManager::with_path(&path).unwrap();
    let second = reopened.ingest_lines(["api.example.com"], "httpx").unwrap();
    assert_eq!(second.program_id, first.program_id);
    assert_eq!(second.lines[0].target_id, first.lines[1].target_id);
    drop(dir);
}

#[test]
fn test_blank_lines_do_not_count() {
    let (_dir, manager, _path) = temp_manager();
    let summary = manager
        .ingest_lines(["", "  example.com  ", "\t", "api.example.com", ""], "tool_x")
        .unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.processed, 2);
    assert!(summary.processed <= summary.total);
    assert_eq!(summary.lines[0].line, "example.com");
}

#[test]
fn test_empty_input_creates_nothing() {
    let (_dir, manager, path) = temp_manager();
    let err = manager.ingest_lines(["", "   "], "tool_x").unwrap_err();
    assert!(matches!(err, IngestError::EmptyInput));
    assert_eq!(count(&raw_conn(&path), "programs"), 0);
}

#[test]
fn test_failed_target_insert_does_not_block_batch() {
    let (_dir, manager, path) = temp_manager();
    let conn = raw_conn(&path);
    reject_target(&conn, "api.example.com");

    let summary = manager.ingest_lines(BATCH, "tool_x").unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].line, "api.example.com");
    assert_eq!(summary.failures[0].stage, LineStage::ResolveTarget);
    assert!(summary.failures[0].error.contains("target rejected"));

    // The line after the failure went through
    assert_eq!(summary.lines[1].line, "https://example.com/login");
    assert_eq!(count(&conn, "targets"), 2);
    assert_eq!(count(&conn, "recon_data"), 2);
}

#[test]
fn test_failed_observation_keeps_target() {
    let (_dir, manager, path) = temp_manager();
    let conn = raw_conn(&path);
    reject_observation(&conn, "example.com");

    let summary = manager.ingest_lines(["example.com"], "tool_x").unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failures[0].stage, LineStage::AppendObservation);
    assert_eq!(count(&conn, "targets"), 1);

    let err = summary.into_result().unwrap_err();
    assert!(matches!(err, IngestError::AllTargetsFailed { total: 1 }));
}

/// Hides rows from the first lookup, as if another process inserted them
/// between our lookup and our insert
struct StaleLookups<'a> {
    inner: &'a ReconManager,
    program_misses: Cell<usize>,
    target_misses: Cell<usize>,
}

impl IngestStore for StaleLookups<'_> {
    fn find_program(&self, name: &str) -> Result<Option<i64>> {
        if self.program_misses.get() > 0 {
            self.program_misses.set(self.program_misses.get() - 1);
            return Ok(None);
        }
        self.inner.find_program(name)
    }

    fn create_program(&self, program: &Program) -> Result<i64> {
        self.inner.create_program(program)
    }

    fn find_target(&self, program_id: i64, target: &str) -> Result<Option<i64>> {
        if self.target_misses.get() > 0 {
            self.target_misses.set(self.target_misses.get() - 1);
            return Ok(None);
        }
        self.inner.find_target(program_id, target)
    }

    fn create_target(&self, target: &Target) -> Result<i64> {
        self.inner.create_target(target)
    }

    fn append_observation(&self, observation: &ReconData) -> Result<i64> {
        self.inner.append_observation(observation)
    }
}

#[test]
fn test_lost_insert_race_reuses_winner() {
    let (_dir, manager, path) = temp_manager();
    let first = manager.ingest_lines(["example.com"], "amass").unwrap();

    let racing = StaleLookups {
        inner: &manager,
        program_misses: Cell::new(1),
        target_misses: Cell::new(1),
    };
    let summary = Ingestor::new(&racing, "httpx")
        .ingest_lines(["example.com"])
        .unwrap();

    assert!(!summary.program_created);
    assert_eq!(summary.program_id, first.program_id);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.lines[0].resolution, Resolution::Existing);
    assert_eq!(summary.lines[0].target_id, first.lines[0].target_id);

    let conn = raw_conn(&path);
    assert_eq!(count(&conn, "programs"), 1);
    assert_eq!(count(&conn, "targets"), 1);
    assert_eq!(count(&conn, "recon_data"), 2);
}

#[test]
fn test_custom_context_prefix() {
    let (_dir, manager, _path) = temp_manager();
    let summary = Ingestor::new(&manager, "nuclei")
        .with_context_prefix("Seen by ")
        .ingest_lines(["https://example.com/admin"])
        .unwrap();

    let trail = manager
        .recon_data()
        .list_by_target(summary.lines[0].target_id)
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].tool, "nuclei");
    assert_eq!(trail[0].data, "https://example.com/admin");
    assert_eq!(trail[0].context.as_deref(), Some("Seen by nuclei"));
}
