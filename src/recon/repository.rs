//! Repository implementations for recon data access

use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, Row, params};

use super::db::ReconDb;
use super::models::{
    Finding, FindingStatus, Program, ReconData, Severity, Target, TargetType, format_timestamp,
    parse_timestamp,
};

/// True when `err` was caused by a UNIQUE constraint rejecting an insert.
///
/// Resolve-or-create callers use this to tell a lost insert race apart from a
/// real store failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        )
    })
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<chrono::DateTime<chrono::Utc>>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .as_deref()
        .and_then(parse_timestamp))
}

// ============================================
// PROGRAM REPOSITORY
// ============================================

const PROGRAM_COLUMNS: &str = "id, name, url, scope, out_of_scope, bounty_notes, created_at";

/// Repository for Program CRUD operations
pub struct ProgramRepository {
    db: ReconDb,
}

impl ProgramRepository {
    pub fn new(db: ReconDb) -> Self {
        Self { db }
    }

    fn row_to_program(row: &Row<'_>) -> rusqlite::Result<Program> {
        Ok(Program {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            scope: row.get(3)?,
            out_of_scope: row.get(4)?,
            bounty_notes: row.get(5)?,
            created_at: timestamp_column(row, 6)?,
        })
    }

    /// Insert a program and return its id
    pub fn create(&self, program: &Program) -> Result<i64> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO programs (name, url, scope, out_of_scope, bounty_notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                program.name,
                program.url,
                program.scope,
                program.out_of_scope,
                program.bounty_notes,
            ],
        )
        .with_context(|| format!("Failed to create program '{}'", program.name))?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a program by ID
    pub fn get(&self, id: i64) -> Result<Option<Program>> {
        let conn = self.db.conn();
        let program = conn
            .query_row(
                &format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = ?1"),
                params![id],
                Self::row_to_program,
            )
            .optional()?;
        Ok(program)
    }

    /// Get a program by its exact (case-sensitive) name
    pub fn get_by_name(&self, name: &str) -> Result<Option<Program>> {
        let conn = self.db.conn();
        let program = conn
            .query_row(
                &format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE name = ?1"),
                params![name],
                Self::row_to_program,
            )
            .optional()
            .with_context(|| format!("Failed to query program '{}'", name))?;
        Ok(program)
    }

    /// Update the editable fields of a program
    pub fn update(&self, program: &Program) -> Result<()> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            UPDATE programs SET
                name = ?2,
                url = ?3,
                scope = ?4,
                out_of_scope = ?5,
                bounty_notes = ?6
            WHERE id = ?1
            "#,
            params![
                program.id,
                program.name,
                program.url,
                program.scope,
                program.out_of_scope,
                program.bounty_notes,
            ],
        )
        .context("Failed to update program")?;
        Ok(())
    }

    /// Delete a program
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.conn();
        conn.execute("DELETE FROM programs WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// List all programs ordered by name
    pub fn list(&self) -> Result<Vec<Program>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM programs ORDER BY name"
        ))?;

        let programs = stmt
            .query_map([], Self::row_to_program)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(programs)
    }
}

// ============================================
// TARGET REPOSITORY
// ============================================

const TARGET_COLUMNS: &str = "id, program_id, target, type, source, alive, last_checked, \
                              tested, tested_date, test_notes, notes, created_at";

/// Repository for Target CRUD operations
pub struct TargetRepository {
    db: ReconDb,
}

impl TargetRepository {
    pub fn new(db: ReconDb) -> Self {
        Self { db }
    }

    fn row_to_target(row: &Row<'_>) -> rusqlite::Result<Target> {
        Ok(Target {
            id: row.get(0)?,
            program_id: row.get(1)?,
            target: row.get(2)?,
            target_type: row
                .get::<_, Option<String>>(3)?
                .as_deref()
                .and_then(TargetType::from_str)
                .unwrap_or(TargetType::Unknown),
            source: row.get(4)?,
            alive: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
            last_checked: timestamp_column(row, 6)?,
            tested: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
            tested_date: timestamp_column(row, 8)?,
            test_notes: row.get(9)?,
            notes: row.get(10)?,
            created_at: timestamp_column(row, 11)?,
        })
    }

    /// Insert a target and return its id
    pub fn create(&self, target: &Target) -> Result<i64> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO targets (
                program_id, target, type, source, alive, last_checked,
                tested, tested_date, test_notes, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                target.program_id,
                target.target,
                target.target_type.as_str(),
                target.source,
                target.alive,
                target.last_checked.as_ref().map(format_timestamp),
                target.tested,
                target.tested_date.as_ref().map(format_timestamp),
                target.test_notes,
                target.notes,
            ],
        )
        .with_context(|| format!("Failed to create target '{}'", target.target))?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a target by ID
    pub fn get(&self, id: i64) -> Result<Option<Target>> {
        let conn = self.db.conn();
        let target = conn
            .query_row(
                &format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"),
                params![id],
                Self::row_to_target,
            )
            .optional()?;
        Ok(target)
    }

    /// Look up a target by its natural key
    pub fn get_by_program_and_target(&self, program_id: i64, target: &str) -> Result<Option<Target>> {
        let conn = self.db.conn();
        let found = conn
            .query_row(
                &format!(
                    "SELECT {TARGET_COLUMNS} FROM targets WHERE target = ?1 AND program_id = ?2"
                ),
                params![target, program_id],
                Self::row_to_target,
            )
            .optional()
            .with_context(|| format!("Failed to query target '{}'", target))?;
        Ok(found)
    }

    /// Update a target (liveness, testing notes, etc.)
    pub fn update(&self, target: &Target) -> Result<()> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            UPDATE targets SET
                type = ?2,
                source = ?3,
                alive = ?4,
                last_checked = ?5,
                tested = ?6,
                tested_date = ?7,
                test_notes = ?8,
                notes = ?9
            WHERE id = ?1
            "#,
            params![
                target.id,
                target.target_type.as_str(),
                target.source,
                target.alive,
                target.last_checked.as_ref().map(format_timestamp),
                target.tested,
                target.tested_date.as_ref().map(format_timestamp),
                target.test_notes,
                target.notes,
            ],
        )
        .context("Failed to update target")?;
        Ok(())
    }

    /// Delete a target
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.conn();
        conn.execute("DELETE FROM targets WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// List targets of a program in insertion order
    pub fn list_by_program(&self, program_id: i64) -> Result<Vec<Target>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets WHERE program_id = ?1 ORDER BY id"
        ))?;

        let targets = stmt
            .query_map(params![program_id], Self::row_to_target)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(targets)
    }

    /// List every target currently marked alive
    pub fn list_alive(&self) -> Result<Vec<Target>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TARGET_COLUMNS} FROM targets WHERE alive = 1 ORDER BY program_id, id"
        ))?;

        let targets = stmt
            .query_map([], Self::row_to_target)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(targets)
    }

    pub fn count_by_program(&self, program_id: i64) -> Result<usize> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM targets WHERE program_id = ?1",
            params![program_id],
            |r| r.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

// ============================================
// RECON DATA REPOSITORY
// ============================================

const RECON_COLUMNS: &str = "id, target_id, tool, data, context, timestamp";

/// Repository for the append-only observation trail
pub struct ReconDataRepository {
    db: ReconDb,
}

impl ReconDataRepository {
    pub fn new(db: ReconDb) -> Self {
        Self { db }
    }

    fn row_to_recon(row: &Row<'_>) -> rusqlite::Result<ReconData> {
        Ok(ReconData {
            id: row.get(0)?,
            target_id: row.get(1)?,
            tool: row.get(2)?,
            data: row.get(3)?,
            context: row.get(4)?,
            timestamp: timestamp_column(row, 5)?.unwrap_or_default(),
        })
    }

    /// Append an observation and return its id
    pub fn create(&self, data: &ReconData) -> Result<i64> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO recon_data (target_id, tool, data, context, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.target_id,
                data.tool,
                data.data,
                data.context,
                format_timestamp(&data.timestamp),
            ],
        )
        .with_context(|| format!("Failed to insert recon data for target {}", data.target_id))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<ReconData>> {
        let conn = self.db.conn();
        let data = conn
            .query_row(
                &format!("SELECT {RECON_COLUMNS} FROM recon_data WHERE id = ?1"),
                params![id],
                Self::row_to_recon,
            )
            .optional()?;
        Ok(data)
    }

    /// Observations for one target, oldest first
    pub fn list_by_target(&self, target_id: i64) -> Result<Vec<ReconData>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECON_COLUMNS} FROM recon_data WHERE target_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt
            .query_map(params![target_id], Self::row_to_recon)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    pub fn list_by_tool(&self, tool: &str) -> Result<Vec<ReconData>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECON_COLUMNS} FROM recon_data WHERE tool = ?1 ORDER BY id"
        ))?;

        let rows = stmt
            .query_map(params![tool], Self::row_to_recon)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    pub fn count_by_target(&self, target_id: i64) -> Result<usize> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recon_data WHERE target_id = ?1",
            params![target_id],
            |r| r.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.conn();
        conn.execute("DELETE FROM recon_data WHERE id = ?1", params![id])?;
        Ok(())
    }
}

// ============================================
// FINDING REPOSITORY
// ============================================

const FINDING_COLUMNS: &str = "id, target_id, title, type, severity, description, \
                               proof_of_concept, status, reported_date, report_id, notes, created_at";

/// Repository for Finding CRUD operations
pub struct FindingRepository {
    db: ReconDb,
}

impl FindingRepository {
    pub fn new(db: ReconDb) -> Self {
        Self { db }
    }

    fn row_to_finding(row: &Row<'_>) -> rusqlite::Result<Finding> {
        Ok(Finding {
            id: row.get(0)?,
            target_id: row.get(1)?,
            title: row.get(2)?,
            finding_type: row.get(3)?,
            severity: row
                .get::<_, Option<String>>(4)?
                .as_deref()
                .and_then(Severity::from_str),
            description: row.get(5)?,
            proof_of_concept: row.get(6)?,
            status: row
                .get::<_, Option<String>>(7)?
                .as_deref()
                .and_then(FindingStatus::from_str)
                .unwrap_or(FindingStatus::Open),
            reported_date: timestamp_column(row, 8)?,
            report_id: row.get(9)?,
            notes: row.get(10)?,
            created_at: timestamp_column(row, 11)?,
        })
    }

    fn query_list(&self, filter: &str, value: &dyn rusqlite::ToSql) -> Result<Vec<Finding>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FINDING_COLUMNS} FROM findings WHERE {filter} = ?1 ORDER BY id"
        ))?;

        let findings = stmt
            .query_map(params![value], Self::row_to_finding)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(findings)
    }

    /// Insert a finding and return its id
    pub fn create(&self, finding: &Finding) -> Result<i64> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO findings (
                target_id, title, type, severity, description,
                proof_of_concept, status, reported_date, report_id, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                finding.target_id,
                finding.title,
                finding.finding_type,
                finding.severity.map(|s| s.as_str()),
                finding.description,
                finding.proof_of_concept,
                finding.status.as_str(),
                finding.reported_date.as_ref().map(format_timestamp),
                finding.report_id,
                finding.notes,
            ],
        )
        .context("Failed to create finding")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<Finding>> {
        let conn = self.db.conn();
        let finding = conn
            .query_row(
                &format!("SELECT {FINDING_COLUMNS} FROM findings WHERE id = ?1"),
                params![id],
                Self::row_to_finding,
            )
            .optional()?;
        Ok(finding)
    }

    pub fn list_by_target(&self, target_id: i64) -> Result<Vec<Finding>> {
        self.query_list("target_id", &target_id)
    }

    pub fn list_by_severity(&self, severity: Severity) -> Result<Vec<Finding>> {
        self.query_list("severity", &severity.as_str())
    }

    pub fn list_by_status(&self, status: FindingStatus) -> Result<Vec<Finding>> {
        self.query_list("status", &status.as_str())
    }

    pub fn update(&self, finding: &Finding) -> Result<()> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            UPDATE findings SET
                title = ?2,
                type = ?3,
                severity = ?4,
                description = ?5,
                proof_of_concept = ?6,
                status = ?7,
                reported_date = ?8,
                report_id = ?9,
                notes = ?10
            WHERE id = ?1
            "#,
            params![
                finding.id,
                finding.title,
                finding.finding_type,
                finding.severity.map(|s| s.as_str()),
                finding.description,
                finding.proof_of_concept,
                finding.status.as_str(),
                finding.reported_date.as_ref().map(format_timestamp),
                finding.report_id,
                finding.notes,
            ],
        )
        .context("Failed to update finding")?;
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.conn();
        conn.execute("DELETE FROM findings WHERE id = ?1", params![id])?;
        Ok(())
    }
}
