//! Recon tracking for bug bounty programs
//!
//! Turns line-oriented output of recon tools (subdomain lists, URL dumps,
//! host:port pairs) into programs, targets and an append-only observation log.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ReconManager                          │
//! │  - Program / Target / ReconData / Finding repositories       │
//! │  - IngestStore impl used by the ingestion pipeline           │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                   ~/bugbounty/db/bounty.db
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let manager = ReconManager::new()?;
//!
//! let summary = manager
//!     .ingest_lines(["api.example.com", "https://example.com/login"], "subfinder")?
//!     .into_result()?;
//! println!("{}", summary.summary());
//!
//! for target in manager.targets().list_by_program(summary.program_id)? {
//!     println!("{} ({})", target.target, target.target_type);
//! }
//! ```

pub mod classify;
mod db;
pub mod identity;
pub mod ingest;
pub mod models;
mod repository;
pub mod source;

pub use classify::classify_target;
pub use db::ReconDb;
pub use identity::{Organization, extract_organization};
pub use ingest::{
    IngestError, IngestStore, IngestSummary, Ingestor, LineFailure, LineReport, LineStage,
    Resolution, ingest, ingest_lines,
};
pub use models::*;
pub use repository::*;
pub use source::{DEFAULT_SOURCE_LABEL, resolve_source_label};

use anyhow::Result;

/// Central manager for the recon database
#[derive(Clone)]
pub struct ReconManager {
    db: ReconDb,
}

impl ReconManager {
    /// Open the database named by the global config
    pub fn new() -> Result<Self> {
        let db = ReconDb::open_default()?;
        Ok(Self { db })
    }

    /// Open a database at a custom path
    pub fn with_path(path: &std::path::Path) -> Result<Self> {
        let db = ReconDb::open(path)?;
        Ok(Self { db })
    }

    pub fn in_memory() -> Result<Self> {
        let db = ReconDb::open_in_memory()?;
        Ok(Self { db })
    }

    pub fn programs(&self) -> ProgramRepository {
        ProgramRepository::new(self.db.clone())
    }

    pub fn targets(&self) -> TargetRepository {
        TargetRepository::new(self.db.clone())
    }

    pub fn recon_data(&self) -> ReconDataRepository {
        ReconDataRepository::new(self.db.clone())
    }

    pub fn findings(&self) -> FindingRepository {
        FindingRepository::new(self.db.clone())
    }

    /// Reset all data (for testing)
    pub fn reset_all(&self) -> Result<()> {
        self.db.reset_all()
    }

    // Convenience methods

    pub fn get_program_by_name(&self, name: &str) -> Result<Option<Program>> {
        self.programs().get_by_name(name)
    }

    pub fn list_programs(&self) -> Result<Vec<Program>> {
        self.programs().list()
    }

    /// Targets of a program, optionally only the ones marked alive
    pub fn list_targets(&self, program_id: i64, alive_only: bool) -> Result<Vec<Target>> {
        let targets = self.targets().list_by_program(program_id)?;
        if alive_only {
            Ok(targets.into_iter().filter(|t| t.alive).collect())
        } else {
            Ok(targets)
        }
    }

    /// Ingest a batch whose organization is the first non-blank line
    pub fn ingest_lines<I, L>(&self, lines: I, source: &str) -> Result<IngestSummary, IngestError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        Ingestor::new(self, source).ingest_lines(lines)
    }
}

impl IngestStore for ReconManager {
    fn find_program(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.programs().get_by_name(name)?.map(|p| p.id))
    }

    fn create_program(&self, program: &Program) -> Result<i64> {
        self.programs().create(program)
    }

    fn find_target(&self, program_id: i64, target: &str) -> Result<Option<i64>> {
        Ok(self
            .targets()
            .get_by_program_and_target(program_id, target)?
            .map(|t| t.id))
    }

    fn create_target(&self, target: &Target) -> Result<i64> {
        self.targets().create(target)
    }

    fn append_observation(&self, observation: &ReconData) -> Result<i64> {
        self.recon_data().create(observation)
    }
}
