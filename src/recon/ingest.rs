//! Idempotent ingestion of recon tool output
//!
//! One batch = one program. The first line decides the organization, every
//! line becomes (or reuses) a target under it and always appends one
//! observation row. Lines are independent: a store error on one line is
//! recorded and the loop moves on.
//!
//! ```text
//! Pending ─► Classified ─► Resolved{New|Existing} ─► Observed ─► Done
//!    └──────────────┴──────────────┴──────────────────► Failed
//! ```
//!
//! Resolve-or-create is check-then-act. Two ferri processes may race on the
//! same program or target; the store's UNIQUE constraints reject the loser,
//! which then re-reads the winner's row.

use std::io::BufRead;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::classify::classify_target;
use super::identity::{Organization, extract_organization};
use super::models::{Program, ReconData, Target, TargetType};
use super::repository::is_unique_violation;

/// Context prefix written on every observation, followed by the source label
pub const DEFAULT_CONTEXT_PREFIX: &str = "Discovered via ";

/// Errors surfaced by the ingestion pipeline
#[derive(Debug, Error)]
pub enum IngestError {
    /// No non-blank line was supplied; nothing was written
    #[error("No valid targets found in input")]
    EmptyInput,

    /// The store could not be opened or the program could not be resolved
    #[error("Recon store unavailable: {0:#}")]
    StoreUnavailable(#[source] anyhow::Error),

    /// An insert lost a uniqueness race and the winner's row could not be re-read
    #[error("Conflicting {entity} '{key}' could not be re-resolved")]
    ConflictRetryable { entity: &'static str, key: String },

    /// Target resolution or observation append failed for one line
    #[error("Failed to ingest '{line}': {source:#}")]
    LineIngestFailed {
        line: String,
        #[source]
        source: anyhow::Error,
    },

    /// Every line of a non-empty batch failed
    #[error("No targets were processed successfully ({total} failed)")]
    AllTargetsFailed { total: usize },
}

/// Narrow store interface the pipeline needs.
///
/// Implemented by [`ReconManager`](super::ReconManager) over SQLite. Inserts
/// must fail with a UNIQUE constraint error (see [`is_unique_violation`]) when
/// the natural key already exists.
pub trait IngestStore {
    /// Program id by exact name
    fn find_program(&self, name: &str) -> Result<Option<i64>>;
    fn create_program(&self, program: &Program) -> Result<i64>;
    /// Target id by `(program_id, raw target)`
    fn find_target(&self, program_id: i64, target: &str) -> Result<Option<i64>>;
    fn create_target(&self, target: &Target) -> Result<i64>;
    fn append_observation(&self, observation: &ReconData) -> Result<i64>;
}

/// Whether resolve-or-create found a row or inserted one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    New,
    Existing,
}

/// Step a failed line was in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStage {
    ResolveTarget,
    AppendObservation,
}

/// A line that reached `Done`
#[derive(Debug, Clone, Serialize)]
pub struct LineReport {
    pub line: String,
    pub target_id: i64,
    pub target_type: TargetType,
    pub resolution: Resolution,
}

/// A line that ended in `Failed`
#[derive(Debug, Clone, Serialize)]
pub struct LineFailure {
    pub line: String,
    pub stage: LineStage,
    pub error: String,
}

/// Per-run summary
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub program_id: i64,
    pub program_name: String,
    /// True when this run inserted the program row
    pub program_created: bool,
    pub source: String,
    /// Lines where both target resolution and observation append succeeded
    pub processed: usize,
    /// Non-blank input lines
    pub total: usize,
    /// Targets inserted by this run
    pub new_targets: usize,
    pub lines: Vec<LineReport>,
    pub failures: Vec<LineFailure>,
}

impl IngestSummary {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }

    /// Turn a batch where nothing succeeded into [`IngestError::AllTargetsFailed`]
    pub fn into_result(self) -> Result<Self, IngestError> {
        if self.processed == 0 {
            Err(IngestError::AllTargetsFailed { total: self.total })
        } else {
            Ok(self)
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Processed {}/{} targets for program {} (ID: {})",
            self.processed, self.total, self.program_name, self.program_id
        )
    }
}

/// Trim every line and drop blanks
pub fn normalize_lines<I, L>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    lines
        .into_iter()
        .map(|l| l.as_ref().trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Read newline-delimited input as bytes, decoding each line lossily.
///
/// A line that is not valid UTF-8 keeps its readable parts and gets U+FFFD
/// for the rest instead of failing the whole read.
pub fn read_lines_lossy<R: BufRead>(mut reader: R) -> std::io::Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\n', '\r']).to_string());
    }
    Ok(lines)
}

/// Look up by natural key, insert on miss, re-read on a lost insert race
fn resolve_or_create(
    entity: &'static str,
    key: &str,
    lookup: impl Fn() -> Result<Option<i64>>,
    create: impl FnOnce() -> Result<i64>,
) -> Result<(i64, Resolution)> {
    if let Some(id) = lookup()? {
        return Ok((id, Resolution::Existing));
    }

    match create() {
        Ok(id) => Ok((id, Resolution::New)),
        Err(err) if is_unique_violation(&err) => {
            tracing::warn!("{} '{}' was inserted concurrently, re-resolving", entity, key);
            match lookup()? {
                Some(id) => Ok((id, Resolution::Existing)),
                None => Err(IngestError::ConflictRetryable {
                    entity,
                    key: key.to_string(),
                }
                .into()),
            }
        }
        Err(err) => Err(err),
    }
}

/// Runs batches against one store with one source label
pub struct Ingestor<'a, S: IngestStore + ?Sized> {
    store: &'a S,
    source: String,
    context_prefix: String,
}

impl<'a, S: IngestStore + ?Sized> Ingestor<'a, S> {
    pub fn new(store: &'a S, source: impl Into<String>) -> Self {
        Self {
            store,
            source: source.into(),
            context_prefix: DEFAULT_CONTEXT_PREFIX.to_string(),
        }
    }

    pub fn with_context_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.context_prefix = prefix.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Ingest a batch whose organization is taken from its first non-blank line
    pub fn ingest_lines<I, L>(&self, lines: I) -> Result<IngestSummary, IngestError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let lines = normalize_lines(lines);
        let Some(first) = lines.first().cloned() else {
            return Err(IngestError::EmptyInput);
        };
        self.run(&first, lines)
    }

    /// Ingest a batch under the organization derived from `organization_input`.
    ///
    /// A blank `organization_input` falls back to the first line.
    pub fn ingest<I, L>(&self, organization_input: &str, lines: I) -> Result<IngestSummary, IngestError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let lines = normalize_lines(lines);
        if lines.is_empty() {
            return Err(IngestError::EmptyInput);
        }
        let org_input = match organization_input.trim() {
            "" => lines[0].clone(),
            trimmed => trimmed.to_string(),
        };
        self.run(&org_input, lines)
    }

    fn run(&self, organization_input: &str, lines: Vec<String>) -> Result<IngestSummary, IngestError> {
        let org = extract_organization(organization_input);
        let (program_id, program_created) = self.resolve_program(&org)?;

        let mut summary = IngestSummary {
            program_id,
            program_name: org.name.clone(),
            program_created,
            source: self.source.clone(),
            processed: 0,
            total: lines.len(),
            new_targets: 0,
            lines: Vec::with_capacity(lines.len()),
            failures: Vec::new(),
        };

        for line in lines {
            match self.ingest_line(program_id, &line) {
                Ok(report) => {
                    tracing::debug!(
                        "{} -> target {} ({}, {:?})",
                        report.line,
                        report.target_id,
                        report.target_type,
                        report.resolution
                    );
                    summary.processed += 1;
                    if report.resolution == Resolution::New {
                        summary.new_targets += 1;
                    }
                    summary.lines.push(report);
                }
                Err((stage, err)) => {
                    tracing::warn!("{}", err);
                    summary.failures.push(LineFailure {
                        line,
                        stage,
                        error: match &err {
                            IngestError::LineIngestFailed { source, .. } => format!("{source:#}"),
                            other => other.to_string(),
                        },
                    });
                }
            }
        }

        tracing::info!("{}", summary.summary());
        Ok(summary)
    }

    fn resolve_program(&self, org: &Organization) -> Result<(i64, bool), IngestError> {
        let (id, resolution) = resolve_or_create(
            "program",
            &org.name,
            || self.store.find_program(&org.name),
            || {
                self.store
                    .create_program(&Program::new(&org.name).with_scope(&org.scope))
            },
        )
        .map_err(|err| match err.downcast::<IngestError>() {
            Ok(ingest_err) => ingest_err,
            Err(err) => IngestError::StoreUnavailable(err),
        })?;

        match resolution {
            Resolution::New => tracing::info!("Created new program: {} (ID: {})", org.name, id),
            Resolution::Existing => tracing::info!("Using existing program: {} (ID: {})", org.name, id),
        }
        Ok((id, resolution == Resolution::New))
    }

    fn ingest_line(&self, program_id: i64, line: &str) -> Result<LineReport, (LineStage, IngestError)> {
        let target_type = classify_target(line);
        let now = Utc::now();

        let (target_id, resolution) = resolve_or_create(
            "target",
            line,
            || self.store.find_target(program_id, line),
            || {
                self.store.create_target(
                    &Target::new(program_id, line, target_type)
                        .with_source(&self.source)
                        .with_last_checked(now),
                )
            },
        )
        .map_err(|source| (LineStage::ResolveTarget, line_failed(line, source)))?;

        let observation = ReconData::new(target_id, &self.source, line)
            .with_context(format!("{}{}", self.context_prefix, self.source))
            .with_timestamp(now);
        self.store
            .append_observation(&observation)
            .map_err(|source| (LineStage::AppendObservation, line_failed(line, source)))?;

        Ok(LineReport {
            line: line.to_string(),
            target_id,
            target_type,
            resolution,
        })
    }
}

fn line_failed(line: &str, source: anyhow::Error) -> IngestError {
    IngestError::LineIngestFailed {
        line: line.to_string(),
        source,
    }
}

/// Ingest `lines` under the organization of `organization_input`, labelling
/// every row with `source_label`.
pub fn ingest<S, I, L>(
    store: &S,
    organization_input: &str,
    lines: I,
    source_label: &str,
) -> Result<IngestSummary, IngestError>
where
    S: IngestStore + ?Sized,
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    Ingestor::new(store, source_label).ingest(organization_input, lines)
}

/// Ingest `lines` under the organization of their first non-blank line
pub fn ingest_lines<S, I, L>(store: &S, lines: I, source_label: &str) -> Result<IngestSummary, IngestError>
where
    S: IngestStore + ?Sized,
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    Ingestor::new(store, source_label).ingest_lines(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// In-memory store with switches for failure injection
    #[derive(Default)]
    struct MemoryStore {
        programs: RefCell<HashMap<String, i64>>,
        targets: RefCell<HashMap<(i64, String), i64>>,
        observations: RefCell<Vec<ReconData>>,
        next_id: Cell<i64>,
        fail_target: Option<String>,
        fail_observation: Option<String>,
        programs_down: bool,
    }

    impl MemoryStore {
        fn id(&self) -> i64 {
            self.next_id.set(self.next_id.get() + 1);
            self.next_id.get()
        }
    }

    impl IngestStore for MemoryStore {
        fn find_program(&self, name: &str) -> Result<Option<i64>> {
            if self.programs_down {
                anyhow::bail!("database is locked");
            }
            Ok(self.programs.borrow().get(name).copied())
        }

        fn create_program(&self, program: &Program) -> Result<i64> {
            let id = self.id();
            self.programs.borrow_mut().insert(program.name.clone(), id);
            Ok(id)
        }

        fn find_target(&self, program_id: i64, target: &str) -> Result<Option<i64>> {
            Ok(self
                .targets
                .borrow()
                .get(&(program_id, target.to_string()))
                .copied())
        }

        fn create_target(&self, target: &Target) -> Result<i64> {
            if self.fail_target.as_deref() == Some(target.target.as_str()) {
                anyhow::bail!("disk I/O error");
            }
            let id = self.id();
            self.targets
                .borrow_mut()
                .insert((target.program_id, target.target.clone()), id);
            Ok(id)
        }

        fn append_observation(&self, observation: &ReconData) -> Result<i64> {
            if self.fail_observation.as_deref() == Some(observation.data.as_str()) {
                anyhow::bail!("disk I/O error");
            }
            self.observations.borrow_mut().push(observation.clone());
            Ok(self.observations.borrow().len() as i64)
        }
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        let lines = normalize_lines(["  example.com ", "", "   ", "\tapi.example.com"]);
        assert_eq!(lines, vec!["example.com", "api.example.com"]);
    }

    #[test]
    fn test_invalid_utf8_line_does_not_stop_reading() {
        let input: &[u8] = b"example.com\n\xff\xfe.example.com\r\napi.example.com";
        let lines = read_lines_lossy(input).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "example.com");
        assert_eq!(lines[1], "\u{FFFD}\u{FFFD}.example.com");
        assert_eq!(lines[2], "api.example.com");

        let store = MemoryStore::default();
        let summary = ingest_lines(&store, lines, "tool_x").unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.program_name, "example");
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let store = MemoryStore::default();
        let err = ingest(&store, "example.com", ["", "  "], "tool_x").unwrap_err();
        assert!(matches!(err, IngestError::EmptyInput));
        assert!(store.programs.borrow().is_empty());
    }

    #[test]
    fn test_batch_summary() {
        let store = MemoryStore::default();
        let summary = Ingestor::new(&store, "tool_x")
            .ingest_lines(["example.com", "api.example.com", "", "https://example.com/login"])
            .unwrap();

        assert_eq!(summary.program_name, "example");
        assert!(summary.program_created);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.new_targets, 3);
        let types: Vec<TargetType> = summary.lines.iter().map(|l| l.target_type).collect();
        assert_eq!(
            types,
            vec![TargetType::Domain, TargetType::Subdomain, TargetType::Url]
        );

        let observations = store.observations.borrow();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].tool, "tool_x");
        assert_eq!(observations[0].context.as_deref(), Some("Discovered via tool_x"));
    }

    #[test]
    fn test_repeat_line_reuses_target() {
        let store = MemoryStore::default();
        let summary = ingest(&store, "example.com", ["example.com", "example.com"], "tool_x").unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.new_targets, 1);
        assert_eq!(summary.lines[1].resolution, Resolution::Existing);
        assert_eq!(summary.lines[0].target_id, summary.lines[1].target_id);
        assert_eq!(store.targets.borrow().len(), 1);
        assert_eq!(store.observations.borrow().len(), 2);
    }

    #[test]
    fn test_only_first_line_names_the_program() {
        let store = MemoryStore::default();
        let summary = ingest_lines(&store, ["shop.acme.io", "https://other.org/x"], "gau").unwrap();
        assert_eq!(summary.program_name, "shop");
        assert_eq!(store.programs.borrow().len(), 1);
    }

    #[test]
    fn test_blank_organization_input_uses_first_line() {
        let store = MemoryStore::default();
        let summary = ingest(&store, "  ", ["api.example.com"], "tool_x").unwrap();
        assert_eq!(summary.program_name, "example");
    }

    #[test]
    fn test_failed_target_does_not_block_later_lines() {
        let store = MemoryStore {
            fail_target: Some("bad.example.com".to_string()),
            ..Default::default()
        };
        let summary = ingest(
            &store,
            "example.com",
            ["example.com", "bad.example.com", "api.example.com"],
            "tool_x",
        )
        .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 2);
        assert!(!summary.is_complete());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].line, "bad.example.com");
        assert_eq!(summary.failures[0].stage, LineStage::ResolveTarget);
        assert!(summary.failures[0].error.contains("disk I/O error"));
        assert_eq!(store.observations.borrow().len(), 2);
    }

    #[test]
    fn test_failed_observation_is_not_counted() {
        let store = MemoryStore {
            fail_observation: Some("example.com".to_string()),
            ..Default::default()
        };
        let summary = ingest(&store, "example.com", ["example.com"], "tool_x").unwrap();

        // The target row stays; only the line is reported as failed
        assert_eq!(store.targets.borrow().len(), 1);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failures[0].stage, LineStage::AppendObservation);
        assert!(matches!(
            summary.into_result(),
            Err(IngestError::AllTargetsFailed { total: 1 })
        ));
    }

    #[test]
    fn test_program_lookup_failure_is_fatal() {
        let store = MemoryStore {
            programs_down: true,
            ..Default::default()
        };
        let err = ingest(&store, "example.com", ["example.com"], "tool_x").unwrap_err();
        assert!(matches!(err, IngestError::StoreUnavailable(_)));
        assert!(err.to_string().contains("database is locked"));
    }

    #[test]
    fn test_processed_never_exceeds_total() {
        let store = MemoryStore {
            fail_target: Some("b.example.com".to_string()),
            ..Default::default()
        };
        let summary = ingest(
            &store,
            "",
            ["a.example.com", "b.example.com", "a.example.com", " ", "c.example.com"],
            "tool_x",
        )
        .unwrap();
        assert_eq!(summary.total, 4);
        assert!(summary.processed <= summary.total);
        assert_eq!(summary.processed + summary.failures.len(), summary.total);
    }
}
