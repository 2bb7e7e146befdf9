//! Data models for recon tracking

mod finding;
mod program;
mod recon_data;
mod target;

pub use finding::{Finding, FindingStatus, Severity};
pub use program::Program;
pub use recon_data::ReconData;
pub use target::{Target, TargetType};

use chrono::{DateTime, NaiveDateTime, Utc};

/// Same text layout SQLite uses for `CURRENT_TIMESTAMP`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp the way the `DATETIME` columns store it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `DATETIME` column value.
///
/// Accepts SQLite's `CURRENT_TIMESTAMP` form, fractional seconds, RFC 3339 and
/// offset-suffixed values (rows written by other tools).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
