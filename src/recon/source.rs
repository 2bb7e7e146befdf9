//! Source label resolution
//!
//! The label names whatever produced the batch and is stored verbatim on
//! targets and observations. It is never interpreted, so `httprobe` stays
//! `httprobe` even though it looks like `httpx`.

/// Label used when nothing else names the producing tool
pub const DEFAULT_SOURCE_LABEL: &str = "pipeline_auto";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Pick the source label for a batch.
///
/// `explicit` comes from the command line or environment, `configured` from
/// the config file. Blank values are ignored; the first non-blank one is used
/// as-is after trimming.
pub fn resolve_source_label(explicit: Option<&str>, configured: Option<&str>) -> String {
    non_blank(explicit)
        .or_else(|| non_blank(configured))
        .unwrap_or(DEFAULT_SOURCE_LABEL)
        .to_string()
}
