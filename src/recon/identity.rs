//! Organization identity derived from a raw recon line
//!
//! `https://www.example.com/login` and `api.example.com` both belong to the
//! program named `example`. The scope pattern keeps every label except a
//! leading `www.`, so `api.example.com` yields `*.api.example.com`. This does
//! not match the name rule; existing databases already hold scopes built this
//! way, so it stays.
//!
//! Only URLs lose their path before the scope is built. A scheme-less line
//! such as `example.com/login` is kept whole (`*.example.com/login`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Scheme prefix and host part of a line
static HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:https?://)?([^/]*)").expect("valid host regex"));

/// Host of the first http(s) URL in a line
static URL_HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://([^/]+)").expect("valid url host regex"));

/// Conventional subdomains dropped before picking the organization label, in priority order
const CONVENTIONAL_PREFIXES: [&str; 5] = ["www.", "api.", "app.", "dev.", "test."];

/// Identity of the program a batch belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    /// Program name, e.g. "example"
    pub name: String,
    /// Scope pattern stored on newly created programs, e.g. "*.example.com"
    pub scope: String,
}

/// Strip the scheme and everything from the first `/`
fn bare_host(raw: &str) -> &str {
    HOST_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Part of the line the scope pattern is built from: the URL host for lines
/// with a scheme, otherwise the line unchanged
fn scope_base(raw: &str) -> &str {
    if !raw.contains("://") {
        return raw;
    }
    URL_HOST_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Derive the organization name and scope pattern for a raw input line.
///
/// Never fails: input without a usable host falls back to the raw string.
pub fn extract_organization(raw: &str) -> Organization {
    let raw = raw.trim();
    let host = bare_host(raw);
    if host.is_empty() {
        return Organization {
            name: raw.to_string(),
            scope: format!("*.{raw}"),
        };
    }

    let lowered = host.to_lowercase();
    let stripped = CONVENTIONAL_PREFIXES
        .iter()
        .find_map(|prefix| lowered.strip_prefix(prefix))
        .unwrap_or(&lowered);

    let labels: Vec<&str> = stripped.split('.').collect();
    let name = if labels.len() >= 2 {
        labels[0]
    } else {
        stripped
    };
    let name = if name.is_empty() { stripped } else { name };

    let base = scope_base(raw);
    let scope_host = base.strip_prefix("www.").unwrap_or(base);

    Organization {
        name: name.to_string(),
        scope: format!("*.{scope_host}"),
    }
}
