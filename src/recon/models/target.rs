//! Target model - a single addressable asset under a program

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target taxonomy assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// `example.com`
    Domain,
    /// `api.example.com`
    Subdomain,
    /// `https://example.com/login`
    Url,
    /// `10.0.0.1:8080`
    IpPort,
    Unknown,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Domain => "domain",
            TargetType::Subdomain => "subdomain",
            TargetType::Url => "url",
            TargetType::IpPort => "ip_port",
            TargetType::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "domain" => Some(TargetType::Domain),
            "subdomain" => Some(TargetType::Subdomain),
            "url" => Some(TargetType::Url),
            "ip_port" | "ipport" => Some(TargetType::IpPort),
            "unknown" => Some(TargetType::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Surrogate key (0 until inserted)
    pub id: i64,
    pub program_id: i64,
    /// Raw target string exactly as it was ingested
    pub target: String,
    pub target_type: TargetType,
    /// Tool that first reported this target
    pub source: Option<String>,
    pub alive: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub tested: bool,
    pub tested_date: Option<DateTime<Utc>>,
    pub test_notes: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Target {
    /// Create a new target with minimal required fields
    pub fn new(program_id: i64, target: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            id: 0,
            program_id,
            target: target.into(),
            target_type,
            source: None,
            alive: false,
            last_checked: None,
            tested: false,
            tested_date: None,
            test_notes: None,
            notes: None,
            created_at: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_last_checked(mut self, ts: DateTime<Utc>) -> Self {
        self.last_checked = Some(ts);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Record a manual test pass
    pub fn mark_tested(&mut self, notes: Option<String>) {
        self.tested = true;
        self.tested_date = Some(Utc::now());
        self.test_notes = notes;
    }
}
