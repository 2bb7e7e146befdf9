//! Finding model - vulnerability records attached to a target
//!
//! Ingestion never writes findings; they are created by downstream analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "critical" | "crit" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "med" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" | "informational" => Some(Severity::Info),
            _ => None,
        }
    }
}

/// Report lifecycle of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Open,
    InReview,
    Triaged,
    Resolved,
    Duplicate,
    WontFix,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Open => "open",
            FindingStatus::InReview => "in_review",
            FindingStatus::Triaged => "triaged",
            FindingStatus::Resolved => "resolved",
            FindingStatus::Duplicate => "duplicate",
            FindingStatus::WontFix => "wont_fix",
        }
    }

    /// Also accepts the display forms older databases stored ("In Review", "Won't Fix")
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Some(FindingStatus::Open),
            "in_review" | "in review" | "review" => Some(FindingStatus::InReview),
            "triaged" => Some(FindingStatus::Triaged),
            "resolved" => Some(FindingStatus::Resolved),
            "duplicate" | "dupe" => Some(FindingStatus::Duplicate),
            "wont_fix" | "won't fix" | "wontfix" => Some(FindingStatus::WontFix),
            _ => None,
        }
    }

    /// Returns true if no more action is expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FindingStatus::Resolved | FindingStatus::Duplicate | FindingStatus::WontFix
        )
    }
}

/// A security finding on one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: i64,
    pub target_id: i64,
    pub title: String,
    /// Vulnerability class, e.g. "xss"
    pub finding_type: Option<String>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub proof_of_concept: Option<String>,
    pub status: FindingStatus,
    pub reported_date: Option<DateTime<Utc>>,
    /// Platform report identifier
    pub report_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Finding {
    /// Create a new finding with minimal required fields
    pub fn new(target_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            target_id,
            title: title.into(),
            finding_type: None,
            severity: None,
            description: None,
            proof_of_concept: None,
            status: FindingStatus::Open,
            reported_date: None,
            report_id: None,
            notes: None,
            created_at: None,
        }
    }

    // Builder methods
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_status(mut self, status: FindingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_type(mut self, finding_type: impl Into<String>) -> Self {
        self.finding_type = Some(finding_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_proof_of_concept(mut self, poc: impl Into<String>) -> Self {
        self.proof_of_concept = Some(poc.into());
        self
    }

    /// Record a submission to the platform
    pub fn reported(mut self, report_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.report_id = Some(report_id.into());
        self.reported_date = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_builder() {
        let finding = Finding::new(3, "Reflected XSS in search")
            .with_severity(Severity::Medium)
            .with_type("xss")
            .with_proof_of_concept("/search?q=<script>alert(1)</script>");

        assert_eq!(finding.status, FindingStatus::Open);
        assert_eq!(finding.severity, Some(Severity::Medium));
        assert_eq!(finding.finding_type.as_deref(), Some("xss"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(FindingStatus::from_str("open"), Some(FindingStatus::Open));
        assert_eq!(FindingStatus::from_str("Open"), Some(FindingStatus::Open));
        assert_eq!(
            FindingStatus::from_str("In Review"),
            Some(FindingStatus::InReview)
        );
        assert_eq!(
            FindingStatus::from_str("Won't Fix"),
            Some(FindingStatus::WontFix)
        );
        assert_eq!(FindingStatus::from_str("paid"), None);
    }

    #[test]
    fn test_terminal_status() {
        assert!(FindingStatus::Resolved.is_terminal());
        assert!(FindingStatus::Duplicate.is_terminal());
        assert!(!FindingStatus::Open.is_terminal());
        assert!(!FindingStatus::Triaged.is_terminal());
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!(Severity::from_str("CRIT"), Some(Severity::Critical));
        assert_eq!(Severity::from_str("informational"), Some(Severity::Info));
        assert_eq!(Severity::from_str("p1"), None);
    }
}
