//! Program model - one organization / bounty scope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bug bounty program, the anchor for every target of one organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Surrogate key (0 until inserted)
    pub id: i64,
    /// Unique organization name, e.g. "example"
    pub name: String,
    /// Program page
    pub url: Option<String>,
    /// Scope pattern, e.g. "*.example.com"
    pub scope: Option<String>,
    /// Free-text out-of-scope rules
    pub out_of_scope: Option<String>,
    pub bounty_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Program {
    /// Create a new program with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            url: None,
            scope: None,
            out_of_scope: None,
            bounty_notes: None,
            created_at: None,
        }
    }

    /// Set the scope pattern (builder pattern)
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the program URL (builder pattern)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_out_of_scope(mut self, out_of_scope: impl Into<String>) -> Self {
        self.out_of_scope = Some(out_of_scope.into());
        self
    }

    pub fn with_bounty_notes(mut self, notes: impl Into<String>) -> Self {
        self.bounty_notes = Some(notes.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let program = Program::new("example")
            .with_scope("*.example.com")
            .with_url("https://hackerone.com/example");

        assert_eq!(program.id, 0);
        assert_eq!(program.scope.as_deref(), Some("*.example.com"));
        assert_eq!(program.url.as_deref(), Some("https://hackerone.com/example"));
        assert!(program.out_of_scope.is_none());
    }
}
