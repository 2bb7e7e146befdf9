//! Observation model - one line of tool output tied to a target

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable provenance record (`recon_data` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconData {
    pub id: i64,
    pub target_id: i64,
    /// Source label of the producing tool
    pub tool: String,
    /// Raw line as received
    pub data: String,
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ReconData {
    pub fn new(target_id: i64, tool: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: 0,
            target_id,
            tool: tool.into(),
            data: data.into(),
            context: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
