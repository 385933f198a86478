//! Learned category patterns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached title-signature to category mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub signature: String,
    pub category_id: String,
    pub category_name: String,
    /// Stored confidence; automatic writes are capped at 99
    pub confidence: u8,
    /// Number of lookups and automatic writes that touched this pattern
    pub usage_count: i64,
    /// Set by manual corrections; automatic writes never clear it
    pub human_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearnedPattern {
    /// Mature patterns have been reused often enough to be trusted
    pub fn is_mature(&self, maturity_threshold: i64) -> bool {
        self.usage_count > maturity_threshold
    }
}

/// Aggregate view of the pattern table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternStats {
    pub total_patterns: i64,
    pub mature_patterns: i64,
    pub human_verified_patterns: i64,
    pub total_usage: i64,
}
