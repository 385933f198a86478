//! Learned pattern store
//!
//! Self-reinforcing cache in front of Stage 1: a title whose signature was
//! classified before is answered from the cache, and every hit raises the
//! confidence it reports. Manual corrections pin a pattern at 100 and are
//! never overwritten by automatic learning.

use sqlx::SqlitePool;

use crate::db::patterns::{self, PatternWrite};
use crate::models::{
    CategoryCandidate, LearnedPattern, PatternStats, AUTO_CONFIDENCE_CEILING,
    HUMAN_VERIFIED_CONFIDENCE,
};

/// Confidence reported for a cache hit
///
/// Human-verified patterns report 100. Others add `floor(5 * log2(usage))`
/// to the stored confidence, capped at 99.
pub fn hit_confidence(pattern: &LearnedPattern) -> u8 {
    if pattern.human_verified {
        return HUMAN_VERIFIED_CONFIDENCE;
    }
    let usage = pattern.usage_count.max(1) as f64;
    let boost = (5.0 * usage.log2()).floor().max(0.0) as u32;
    (u32::from(pattern.confidence) + boost).min(u32::from(AUTO_CONFIDENCE_CEILING)) as u8
}

/// Pattern cache backed by the `learned_patterns` table
#[derive(Debug, Clone)]
pub struct LearnedPatternStore {
    db: SqlitePool,
    max_lock_wait_ms: u64,
}

impl LearnedPatternStore {
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            max_lock_wait_ms,
        }
    }

    /// Look up a signature, counting the hit atomically
    pub async fn lookup(&self, signature: &str) -> resale_common::Result<Option<LearnedPattern>> {
        patterns::lookup_and_touch(&self.db, signature, self.max_lock_wait_ms).await
    }

    /// Store an automatic Stage 1 outcome
    ///
    /// The uncategorized sentinel is never cached: an unknown title stays a
    /// miss so later catalog improvements can classify it.
    pub async fn record_automatic(
        &self,
        signature: &str,
        candidate: &CategoryCandidate,
    ) -> resale_common::Result<Option<LearnedPattern>> {
        let Some(category_id) = candidate.category_id.as_deref() else {
            return Ok(None);
        };
        let write = PatternWrite {
            signature,
            category_id,
            category_name: candidate.category_name.as_deref().unwrap_or_default(),
            confidence: candidate.confidence.min(AUTO_CONFIDENCE_CEILING),
            human_verified: false,
        };
        patterns::upsert_pattern(&self.db, &write, self.max_lock_wait_ms)
            .await
            .map(Some)
    }

    /// Store a manual correction; always wins and is idempotent
    pub async fn record_manual(
        &self,
        signature: &str,
        category_id: &str,
        category_name: &str,
    ) -> resale_common::Result<LearnedPattern> {
        let write = PatternWrite {
            signature,
            category_id,
            category_name,
            confidence: HUMAN_VERIFIED_CONFIDENCE,
            human_verified: true,
        };
        patterns::upsert_pattern(&self.db, &write, self.max_lock_wait_ms).await
    }

    pub async fn stats(&self, maturity_threshold: i64) -> resale_common::Result<PatternStats> {
        patterns::pattern_stats(&self.db, maturity_threshold).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database_pool;
    use chrono::Utc;
    use tempfile::TempDir;

    fn pattern(confidence: u8, usage_count: i64, human_verified: bool) -> LearnedPattern {
        LearnedPattern {
            signature: "sig".into(),
            category_id: "31388".into(),
            category_name: "Digital Cameras".into(),
            confidence,
            usage_count,
            human_verified,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_hit_confidence_grows_with_usage() {
        assert_eq!(hit_confidence(&pattern(70, 1, false)), 70);
        assert_eq!(hit_confidence(&pattern(70, 2, false)), 75);
        assert_eq!(hit_confidence(&pattern(70, 8, false)), 85);
        assert_eq!(hit_confidence(&pattern(95, 1024, false)), 99);
        assert_eq!(hit_confidence(&pattern(40, 1, true)), 100);
    }

    #[test]
    fn test_hit_confidence_monotonic() {
        let mut last = 0;
        for usage in 1..200 {
            let c = hit_confidence(&pattern(50, usage, false));
            assert!(c >= last);
            last = c;
        }
    }

    #[tokio::test]
    async fn test_sentinel_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database_pool(&temp_dir.path().join("resale.db")).await.unwrap();
        let store = LearnedPatternStore::new(pool, 1000);

        let stored = store
            .record_automatic("sig", &CategoryCandidate::uncategorized())
            .await
            .unwrap();
        assert!(stored.is_none());
        assert!(store.lookup("sig").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_correction_pins_category() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database_pool(&temp_dir.path().join("resale.db")).await.unwrap();
        let store = LearnedPatternStore::new(pool, 1000);

        let candidate = CategoryCandidate {
            category_id: Some("31388".into()),
            category_name: Some("Digital Cameras".into()),
            confidence: 99,
            matched_keywords: vec![],
        };
        store.record_automatic("sig", &candidate).await.unwrap();
        store.record_manual("sig", "293", "Consumer Electronics").await.unwrap();
        store.record_automatic("sig", &candidate).await.unwrap();

        let hit = store.lookup("sig").await.unwrap().unwrap();
        assert_eq!(hit.category_id, "293");
        assert_eq!(hit_confidence(&hit), 100);
    }
}
