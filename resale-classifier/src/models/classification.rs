//! Classification outputs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest confidence the automatic path may report; 100 is reserved for
/// human-verified patterns.
pub const AUTO_CONFIDENCE_CEILING: u8 = 99;

/// Confidence reported for human-verified patterns
pub const HUMAN_VERIFIED_CONFIDENCE: u8 = 100;

/// Stage 1 output for one classification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCandidate {
    /// `None` for the uncategorized sentinel
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub confidence: u8,
    pub matched_keywords: Vec<String>,
}

impl CategoryCandidate {
    /// Returned when no category clears the confidence floor
    pub fn uncategorized() -> Self {
        Self {
            category_id: None,
            category_name: None,
            confidence: 0,
            matched_keywords: Vec::new(),
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category_id.is_none()
    }
}

/// How a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    /// Keyword heuristics (cache miss)
    Heuristic,
    /// Automatic learned-pattern cache hit
    Learned,
    /// Manual correction cache hit
    HumanVerified,
    /// Stage 2 refined a Stage 1 or cached result
    LearnedAndRefined,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::Heuristic => "heuristic",
            ClassificationMethod::Learned => "learned",
            ClassificationMethod::HumanVerified => "human_verified",
            ClassificationMethod::LearnedAndRefined => "learned_and_refined",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heuristic" => Ok(ClassificationMethod::Heuristic),
            "learned" => Ok(ClassificationMethod::Learned),
            "human_verified" => Ok(ClassificationMethod::HumanVerified),
            "learned_and_refined" => Ok(ClassificationMethod::LearnedAndRefined),
            other => Err(format!("unknown classification method: {}", other)),
        }
    }
}

/// Result returned to callers; the learned pattern is the durable artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub confidence: u8,
    pub method: ClassificationMethod,
    pub matched_keywords: Vec<String>,
    /// Historical margin of the matching bootstrap pattern, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,
    /// Estimated profit at this price, minor units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_potential: Option<i64>,
    /// Stage 2 confidence minus Stage 1 confidence; may be negative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_improvement: Option<i32>,
}

impl ClassificationResult {
    pub fn from_candidate(candidate: CategoryCandidate, method: ClassificationMethod) -> Self {
        Self {
            category_id: candidate.category_id,
            category_name: candidate.category_name,
            confidence: candidate.confidence,
            method,
            matched_keywords: candidate.matched_keywords,
            profit_margin: None,
            profit_potential: None,
            confidence_improvement: None,
        }
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category_id.is_none()
    }

    pub fn is_human_verified(&self) -> bool {
        self.method == ClassificationMethod::HumanVerified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_string_roundtrip() {
        for method in [
            ClassificationMethod::Heuristic,
            ClassificationMethod::Learned,
            ClassificationMethod::HumanVerified,
            ClassificationMethod::LearnedAndRefined,
        ] {
            assert_eq!(method.as_str().parse::<ClassificationMethod>().unwrap(), method);
            assert_eq!(
                serde_json::to_value(method).unwrap(),
                serde_json::Value::String(method.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_optional_stage2_fields_omitted() {
        let result = ClassificationResult::from_candidate(
            CategoryCandidate::uncategorized(),
            ClassificationMethod::Heuristic,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("profit_margin").is_none());
        assert!(json.get("confidence_improvement").is_none());
        assert_eq!(json["category_id"], serde_json::Value::Null);
        assert_eq!(json["confidence"], 0);
    }
}
