//! Stage 1: keyword heuristic classification
//!
//! Every catalog category is scored against the normalized title; the best
//! scoring category wins if it clears the confidence floor. Read-only over
//! the catalog, so one classifier is shared by all requests and workers.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::catalog::{CatalogSet, CategoryRule};
use crate::models::{CategoryCandidate, ClassifierParameters, ProductDescriptor, AUTO_CONFIDENCE_CEILING};
use crate::services::confidence_scorer::{self, ScoreSignals};
use crate::services::title_normalizer::{normalize_text, NormalizedTitle};

/// Weight added when the product's brand belongs to the category
pub const BRAND_HINT_WEIGHT: f64 = 2.0;

/// Weight added when the source-site category aliases the category
pub const SOURCE_CATEGORY_HINT_WEIGHT: f64 = 1.5;

/// Stage 1 classifier
#[derive(Debug, Clone)]
pub struct KeywordHeuristicClassifier {
    catalog: Arc<CatalogSet>,
}

struct Scored<'a> {
    category: &'a CategoryRule,
    confidence: u8,
    matched: Vec<String>,
}

impl KeywordHeuristicClassifier {
    pub fn new(catalog: Arc<CatalogSet>) -> Self {
        Self { catalog }
    }

    /// Pick the best category for `product`
    ///
    /// Returns the uncategorized sentinel when nothing matches or the best
    /// confidence is below `params.min_confidence_floor`.
    pub fn classify(
        &self,
        product: &ProductDescriptor,
        params: &ClassifierParameters,
    ) -> CategoryCandidate {
        let title = NormalizedTitle::new(&product.title);
        if title.is_empty() {
            return CategoryCandidate::uncategorized();
        }
        let brand = product.brand.as_deref().map(normalize_text);
        let source = product.source_category.as_deref().map(NormalizedTitle::new);

        let best = self
            .catalog
            .keywords
            .iter()
            .filter_map(|category| {
                score_category(
                    category,
                    &title,
                    brand.as_deref(),
                    source.as_ref(),
                    product.price_minor_units,
                    params.price_tolerance,
                )
            })
            .min_by(rank);

        match best {
            Some(scored) if scored.confidence >= params.min_confidence_floor => {
                tracing::debug!(
                    category_id = %scored.category.id,
                    confidence = scored.confidence,
                    matched = scored.matched.len(),
                    "Stage 1 match"
                );
                CategoryCandidate {
                    category_id: Some(scored.category.id.clone()),
                    category_name: Some(scored.category.name.clone()),
                    confidence: scored.confidence,
                    matched_keywords: scored.matched,
                }
            }
            _ => CategoryCandidate::uncategorized(),
        }
    }
}

/// Higher confidence first, then more matched keywords, then smaller id
fn rank(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then_with(|| b.matched.len().cmp(&a.matched.len()))
        .then_with(|| a.category.id.cmp(&b.category.id))
}

fn score_category<'a>(
    category: &'a CategoryRule,
    title: &NormalizedTitle,
    brand: Option<&str>,
    source: Option<&NormalizedTitle>,
    price: i64,
    price_tolerance: f64,
) -> Option<Scored<'a>> {
    let mut matched: Vec<String> = Vec::new();
    let mut weight = 0.0;

    for keyword in &category.keywords {
        if title.contains_term(&keyword.term) && !matched.contains(&keyword.term) {
            matched.push(keyword.term.clone());
            weight += keyword.weight;
        }
    }

    let source_hit = source.is_some_and(|source| {
        category
            .source_categories
            .iter()
            .any(|alias| source.contains_term(alias))
    });

    // Brand alone is too weak: "sony" spans cameras, consoles and headphones
    if matched.is_empty() && !source_hit {
        return None;
    }

    if source_hit {
        weight += SOURCE_CATEGORY_HINT_WEIGHT;
    }

    let brand_hit = category.brands.iter().any(|candidate| {
        brand.is_some_and(|b| b == candidate) || title.contains_term(candidate)
    });
    if brand_hit {
        weight += BRAND_HINT_WEIGHT;
    }

    let fit = confidence_scorer::price_fit(price, category.price_range(), price_tolerance);
    let confidence = confidence_scorer::score(ScoreSignals {
        keyword_weight: weight,
        distinct_matches: matched.len(),
        price_fit: fit,
    })
    .min(AUTO_CONFIDENCE_CEILING);

    Some(Scored {
        category,
        confidence,
        matched,
    })
}
