//! Confidence scoring
//!
//! Combines three signals into a 0-100 score:
//!
//! | signal      | contribution               | cap |
//! |-------------|----------------------------|-----|
//! | keyword     | 12 × summed match weight   | 60  |
//! | specificity | 5 × distinct matched terms | 20  |
//! | price fit   | 20 × fit (0.0-1.0)         | 20  |
//!
//! Pure and monotonic in each signal. Non-finite or negative inputs count
//! as zero.

use crate::catalog::PriceRange;

const KEYWORD_POINTS_PER_WEIGHT: f64 = 12.0;
const KEYWORD_CAP: f64 = 60.0;
const SPECIFICITY_POINTS_PER_TERM: f64 = 5.0;
const SPECIFICITY_CAP: f64 = 20.0;
const PRICE_POINTS: f64 = 20.0;

/// Price fit for categories that declare no range
pub const NEUTRAL_PRICE_FIT: f64 = 0.5;

/// Inputs to [`score`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreSignals {
    pub keyword_weight: f64,
    pub distinct_matches: usize,
    pub price_fit: f64,
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Score classification signals; always in 0..=100
pub fn score(signals: ScoreSignals) -> u8 {
    let keyword = (sanitize(signals.keyword_weight) * KEYWORD_POINTS_PER_WEIGHT).min(KEYWORD_CAP);
    let specificity =
        (signals.distinct_matches as f64 * SPECIFICITY_POINTS_PER_TERM).min(SPECIFICITY_CAP);
    let price = sanitize(signals.price_fit).min(1.0) * PRICE_POINTS;

    (keyword + specificity + price).round().clamp(0.0, 100.0) as u8
}

/// How well `price` fits a category's expected range
///
/// 1.0 inside the range. Outside, fit decays linearly with the distance
/// relative to the violated bound and reaches 0.0 at `tolerance`.
pub fn price_fit(price: i64, range: PriceRange, tolerance: f64) -> f64 {
    if range.is_unbounded() {
        return NEUTRAL_PRICE_FIT;
    }

    let price = price as f64;
    let relative_distance = match (range.min, range.max) {
        (Some(min), _) if price < min as f64 => (min as f64 - price) / (min as f64).max(1.0),
        (_, Some(max)) if price > max as f64 => (price - max as f64) / (max as f64).max(1.0),
        _ => return 1.0,
    };

    let tolerance = sanitize(tolerance);
    if tolerance == 0.0 {
        return 0.0;
    }
    (1.0 - relative_distance / tolerance).clamp(0.0, 1.0)
}
