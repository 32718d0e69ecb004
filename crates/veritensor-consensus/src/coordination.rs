//! Coordination detection within a same-coldkey response group.
//!
//! Three indicators are combined: verdict agreement, confidence-variance
//! collapse, and summary text similarity. Each alone is weak evidence (a
//! genuine group may agree on an obvious verdict, or have natural
//! confidence spread); only the combination is penalized heavily.

use crate::similarity::pairwise_mean_similarity;
use tracing::warn;
use veritensor_core::MinerResponse;

/// Indicator weight for near-unanimous verdict agreement.
const AGREEMENT_WEIGHT: f64 = 0.4;
/// Agreement rate at which the indicator activates.
const AGREEMENT_THRESHOLD: f64 = 0.9;
/// Indicator weight for collapsed confidence variance.
const VARIANCE_WEIGHT: f64 = 0.3;
/// Population standard deviation below which the indicator activates.
const VARIANCE_THRESHOLD: f64 = 5.0;
/// Indicator weight for near-identical summaries.
const SIMILARITY_WEIGHT: f64 = 0.3;
/// Mean pairwise similarity above which the indicator activates.
const SIMILARITY_THRESHOLD: f64 = 0.7;
/// Penalty above which the group is reported as coordinated.
const DETECTION_THRESHOLD: f64 = 0.3;

/// Coordination penalty in [0, 1] for a group of responses sharing one
/// coldkey. A single response can never look coordinated and scores 0.
pub fn coordination_penalty(responses: &[MinerResponse], coldkey: &str) -> f64 {
    if responses.len() < 2 {
        return 0.0;
    }

    let n = responses.len() as f64;

    let agreement = responses
        .iter()
        .filter(|r| r.resolution == responses[0].resolution)
        .count() as f64
        / n;

    let mean = responses.iter().map(|r| r.confidence).sum::<f64>() / n;
    let variance = responses
        .iter()
        .map(|r| (r.confidence - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    let summaries: Vec<String> = responses.iter().map(|r| r.summary.to_lowercase()).collect();
    let similarity = pairwise_mean_similarity(&summaries);

    let mut penalty = 0.0;
    if agreement >= AGREEMENT_THRESHOLD {
        penalty += AGREEMENT_WEIGHT * agreement;
    }
    if std_dev < VARIANCE_THRESHOLD {
        penalty += VARIANCE_WEIGHT * (1.0 - std_dev / VARIANCE_THRESHOLD);
    }
    if similarity > SIMILARITY_THRESHOLD {
        penalty += SIMILARITY_WEIGHT * similarity;
    }
    let penalty = penalty.min(1.0);

    if penalty > DETECTION_THRESHOLD {
        warn!(
            "Coordination detected for coldkey {}: {} miners, agreement {:.2}, conf std {:.2}, similarity {:.2}, penalty {:.2}",
            short_key(coldkey),
            responses.len(),
            agreement,
            std_dev,
            similarity,
            penalty
        );
    }

    penalty
}

/// Truncated coldkey prefix for log lines.
pub(crate) fn short_key(coldkey: &str) -> String {
    let prefix: String = coldkey.chars().take(12).collect();
    if prefix.len() < coldkey.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}
