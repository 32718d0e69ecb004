//! Per-response scoring along four orthogonal axes.
//!
//! Each valid response is scored against the consensus verdict and its
//! peers: accuracy, confidence calibration, consistency with
//! high-confidence peers, and source quality. The four sub-scores combine
//! via configured weights into a single value in [0, 1].

use serde::{Deserialize, Serialize};
use tracing::warn;
use veritensor_core::{MinerResponse, Resolution};

/// Substrings identifying sources with an established track record.
const RELIABLE_SOURCES: [&str; 8] = [
    "coingecko",
    "coinmarketcap",
    "yahoo",
    "bloomberg",
    "reuters",
    "binance",
    "coinbase",
    "kraken",
];

/// Confidence above which a peer counts toward the consistency score.
const HIGH_CONFIDENCE_THRESHOLD: f64 = 80.0;
/// Source count at which the count component saturates.
const SOURCE_COUNT_SATURATION: f64 = 3.0;
/// Reliable-source count at which the reliability component saturates.
const RELIABLE_SOURCE_SATURATION: f64 = 2.0;

/// Sub-score weights for response scoring.
///
/// Weights are renormalized to sum to 1 via [`ScoringConfig::normalized`];
/// the raw values only express relative importance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub accuracy_weight: f64,
    pub confidence_weight: f64,
    pub consistency_weight: f64,
    pub source_quality_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            accuracy_weight: 0.4,       // agreement with consensus
            confidence_weight: 0.2,     // calibration of self-reported confidence
            consistency_weight: 0.3,    // agreement with high-confidence peers
            source_quality_weight: 0.1, // citation count and reliability
        }
    }
}

impl ScoringConfig {
    /// Renormalize the four weights to sum to 1. An all-zero configuration
    /// cannot express any preference and falls back to the defaults.
    pub fn normalized(self) -> Self {
        let total = self.accuracy_weight
            + self.confidence_weight
            + self.consistency_weight
            + self.source_quality_weight;
        if total <= 0.0 {
            warn!("All scoring weights are zero, substituting defaults");
            return Self::default();
        }
        Self {
            accuracy_weight: self.accuracy_weight / total,
            confidence_weight: self.confidence_weight / total,
            consistency_weight: self.consistency_weight / total,
            source_quality_weight: self.source_quality_weight / total,
        }
    }
}

/// Combined score for the response at `index` within `all`, in [0, 1].
///
/// `config` is expected to be normalized; the output is clamped either way.
pub fn score_response(
    response: &MinerResponse,
    index: usize,
    all: &[MinerResponse],
    consensus: Option<Resolution>,
    config: &ScoringConfig,
) -> f64 {
    let score = accuracy_score(response, consensus) * config.accuracy_weight
        + confidence_score(response, consensus) * config.confidence_weight
        + consistency_score(response, index, all) * config.consistency_weight
        + source_quality_score(response) * config.source_quality_weight;

    score.clamp(0.0, 1.0)
}

/// Agreement with the consensus verdict. A `Pending` verdict is partial
/// credit no matter what the network concluded (declared uncertainty is
/// never fully right or fully wrong); an absent consensus scores everyone
/// neutrally.
pub fn accuracy_score(response: &MinerResponse, consensus: Option<Resolution>) -> f64 {
    match consensus {
        None => 0.5,
        Some(_) if response.resolution == Resolution::Pending => 0.5,
        Some(c) if response.resolution == c => 1.0,
        Some(_) => 0.0,
    }
}

/// Calibration of self-reported confidence.
///
/// Correct verdicts are rewarded in proportion to confidence, `Pending`
/// is rewarded for sitting near 50, and confident wrongness is punished.
pub fn confidence_score(response: &MinerResponse, consensus: Option<Resolution>) -> f64 {
    let confidence = response.confidence / 100.0;

    if response.resolution == Resolution::Pending {
        1.0 - (confidence - 0.5).abs()
    } else if consensus == Some(response.resolution) {
        confidence
    } else {
        1.0 - confidence
    }
}

/// Fraction of high-confidence peers (confidence > 80, excluding the
/// response itself) sharing this response's verdict. With no such peers
/// there is nothing to disagree with.
pub fn consistency_score(response: &MinerResponse, index: usize, all: &[MinerResponse]) -> f64 {
    let mut peers = 0usize;
    let mut agreements = 0usize;
    for (i, peer) in all.iter().enumerate() {
        if i == index || peer.confidence <= HIGH_CONFIDENCE_THRESHOLD {
            continue;
        }
        peers += 1;
        if peer.resolution == response.resolution {
            agreements += 1;
        }
    }

    if peers == 0 {
        1.0
    } else {
        agreements as f64 / peers as f64
    }
}

/// Citation quality: half from source count (saturating at 3), half from
/// reliable-source hits (substring match, saturating at 2).
pub fn source_quality_score(response: &MinerResponse) -> f64 {
    if response.sources.is_empty() {
        return 0.0;
    }

    let count_score = (response.sources.len() as f64 / SOURCE_COUNT_SATURATION).min(1.0);

    let reliable = response
        .sources
        .iter()
        .filter(|source| {
            let source = source.to_lowercase();
            RELIABLE_SOURCES.iter().any(|known| source.contains(known))
        })
        .count();
    let reliability_score = (reliable as f64 / RELIABLE_SOURCE_SATURATION).min(1.0);

    (count_score + reliability_score) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(resolution: Resolution, confidence: f64, sources: &[&str]) -> MinerResponse {
        MinerResponse::new(
            Some(0),
            resolution,
            confidence,
            "summary",
            sources.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_default_weights_normalize_to_identity() {
        let config = ScoringConfig::default().normalized();
        assert!((config.accuracy_weight - 0.4).abs() < 1e-12);
        assert!((config.confidence_weight - 0.2).abs() < 1e-12);
        assert!((config.consistency_weight - 0.3).abs() < 1e-12);
        assert!((config.source_quality_weight - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_unnormalized_weights_are_rescaled() {
        let config = ScoringConfig {
            accuracy_weight: 4.0,
            confidence_weight: 2.0,
            consistency_weight: 3.0,
            source_quality_weight: 1.0,
        }
        .normalized();
        let total = config.accuracy_weight
            + config.confidence_weight
            + config.consistency_weight
            + config.source_quality_weight;
        assert!((total - 1.0).abs() < 1e-12);
        assert!((config.accuracy_weight - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_weights_fall_back_to_defaults() {
        let config = ScoringConfig {
            accuracy_weight: 0.0,
            confidence_weight: 0.0,
            consistency_weight: 0.0,
            source_quality_weight: 0.0,
        }
        .normalized();
        assert!((config.accuracy_weight - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_agree_beats_disagree() {
        let agreeing = response(Resolution::True, 80.0, &[]);
        let pending = response(Resolution::Pending, 80.0, &[]);
        let disagreeing = response(Resolution::False, 80.0, &[]);
        let consensus = Some(Resolution::True);

        assert_eq!(accuracy_score(&agreeing, consensus), 1.0);
        assert_eq!(accuracy_score(&pending, consensus), 0.5);
        assert_eq!(accuracy_score(&disagreeing, consensus), 0.0);
        assert!(accuracy_score(&agreeing, consensus) > accuracy_score(&disagreeing, consensus));
    }

    #[test]
    fn test_accuracy_without_consensus_is_neutral() {
        let r = response(Resolution::True, 80.0, &[]);
        assert_eq!(accuracy_score(&r, None), 0.5);
    }

    #[test]
    fn test_confidence_rewards_correct_conviction() {
        let r = response(Resolution::True, 90.0, &[]);
        assert!((confidence_score(&r, Some(Resolution::True)) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_punishes_confident_wrongness() {
        let r = response(Resolution::False, 60.0, &[]);
        assert!((confidence_score(&r, Some(Resolution::True)) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_rewards_calibrated_uncertainty() {
        let centered = response(Resolution::Pending, 50.0, &[]);
        assert_eq!(confidence_score(&centered, Some(Resolution::True)), 1.0);

        let overconfident = response(Resolution::Pending, 95.0, &[]);
        assert!((confidence_score(&overconfident, Some(Resolution::True)) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_pending_under_pending_consensus_stays_partial() {
        // Declared uncertainty never earns full accuracy, even when the
        // network itself concluded PENDING; confidence is judged on
        // calibration instead.
        let r = response(Resolution::Pending, 50.0, &[]);
        assert_eq!(accuracy_score(&r, Some(Resolution::Pending)), 0.5);
        assert_eq!(confidence_score(&r, Some(Resolution::Pending)), 1.0);
    }

    #[test]
    fn test_consistency_with_no_high_confidence_peers() {
        let all = vec![
            response(Resolution::True, 70.0, &[]),
            response(Resolution::False, 80.0, &[]), // exactly 80 does not count
        ];
        assert_eq!(consistency_score(&all[0], 0, &all), 1.0);
    }

    #[test]
    fn test_consistency_fraction_of_agreeing_peers() {
        let all = vec![
            response(Resolution::True, 70.0, &[]),
            response(Resolution::True, 90.0, &[]),
            response(Resolution::False, 85.0, &[]),
        ];
        // Peers of [0]: two high-confidence, one agrees.
        assert!((consistency_score(&all[0], 0, &all) - 0.5).abs() < 1e-12);
        // Peers of [1]: only [2] (high-confidence), disagrees.
        assert_eq!(consistency_score(&all[1], 1, &all), 0.0);
    }

    #[test]
    fn test_consistency_excludes_self() {
        let all = vec![response(Resolution::True, 95.0, &[])];
        // The lone high-confidence response is itself: no peers.
        assert_eq!(consistency_score(&all[0], 0, &all), 1.0);
    }

    #[test]
    fn test_source_quality_no_sources() {
        let r = response(Resolution::True, 80.0, &[]);
        assert_eq!(source_quality_score(&r), 0.0);
    }

    #[test]
    fn test_source_quality_single_reliable_source() {
        let r = response(Resolution::True, 80.0, &["https://www.coingecko.com/btc"]);
        // count: 1/3, reliability: 1/2 -> (0.333 + 0.5) / 2
        let expected = (1.0 / 3.0 + 0.5) / 2.0;
        assert!((source_quality_score(&r) - expected).abs() < 1e-12);
        assert!(source_quality_score(&r) < 1.0);
    }

    #[test]
    fn test_source_quality_saturates() {
        let r = response(
            Resolution::True,
            80.0,
            &["coingecko.com", "binance.com", "reuters.com", "blog.example.org"],
        );
        assert_eq!(source_quality_score(&r), 1.0);
    }

    #[test]
    fn test_source_quality_case_insensitive_match() {
        let r = response(Resolution::True, 80.0, &["WWW.Bloomberg.COM/markets"]);
        let expected = (1.0 / 3.0 + 0.5) / 2.0;
        assert!((source_quality_score(&r) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_combined_score_in_unit_range() {
        let all = vec![
            response(Resolution::True, 90.0, &["coingecko.com"]),
            response(Resolution::False, 100.0, &[]),
        ];
        let config = ScoringConfig::default().normalized();
        for (i, r) in all.iter().enumerate() {
            let score = score_response(r, i, &all, Some(Resolution::True), &config);
            assert!((0.0..=1.0).contains(&score));
        }
    }
}
