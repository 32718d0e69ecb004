//! Weights calculator: the end-to-end aggregation pipeline and the
//! rolling per-miner score accumulator.
//!
//! One `WeightsCalculator` lives for the validator's process lifetime. An
//! aggregation pass is a pure function of `(responses, network view, RNG
//! state)`; the accumulator is the only mutable state and is guarded so
//! passes may run from concurrent tasks.

use crate::consensus::weighted_consensus;
use crate::scoring::{score_response, ScoringConfig};
use crate::sybil::{apply_coldkey_cap, apply_stake_buckets, apply_volume_filter};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};
use veritensor_core::{
    MinerResponse, NetworkView, ProtectionTier, Resolution, Statement, ValidationResult,
};

/// Scores retained per miner for long-run weight computation.
const SCORE_WINDOW: usize = 100;
/// Representative sources retained on a validation result.
const MAX_CONSENSUS_SOURCES: usize = 10;

/// Calculates consensus verdicts and miner weights from responses.
pub struct WeightsCalculator {
    config: ScoringConfig,
    /// Rolling window of recent normalized scores per miner UID.
    accumulated_scores: RwLock<HashMap<u64, VecDeque<f64>>>,
    /// Injected randomness for filter subsampling. Seeded in tests so
    /// aggregation is reproducible end to end.
    rng: Mutex<StdRng>,
}

impl WeightsCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Calculator with a pinned RNG seed; subsampling in the Sybil filters
    /// becomes reproducible.
    pub fn with_seed(config: ScoringConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ScoringConfig, rng: StdRng) -> Self {
        Self {
            config: config.normalized(),
            accumulated_scores: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Aggregate one statement's responses into a consensus verdict and a
    /// normalized score map, and fold the scores into the accumulator.
    pub fn calculate_consensus(
        &self,
        statement: &Statement,
        responses: &[MinerResponse],
        view: &dyn NetworkView,
    ) -> ValidationResult {
        if responses.is_empty() {
            return ValidationResult::empty(0);
        }

        let valid: Vec<MinerResponse> =
            responses.iter().filter(|r| r.is_valid()).cloned().collect();

        let (survivors, tier) = self.filter_responses(&valid, view);
        let consensus = weighted_consensus(&survivors);

        let consensus_confidence = consensus
            .map(|c| {
                let agreeing: Vec<f64> = survivors
                    .iter()
                    .filter(|r| r.resolution == c)
                    .map(|r| r.confidence)
                    .collect();
                if agreeing.is_empty() {
                    0.0
                } else {
                    agreeing.iter().sum::<f64>() / agreeing.len() as f64
                }
            })
            .unwrap_or(0.0);

        let scores = self.score_valid(&valid, consensus);
        self.accumulate(&scores);

        info!(
            "Consensus for '{}': {} at {:.1} confidence ({}/{} valid, {:?} tier, {} scored)",
            statement,
            consensus.unwrap_or(Resolution::Pending),
            consensus_confidence,
            valid.len(),
            responses.len(),
            tier,
            scores.len()
        );

        ValidationResult {
            consensus_resolution: consensus.unwrap_or(Resolution::Pending),
            consensus_confidence,
            total_responses: responses.len(),
            valid_responses: valid.len(),
            miner_scores: scores,
            consensus_sources: collect_sources(&valid),
            tier: Some(tier),
        }
    }

    /// Normalized per-miner scores for one statement without touching the
    /// accumulator. When a ground-truth resolution is known it replaces
    /// the computed consensus as the scoring reference.
    pub fn calculate_scores(
        &self,
        statement: &Statement,
        responses: &[MinerResponse],
        ground_truth: Option<Resolution>,
        view: &dyn NetworkView,
    ) -> HashMap<u64, f64> {
        if responses.is_empty() {
            return HashMap::new();
        }

        let valid: Vec<MinerResponse> =
            responses.iter().filter(|r| r.is_valid()).cloned().collect();

        let consensus = ground_truth.or_else(|| {
            let (survivors, _) = self.filter_responses(&valid, view);
            weighted_consensus(&survivors)
        });

        let scores = self.score_valid(&valid, consensus);
        debug!(
            "Scored {} miners for '{}' against {:?}",
            scores.len(),
            statement,
            consensus
        );
        scores
    }

    /// Long-run weights: each miner's window mean, renormalized to sum
    /// to 1. Empty accumulator yields an empty map.
    pub fn get_miner_scores(&self) -> HashMap<u64, f64> {
        let accumulated = self.accumulated_scores.read();
        let averages: HashMap<u64, f64> = accumulated
            .iter()
            .filter(|(_, window)| !window.is_empty())
            .map(|(&uid, window)| {
                (uid, window.iter().sum::<f64>() / window.len() as f64)
            })
            .collect();
        normalize_scores(averages)
    }

    /// Tiered filter chain: coldkey cap + volume filter, demoting to the
    /// stake buckets and finally to no protection as metadata runs out.
    fn filter_responses(
        &self,
        valid: &[MinerResponse],
        view: &dyn NetworkView,
    ) -> (Vec<MinerResponse>, ProtectionTier) {
        let mut rng = self.rng.lock();

        match apply_coldkey_cap(valid, view) {
            Ok(capped) => {
                let survivors = apply_volume_filter(&capped, view, &mut *rng);
                (survivors, ProtectionTier::Coldkey)
            }
            Err(err) => {
                warn!("Coldkey protection failed ({err}), using stake fallback");
                match apply_stake_buckets(valid, view, &mut *rng) {
                    Ok(survivors) => (survivors, ProtectionTier::Stake),
                    Err(err) => {
                        warn!("Stake fallback failed ({err}), using basic consensus");
                        (valid.to_vec(), ProtectionTier::Basic)
                    }
                }
            }
        }
    }

    /// Score every valid response against the consensus and normalize.
    fn score_valid(
        &self,
        valid: &[MinerResponse],
        consensus: Option<Resolution>,
    ) -> HashMap<u64, f64> {
        let mut scores = HashMap::new();
        for (index, response) in valid.iter().enumerate() {
            if let Some(uid) = response.miner_uid {
                scores.insert(
                    uid,
                    score_response(response, index, valid, consensus, &self.config),
                );
            }
        }
        normalize_scores(scores)
    }

    /// Append normalized scores to each miner's rolling window.
    fn accumulate(&self, scores: &HashMap<u64, f64>) {
        let mut accumulated = self.accumulated_scores.write();
        for (&uid, &score) in scores {
            let window = accumulated.entry(uid).or_default();
            window.push_back(score);
            if window.len() > SCORE_WINDOW {
                window.pop_front();
            }
        }
    }
}

impl Default for WeightsCalculator {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Divide by the total, or distribute uniformly when every raw score is
/// zero; either way a non-empty map sums to 1.
fn normalize_scores(scores: HashMap<u64, f64>) -> HashMap<u64, f64> {
    if scores.is_empty() {
        return scores;
    }

    let total: f64 = scores.values().sum();
    if total == 0.0 {
        let uniform = 1.0 / scores.len() as f64;
        return scores.keys().map(|&uid| (uid, uniform)).collect();
    }

    scores
        .into_iter()
        .map(|(uid, score)| (uid, score / total))
        .collect()
}

/// First distinct sources observed across the valid responses, capped.
fn collect_sources(valid: &[MinerResponse]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for response in valid {
        for source in &response.sources {
            if seen.insert(source.clone()) {
                sources.push(source.clone());
                if sources.len() == MAX_CONSENSUS_SOURCES {
                    return sources;
                }
            }
        }
    }
    sources
}
