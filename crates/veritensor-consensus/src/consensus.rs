//! Confidence-weighted verdict vote over filtered survivors.

use veritensor_core::{MinerResponse, Resolution};

/// Accumulated vote weight per resolution variant.
///
/// A typed record instead of a keyed map: the verdict domain is closed,
/// and the argmax must iterate it in a fixed order (`True`, `False`,
/// `Pending`) so ties resolve deterministically.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoteWeights {
    pub true_weight: f64,
    pub false_weight: f64,
    pub pending_weight: f64,
}

impl VoteWeights {
    /// Tally responses, each contributing `confidence / 100` to its verdict.
    pub fn tally(responses: &[MinerResponse]) -> Self {
        let mut weights = Self::default();
        for response in responses {
            let weight = response.confidence / 100.0;
            match response.resolution {
                Resolution::True => weights.true_weight += weight,
                Resolution::False => weights.false_weight += weight,
                Resolution::Pending => weights.pending_weight += weight,
            }
        }
        weights
    }

    pub fn weight_of(&self, resolution: Resolution) -> f64 {
        match resolution {
            Resolution::True => self.true_weight,
            Resolution::False => self.false_weight,
            Resolution::Pending => self.pending_weight,
        }
    }

    /// Verdict with the highest weight; ties keep the earlier variant in
    /// the fixed `True < False < Pending` order.
    pub fn winner(&self) -> Resolution {
        let mut best = Resolution::True;
        let mut best_weight = self.true_weight;
        if self.false_weight > best_weight {
            best = Resolution::False;
            best_weight = self.false_weight;
        }
        if self.pending_weight > best_weight {
            best = Resolution::Pending;
        }
        best
    }
}

/// Consensus verdict among the survivors, or `None` when there are no
/// survivors to vote. Callers treat `None` as `Pending` with confidence 0.
pub fn weighted_consensus(responses: &[MinerResponse]) -> Option<Resolution> {
    if responses.is_empty() {
        return None;
    }
    Some(VoteWeights::tally(responses).winner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(resolution: Resolution, confidence: f64) -> MinerResponse {
        MinerResponse::new(Some(0), resolution, confidence, "", vec![])
    }

    #[test]
    fn test_no_survivors_no_consensus() {
        assert_eq!(weighted_consensus(&[]), None);
    }

    #[test]
    fn test_split_vote_weighted_by_confidence() {
        // TRUE: 0.9 + 0.7 = 1.6, FALSE: 0.6
        let responses = vec![
            response(Resolution::True, 90.0),
            response(Resolution::True, 70.0),
            response(Resolution::False, 60.0),
        ];
        assert_eq!(weighted_consensus(&responses), Some(Resolution::True));

        let weights = VoteWeights::tally(&responses);
        assert!((weights.true_weight - 1.6).abs() < 1e-12);
        assert!((weights.false_weight - 0.6).abs() < 1e-12);
        assert_eq!(weights.pending_weight, 0.0);
    }

    #[test]
    fn test_one_confident_dissenter_can_outweigh() {
        let responses = vec![
            response(Resolution::False, 95.0),
            response(Resolution::True, 40.0),
            response(Resolution::True, 40.0),
        ];
        assert_eq!(weighted_consensus(&responses), Some(Resolution::False));
    }

    #[test]
    fn test_tie_breaks_in_fixed_verdict_order() {
        // Exactly equal weight on TRUE and FALSE: TRUE wins the tie.
        let responses = vec![
            response(Resolution::False, 80.0),
            response(Resolution::True, 80.0),
        ];
        assert_eq!(weighted_consensus(&responses), Some(Resolution::True));

        // Equal FALSE and PENDING: FALSE precedes PENDING.
        let responses = vec![
            response(Resolution::Pending, 50.0),
            response(Resolution::False, 50.0),
        ];
        assert_eq!(weighted_consensus(&responses), Some(Resolution::False));
    }

    #[test]
    fn test_zero_confidence_survivors_still_vote() {
        // All weights zero: argmax falls back to the first verdict in order.
        let responses = vec![
            response(Resolution::Pending, 0.0),
            response(Resolution::False, 0.0),
        ];
        assert_eq!(weighted_consensus(&responses), Some(Resolution::True));
    }

    #[test]
    fn test_weight_of_matches_tally() {
        let responses = vec![
            response(Resolution::Pending, 50.0),
            response(Resolution::Pending, 30.0),
        ];
        let weights = VoteWeights::tally(&responses);
        assert!((weights.weight_of(Resolution::Pending) - 0.8).abs() < 1e-12);
        assert_eq!(weights.weight_of(Resolution::True), 0.0);
    }
}
