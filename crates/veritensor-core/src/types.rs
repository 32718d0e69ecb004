use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque identifier of the claim under evaluation.
///
/// The core never parses statement text; it is carried through for
/// logging and result attribution only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement(pub String);

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verdict space for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    True,
    False,
    Pending,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::True => write!(f, "TRUE"),
            Resolution::False => write!(f, "FALSE"),
            Resolution::Pending => write!(f, "PENDING"),
        }
    }
}

/// One miner's judgment about a statement.
///
/// Responses are immutable in the pipeline: confidence attenuation during
/// coordination detection goes through [`MinerResponse::with_confidence`],
/// which returns a new value instead of mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerResponse {
    /// UID of the responding miner; responses without one cannot be scored.
    pub miner_uid: Option<u64>,
    pub resolution: Resolution,
    /// Self-reported confidence in [0, 100].
    pub confidence: f64,
    /// Free-text reasoning summary.
    pub summary: String,
    /// Cited sources, ordered, possibly with duplicates.
    pub sources: Vec<String>,
}

impl MinerResponse {
    pub fn new(
        miner_uid: Option<u64>,
        resolution: Resolution,
        confidence: f64,
        summary: impl Into<String>,
        sources: Vec<String>,
    ) -> Self {
        Self {
            miner_uid,
            resolution,
            confidence,
            summary: summary.into(),
            sources,
        }
    }

    /// A response participates in consensus and scoring only if it carries
    /// a miner UID and a confidence inside [0, 100]. The verdict itself is
    /// total by construction of [`Resolution`].
    pub fn is_valid(&self) -> bool {
        self.miner_uid.is_some() && self.confidence >= 0.0 && self.confidence <= 100.0
    }

    /// Copy of this response with the confidence replaced.
    pub fn with_confidence(&self, confidence: f64) -> Self {
        Self {
            confidence,
            ..self.clone()
        }
    }
}

/// Anti-Sybil regime that produced a consensus.
///
/// Selection is monotonic in available metadata: missing coldkeys demote
/// to `Stake`, missing stakes demote further to `Basic`. `Basic` means no
/// Sybil protection was applied at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectionTier {
    Coldkey,
    Stake,
    Basic,
}

/// Outcome of one aggregation pass over a statement's responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub consensus_resolution: Resolution,
    /// Mean confidence of filtered survivors that voted with the consensus.
    pub consensus_confidence: f64,
    pub total_responses: usize,
    pub valid_responses: usize,
    /// Normalized per-miner scores; sums to 1 when non-empty.
    pub miner_scores: HashMap<u64, f64>,
    /// First distinct sources observed across valid responses (at most 10).
    pub consensus_sources: Vec<String>,
    /// Filter tier that produced the consensus; `None` if no pipeline ran
    /// (empty response set).
    pub tier: Option<ProtectionTier>,
}

impl ValidationResult {
    /// Result for a statement that received no responses.
    pub fn empty(total_responses: usize) -> Self {
        Self {
            consensus_resolution: Resolution::Pending,
            consensus_confidence: 0.0,
            total_responses,
            valid_responses: 0,
            miner_scores: HashMap::new(),
            consensus_sources: Vec::new(),
            tier: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(uid: Option<u64>, confidence: f64) -> MinerResponse {
        MinerResponse::new(uid, Resolution::True, confidence, "summary", vec![])
    }

    #[test]
    fn test_validity_requires_uid() {
        assert!(response(Some(3), 50.0).is_valid());
        assert!(!response(None, 50.0).is_valid());
    }

    #[test]
    fn test_validity_confidence_range() {
        assert!(response(Some(1), 0.0).is_valid());
        assert!(response(Some(1), 100.0).is_valid());
        assert!(!response(Some(1), -1.0).is_valid());
        assert!(!response(Some(1), 100.5).is_valid());
        assert!(!response(Some(1), f64::NAN).is_valid());
    }

    #[test]
    fn test_with_confidence_leaves_original_untouched() {
        let original = response(Some(1), 90.0);
        let attenuated = original.with_confidence(25.0);
        assert_eq!(original.confidence, 90.0);
        assert_eq!(attenuated.confidence, 25.0);
        assert_eq!(attenuated.miner_uid, original.miner_uid);
    }

    #[test]
    fn test_resolution_serde_uppercase() {
        let json = serde_json::to_string(&Resolution::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let back: Resolution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Resolution::Pending);
    }

    #[test]
    fn test_empty_result() {
        let result = ValidationResult::empty(4);
        assert_eq!(result.consensus_resolution, Resolution::Pending);
        assert_eq!(result.consensus_confidence, 0.0);
        assert_eq!(result.total_responses, 4);
        assert_eq!(result.valid_responses, 0);
        assert!(result.miner_scores.is_empty());
        assert!(result.tier.is_none());
    }
}
