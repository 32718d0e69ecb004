use thiserror::Error;

/// Errors raised inside the filter pipeline.
///
/// Both variants are recoverable: the aggregator consumes them to demote
/// to the next protection tier, so they never escape the public entry
/// points of [`crate::WeightsCalculator`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("coldkey metadata unavailable")]
    ColdkeysUnavailable,

    #[error("stake metadata unavailable")]
    StakesUnavailable,
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
