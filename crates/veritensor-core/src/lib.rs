// VeriTensor core types
// Shared domain model for the statement-verification network

pub mod metagraph;
pub mod types;

pub use metagraph::{Metagraph, NetworkView};
pub use types::{MinerResponse, ProtectionTier, Resolution, Statement, ValidationResult};
