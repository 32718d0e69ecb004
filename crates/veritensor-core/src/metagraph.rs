//! Read-only network metadata: coldkey and stake side-tables per miner UID.
//!
//! Either table may be absent as a whole (a peer that never synced them)
//! and any single UID may be missing from a table that is present. The
//! consensus pipeline treats both levels of absence explicitly and demotes
//! its protection tier accordingly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Capability view over per-UID network metadata.
///
/// `has_coldkeys()` / `has_stakes()` report whole-table availability;
/// the per-UID lookups may still miss for individual miners.
pub trait NetworkView {
    fn coldkey_of(&self, uid: u64) -> Option<&str>;

    fn stake_of(&self, uid: u64) -> Option<f64>;

    fn has_coldkeys(&self) -> bool;

    fn has_stakes(&self) -> bool;

    /// Number of UIDs in the coldkey table, used as the network size when
    /// sizing the per-coldkey cap.
    fn coldkey_count(&self) -> Option<usize>;
}

/// In-memory metagraph snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metagraph {
    coldkeys: Option<HashMap<u64, String>>,
    stakes: Option<HashMap<u64, f64>>,
}

impl Metagraph {
    /// Metagraph with both side-tables absent.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coldkeys(mut self, coldkeys: HashMap<u64, String>) -> Self {
        self.coldkeys = Some(coldkeys);
        self
    }

    pub fn with_stakes(mut self, stakes: HashMap<u64, f64>) -> Self {
        self.stakes = Some(stakes);
        self
    }

    /// Insert a single coldkey entry, materializing the table if absent.
    pub fn insert_coldkey(&mut self, uid: u64, coldkey: impl Into<String>) {
        self.coldkeys
            .get_or_insert_with(HashMap::new)
            .insert(uid, coldkey.into());
    }

    /// Insert a single stake entry, materializing the table if absent.
    pub fn insert_stake(&mut self, uid: u64, stake: f64) {
        self.stakes.get_or_insert_with(HashMap::new).insert(uid, stake);
    }
}

impl NetworkView for Metagraph {
    fn coldkey_of(&self, uid: u64) -> Option<&str> {
        self.coldkeys
            .as_ref()
            .and_then(|table| table.get(&uid))
            .map(String::as_str)
    }

    fn stake_of(&self, uid: u64) -> Option<f64> {
        self.stakes.as_ref().and_then(|table| table.get(&uid)).copied()
    }

    fn has_coldkeys(&self) -> bool {
        self.coldkeys.is_some()
    }

    fn has_stakes(&self) -> bool {
        self.stakes.is_some()
    }

    fn coldkey_count(&self) -> Option<usize> {
        self.coldkeys.as_ref().map(HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_tables() {
        let view = Metagraph::new();
        assert!(!view.has_coldkeys());
        assert!(!view.has_stakes());
        assert_eq!(view.coldkey_of(0), None);
        assert_eq!(view.stake_of(0), None);
        assert_eq!(view.coldkey_count(), None);
    }

    #[test]
    fn test_present_table_with_missing_uid() {
        let mut view = Metagraph::new();
        view.insert_coldkey(1, "ck-alpha");
        view.insert_stake(1, 42.5);

        assert!(view.has_coldkeys());
        assert_eq!(view.coldkey_of(1), Some("ck-alpha"));
        assert_eq!(view.coldkey_of(2), None);
        assert_eq!(view.stake_of(1), Some(42.5));
        assert_eq!(view.stake_of(2), None);
        assert_eq!(view.coldkey_count(), Some(1));
    }

    #[test]
    fn test_builder_style() {
        let view = Metagraph::new()
            .with_coldkeys(HashMap::from([(0, "a".to_string()), (1, "b".to_string())]))
            .with_stakes(HashMap::from([(0, 10.0)]));
        assert_eq!(view.coldkey_count(), Some(2));
        assert!(view.has_stakes());
    }
}
