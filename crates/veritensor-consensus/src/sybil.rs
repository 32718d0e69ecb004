//! Tiered anti-Sybil filters.
//!
//! Three complementary mechanisms bound a single operator's influence on
//! consensus:
//!
//! 1. A per-coldkey population cap (7% of the network) with coordination
//!    penalties attenuating confidence inside multi-miner groups.
//! 2. A cross-identity volume filter that aggressively subsamples any
//!    coldkey fielding an abnormally large cohort.
//! 3. A stake-bucket fallback for when coldkey metadata is unavailable:
//!    a swarm of identically-staked mid-range miners is a high-precision
//!    signature of coordinated funding.
//!
//! Grouping uses ordered maps so that, for a pinned RNG seed, subsampling
//! consumes randomness in a reproducible order.

use crate::coordination::{coordination_penalty, short_key};
use crate::error::{ConsensusError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{info, warn};
use veritensor_core::{MinerResponse, NetworkView};

/// Fraction of the network one coldkey may occupy in consensus.
const COLDKEY_CAP_FRACTION: f64 = 0.07;
/// Attenuation never drives confidence below this floor.
const CONFIDENCE_FLOOR: f64 = 25.0;
/// Cohort size at which a single coldkey is treated as a Sybil swarm.
const VOLUME_THRESHOLD: usize = 15;
/// Fraction of a suspicious cohort the volume filter keeps (min 2).
const VOLUME_KEEP_FRACTION: f64 = 0.20;
/// Inclusive whole-token stake range where coordinated swarms cluster.
const SUSPICIOUS_STAKE_MIN: i64 = 15;
const SUSPICIOUS_STAKE_MAX: i64 = 100;
/// Bucket population at which a stake bucket is treated as coordinated.
const STAKE_BUCKET_THRESHOLD: usize = 15;
/// Fraction of a suspicious stake bucket kept (min 1).
const STAKE_KEEP_FRACTION: f64 = 0.15;

/// Group responses by resolved coldkey. Responses whose UID is unset or
/// absent from the coldkey table land under `None`.
fn group_by_coldkey(
    responses: &[MinerResponse],
    view: &dyn NetworkView,
) -> BTreeMap<Option<String>, Vec<MinerResponse>> {
    let mut groups: BTreeMap<Option<String>, Vec<MinerResponse>> = BTreeMap::new();
    for response in responses {
        let coldkey = response
            .miner_uid
            .and_then(|uid| view.coldkey_of(uid))
            .map(str::to_string);
        groups.entry(coldkey).or_default().push(response.clone());
    }
    groups
}

/// Per-coldkey population cap with coordination attenuation.
///
/// The cap is 7% of the network (coldkey table size, falling back to the
/// response count), minimum 1. Multi-miner groups first pass through the
/// coordination detector; the penalty attenuates every member's
/// confidence down toward a floor of 25, never lifting it. Over-cap
/// groups keep their highest-confidence members after attenuation.
/// Responses with no resolvable coldkey bypass the cap unchanged.
pub fn apply_coldkey_cap(
    responses: &[MinerResponse],
    view: &dyn NetworkView,
) -> Result<Vec<MinerResponse>> {
    if !view.has_coldkeys() {
        return Err(ConsensusError::ColdkeysUnavailable);
    }

    let network_size = view.coldkey_count().unwrap_or(responses.len());
    let cap = ((network_size as f64 * COLDKEY_CAP_FRACTION) as usize).max(1);

    let mut admitted = Vec::new();
    for (coldkey, mut group) in group_by_coldkey(responses, view) {
        let coldkey = match coldkey {
            Some(coldkey) => coldkey,
            None => {
                // No attribution possible; the cap cannot apply.
                admitted.extend(group);
                continue;
            }
        };

        if group.len() > 1 {
            let penalty = coordination_penalty(&group, &coldkey);
            if penalty > 0.0 {
                group = group
                    .iter()
                    .map(|r| r.with_confidence(attenuate(r.confidence, penalty)))
                    .collect();
            }
        }

        if group.len() <= cap {
            admitted.extend(group);
        } else {
            group.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            warn!(
                "Coldkey cap enforced for {}: {} responses capped to {}",
                short_key(&coldkey),
                group.len(),
                cap
            );
            admitted.extend(group.into_iter().take(cap));
        }
    }

    if admitted.len() < responses.len() {
        info!(
            "Coldkey consensus cap applied: {} -> {} responses (max {} per coldkey)",
            responses.len(),
            admitted.len(),
            cap
        );
    }

    Ok(admitted)
}

/// Attenuated confidence: scaled down by the penalty, floored at 25, and
/// never lifted above its original value.
fn attenuate(confidence: f64, penalty: f64) -> f64 {
    (confidence * (1.0 - penalty))
        .max(CONFIDENCE_FLOOR)
        .min(confidence)
}

/// Cross-identity volume filter.
///
/// Any coldkey fielding 15 or more of the surviving responses is a strong
/// prior of coordinated operation regardless of how the vote looks, and is
/// subsampled to 20% (minimum 2) uniformly at random. The unattributed
/// cohort is held to the same rule. Complements the cap: the cap bounds
/// weight, this bounds presence.
pub fn apply_volume_filter<R: Rng + ?Sized>(
    responses: &[MinerResponse],
    view: &dyn NetworkView,
    rng: &mut R,
) -> Vec<MinerResponse> {
    let mut survivors = Vec::new();
    let mut suspicious = 0usize;

    for (coldkey, group) in group_by_coldkey(responses, view) {
        if group.len() >= VOLUME_THRESHOLD {
            suspicious += 1;
            let keep = ((group.len() as f64 * VOLUME_KEEP_FRACTION) as usize).max(2);
            warn!(
                "Suspicious coldkey {} controls {} miners, keeping {}",
                coldkey.as_deref().map(short_key).unwrap_or_else(|| "<unknown>".into()),
                group.len(),
                keep
            );
            survivors.extend(group.choose_multiple(rng, keep).cloned());
        } else {
            survivors.extend(group);
        }
    }

    if suspicious > 0 {
        warn!(
            "Volume filter: {} -> {} responses across {} suspicious coldkeys",
            responses.len(),
            survivors.len(),
            suspicious
        );
    }

    survivors
}

/// Stake-bucket fallback filter.
///
/// Buckets responses by truncated stake; a bucket in the 15..=100 token
/// range holding 15 or more responses is treated as a coordinated
/// mid-stake swarm and subsampled to 15% (minimum 1). Responses without a
/// stake entry land in bucket 0, outside the suspicious range.
pub fn apply_stake_buckets<R: Rng + ?Sized>(
    responses: &[MinerResponse],
    view: &dyn NetworkView,
    rng: &mut R,
) -> Result<Vec<MinerResponse>> {
    if !view.has_stakes() {
        return Err(ConsensusError::StakesUnavailable);
    }

    let mut buckets: BTreeMap<i64, Vec<MinerResponse>> = BTreeMap::new();
    for response in responses {
        let bucket = response
            .miner_uid
            .and_then(|uid| view.stake_of(uid))
            .map(|stake| stake as i64)
            .unwrap_or(0);
        buckets.entry(bucket).or_default().push(response.clone());
    }

    let mut survivors = Vec::new();
    for (bucket, group) in buckets {
        let in_range = (SUSPICIOUS_STAKE_MIN..=SUSPICIOUS_STAKE_MAX).contains(&bucket);
        if in_range && group.len() >= STAKE_BUCKET_THRESHOLD {
            let keep = ((group.len() as f64 * STAKE_KEEP_FRACTION) as usize).max(1);
            warn!(
                "Suspicious stake pattern: {} miners at {} TAO each, keeping {}",
                group.len(),
                bucket,
                keep
            );
            survivors.extend(group.choose_multiple(rng, keep).cloned());
        } else {
            survivors.extend(group);
        }
    }

    Ok(survivors)
}
