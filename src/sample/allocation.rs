//! Per-segment group sizes.
//!
//! Every group's population-wide target is split across segments in
//! proportion to segment size. Rounding is round-half-up, done in integer
//! arithmetic so ties are exact:
//!
//! `round(T * n / N) = (2 * T * n + N) / (2 * N)`
//!
//! When a segment cannot hold all of its desired rows (a shortfall), every
//! desired count is scaled by `n / needed` with the same rounding. The groups
//! are then granted in configuration order, each capped at what is still
//! unassigned, and the last group takes the remainder, so the segment is
//! exhausted exactly and no count can go negative.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::domain::{GroupTargets, SegmentKey};
use crate::error::{DataError, Result, SegmentationError};

/// Allocation decided for one segment. Vectors are in group order.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAllocation {
    pub segment: SegmentKey,
    pub size: usize,
    /// `size / population`.
    pub share: f64,
    /// Proportional counts before any shortfall correction.
    pub desired: Vec<u64>,
    /// Final counts used for slicing.
    pub counts: Vec<usize>,
    pub shortfall: bool,
}

impl SegmentAllocation {
    pub fn assigned(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Rows left out of every group.
    pub fn unassigned(&self) -> usize {
        self.size - self.assigned()
    }
}

/// `round_half_up(value * numer / denom)` for non-negative integers.
pub fn scale_round_half_up(value: u64, numer: u64, denom: u64) -> u64 {
    debug_assert!(denom > 0);
    let product = u128::from(value) * u128::from(numer);
    let denom = u128::from(denom);
    ((2 * product + denom) / (2 * denom)) as u64
}

/// Proportional (pre-shortfall) counts for a segment of `segment_size`
/// customers out of `population`.
pub fn desired_counts(groups: &GroupTargets, segment_size: usize, population: usize) -> Vec<u64> {
    groups
        .groups()
        .iter()
        .map(|g| scale_round_half_up(g.size, segment_size as u64, population as u64))
        .collect()
}

/// Compute final per-group counts for a single segment.
pub fn allocate_segment(
    segment: SegmentKey,
    segment_size: usize,
    population: usize,
    groups: &GroupTargets,
) -> Result<SegmentAllocation> {
    if population == 0 || segment_size > population {
        return Err(SegmentationError::Invariant {
            segment: segment.to_string(),
            detail: format!("segment size {segment_size} is not within population {population}"),
        });
    }

    let desired = desired_counts(groups, segment_size, population);
    let needed: u64 = desired.iter().sum();
    let size = segment_size as u64;
    let shortfall = needed > size;

    let raw: Vec<i64> = if shortfall {
        let last = desired.len() - 1;
        let mut remaining = size as i64;
        let mut out = Vec::with_capacity(desired.len());
        for (idx, &d) in desired.iter().enumerate() {
            if idx == last {
                out.push(remaining);
            } else {
                let scaled = (scale_round_half_up(d, size, needed) as i64).min(remaining);
                out.push(scaled);
                remaining -= scaled;
            }
        }
        out
    } else {
        desired.iter().map(|&d| d as i64).collect()
    };

    let counts = checked_counts(segment, segment_size, &raw)?;
    let allocation = SegmentAllocation {
        segment,
        size: segment_size,
        share: segment_size as f64 / population as f64,
        desired,
        counts,
        shortfall,
    };

    if shortfall {
        warn!(
            "segment {segment}: {needed} rows requested but only {segment_size} available; scaled to {:?}",
            allocation.counts
        );
    } else {
        debug!(
            "segment {segment}: size={segment_size} share={:.4} counts={:?}",
            allocation.share, allocation.counts
        );
    }

    Ok(allocation)
}

fn checked_counts(segment: SegmentKey, segment_size: usize, raw: &[i64]) -> Result<Vec<usize>> {
    if let Some(neg) = raw.iter().find(|&&c| c < 0) {
        return Err(SegmentationError::Invariant {
            segment: segment.to_string(),
            detail: format!("negative group count {neg}"),
        });
    }
    let total: i64 = raw.iter().sum();
    if total > segment_size as i64 {
        return Err(SegmentationError::Invariant {
            segment: segment.to_string(),
            detail: format!("allocated {total} rows from a segment of {segment_size}"),
        });
    }
    Ok(raw.iter().map(|&c| c as usize).collect())
}

/// Allocate every segment. Output is in segment-key order.
pub fn allocate(segment_sizes: &BTreeMap<SegmentKey, usize>, groups: &GroupTargets) -> Result<Vec<SegmentAllocation>> {
    let population: usize = segment_sizes.values().sum();
    if population == 0 {
        return Err(DataError::NoSegmentedCustomers.into());
    }
    segment_sizes
        .iter()
        .map(|(&key, &size)| allocate_segment(key, size, population, groups))
        .collect()
}
