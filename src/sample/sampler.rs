//! Stratified sampling: shuffle each segment and slice it per allocation.
//!
//! Within a segment, customers are first put in canonical
//! `(customer_id, customer_email)` order, then shuffled with that segment's
//! own generator, then sliced in group order. Whatever is left after the last
//! slice is not part of any group.

use std::collections::BTreeMap;

use log::info;
use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::domain::{GroupTargets, SampleGroup, SampledCustomer, SegmentedCustomer};
use crate::error::{DataError, Result, SegmentationError};
use crate::sample::allocation::{SegmentAllocation, allocate};
use crate::sample::rng::segment_rng;
use crate::segment::group_by_segment;

/// All customers drawn into one group.
#[derive(Debug, Clone)]
pub struct GroupSample {
    pub group: SampleGroup,
    pub customers: Vec<SegmentedCustomer>,
}

/// Output of one sampling run.
#[derive(Debug, Clone)]
pub struct SampleRun {
    /// One entry per segment, in segment-key order.
    pub allocations: Vec<SegmentAllocation>,
    /// One entry per configured group, in configuration order.
    pub groups: Vec<GroupSample>,
}

impl SampleRun {
    pub fn group(&self, name: &str) -> Option<&GroupSample> {
        self.groups.iter().find(|g| g.group.name == name)
    }

    pub fn total_sampled(&self) -> usize {
        self.groups.iter().map(|g| g.customers.len()).sum()
    }

    /// Every labeled customer, group by group.
    pub fn combined(&self) -> Vec<SampledCustomer> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.customers.iter().map(|c| SampledCustomer {
                    group: g.group.name.clone(),
                    customer: c.clone(),
                })
            })
            .collect()
    }
}

/// Shuffle one segment and cut it into per-group slices.
///
/// `members` may arrive in any order. Returns one vector per group, in the
/// allocation's group order.
pub fn sample_segment(
    members: &[&SegmentedCustomer],
    allocation: &SegmentAllocation,
    seed: u64,
) -> Result<Vec<Vec<SegmentedCustomer>>> {
    if members.len() != allocation.size {
        return Err(SegmentationError::Invariant {
            segment: allocation.segment.to_string(),
            detail: format!(
                "allocation sized for {} rows but segment has {}",
                allocation.size,
                members.len()
            ),
        });
    }

    let mut ordered: Vec<&SegmentedCustomer> = members.to_vec();
    ordered.sort_by(|a, b| {
        (&a.customer.customer_id, &a.customer.customer_email)
            .cmp(&(&b.customer.customer_id, &b.customer.customer_email))
    });

    let mut rng = segment_rng(seed, allocation.segment);
    ordered.shuffle(&mut rng);

    let mut slices = Vec::with_capacity(allocation.counts.len());
    let mut offset = 0usize;
    for &count in &allocation.counts {
        let end = offset + count;
        let slice = ordered.get(offset..end).ok_or_else(|| SegmentationError::Invariant {
            segment: allocation.segment.to_string(),
            detail: format!("slice {offset}..{end} exceeds segment of {}", ordered.len()),
        })?;
        slices.push(slice.iter().map(|c| (*c).clone()).collect());
        offset = end;
    }
    Ok(slices)
}

/// Allocate and sample every segment of `customers`.
///
/// Segments are independent, so they are processed in parallel; each one
/// derives its own generator from `seed`, which keeps the result identical to
/// a sequential run.
pub fn stratified_sample(customers: &[SegmentedCustomer], groups: &GroupTargets, seed: u64) -> Result<SampleRun> {
    let by_segment = group_by_segment(customers);
    let sizes: BTreeMap<_, _> = by_segment.iter().map(|(k, v)| (*k, v.len())).collect();
    let allocations = allocate(&sizes, groups)?;

    let per_segment: Vec<Vec<Vec<SegmentedCustomer>>> = allocations
        .par_iter()
        .map(|allocation| {
            let members = by_segment
                .get(&allocation.segment)
                .map(Vec::as_slice)
                .unwrap_or_default();
            sample_segment(members, allocation, seed)
        })
        .collect::<Result<_>>()?;

    let mut samples: Vec<GroupSample> = groups
        .groups()
        .iter()
        .map(|g| GroupSample {
            group: g.clone(),
            customers: Vec::new(),
        })
        .collect();
    for slices in per_segment {
        for (sample, slice) in samples.iter_mut().zip(slices) {
            sample.customers.extend(slice);
        }
    }

    let run = SampleRun {
        allocations,
        groups: samples,
    };
    if run.total_sampled() == 0 {
        return Err(DataError::EmptySample.into());
    }

    for g in &run.groups {
        info!(
            "group {}: sampled {} of {} requested",
            g.group.name,
            g.customers.len(),
            g.group.size
        );
    }
    Ok(run)
}
