//! Customer summary → recency × frequency segments.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::domain::{BinEdges, CustomerRecord, SegmentKey, SegmentedCustomer};
use crate::error::{DataError, Result};
use crate::segment::bins::bucket_for;

/// Counts collected while segmenting, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentationStats {
    pub input: usize,
    /// Removed by the max-recency pre-filter.
    pub filtered_out: usize,
    /// Survived the filter but missed a bucket on at least one axis.
    pub unbinned: usize,
    pub segmented: usize,
}

/// The segmented population.
#[derive(Debug, Clone)]
pub struct SegmentedTable {
    /// Same relative order as the input summary.
    pub customers: Vec<SegmentedCustomer>,
    pub stats: SegmentationStats,
}

impl SegmentedTable {
    pub fn segment_counts(&self) -> BTreeMap<SegmentKey, usize> {
        segment_counts(&self.customers)
    }
}

/// Keep customers with `recency <= max_recency` (inclusive).
///
/// Customers without a recency never pass an active filter. With no
/// threshold the input is returned unchanged.
pub fn apply_recency_filter(customers: &[CustomerRecord], max_recency: Option<i64>) -> Result<Vec<CustomerRecord>> {
    let Some(threshold) = max_recency else {
        return Ok(customers.to_vec());
    };

    let kept: Vec<CustomerRecord> = customers
        .iter()
        .filter(|c| c.recency.is_some_and(|r| r <= threshold))
        .cloned()
        .collect();

    if kept.is_empty() {
        return Err(DataError::EmptyAfterFilter { threshold }.into());
    }
    Ok(kept)
}

/// Bucket every customer on both axes; customers missing either bucket are
/// left out.
pub fn assign_segments(
    customers: &[CustomerRecord],
    recency_bins: &BinEdges,
    frequency_bins: &BinEdges,
) -> Vec<SegmentedCustomer> {
    customers
        .iter()
        .filter_map(|c| {
            let recency_bucket = bucket_for(recency_bins, c.recency? as f64)?;
            let frequency_bucket = bucket_for(frequency_bins, c.frequency as f64)?;
            Some(SegmentedCustomer {
                customer: c.clone(),
                recency_bucket,
                frequency_bucket,
            })
        })
        .collect()
}

/// Pre-filter then bucket. Errors when nothing is left at either step.
pub fn segment_customers(
    customers: &[CustomerRecord],
    recency_bins: &BinEdges,
    frequency_bins: &BinEdges,
    max_recency: Option<i64>,
) -> Result<SegmentedTable> {
    let filtered = apply_recency_filter(customers, max_recency)?;
    let segmented = assign_segments(&filtered, recency_bins, frequency_bins);

    let stats = SegmentationStats {
        input: customers.len(),
        filtered_out: customers.len() - filtered.len(),
        unbinned: filtered.len() - segmented.len(),
        segmented: segmented.len(),
    };

    if segmented.is_empty() {
        return Err(DataError::NoSegmentedCustomers.into());
    }

    info!(
        "segmented {} of {} customers (filtered {}, outside bins {}) with recency bins [{recency_bins}] and frequency bins [{frequency_bins}]",
        stats.segmented, stats.input, stats.filtered_out, stats.unbinned
    );
    for (key, count) in segment_counts(&segmented) {
        debug!("segment {key}: {count} customers");
    }

    Ok(SegmentedTable {
        customers: segmented,
        stats,
    })
}

pub fn segment_counts(customers: &[SegmentedCustomer]) -> BTreeMap<SegmentKey, usize> {
    let mut counts = BTreeMap::new();
    for c in customers {
        *counts.entry(c.segment()).or_insert(0) += 1;
    }
    counts
}

/// Partition customers by segment key.
pub fn group_by_segment(customers: &[SegmentedCustomer]) -> BTreeMap<SegmentKey, Vec<&SegmentedCustomer>> {
    let mut groups: BTreeMap<SegmentKey, Vec<&SegmentedCustomer>> = BTreeMap::new();
    for c in customers {
        groups.entry(c.segment()).or_default().push(c);
    }
    groups
}
