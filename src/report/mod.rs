//! Reporting utilities: RF pivot tables and formatted terminal output.

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use crate::domain::{SegmentKey, SegmentedCustomer};
use crate::sample::SampleRun;

/// Frequency × recency customer counts.
///
/// Rows and columns hold only the ordinals that occur, both in descending
/// order (highest frequency first, highest recency first).
#[derive(Debug, Clone, PartialEq)]
pub struct RfPivot {
    pub frequency: Vec<u32>,
    pub recency: Vec<u32>,
    counts: BTreeMap<SegmentKey, usize>,
    pub total: usize,
}

impl RfPivot {
    pub fn count(&self, frequency: u32, recency: u32) -> usize {
        self.counts
            .get(&SegmentKey { frequency, recency })
            .copied()
            .unwrap_or(0)
    }

    /// Cell share of the table total (0 for an empty table).
    pub fn share(&self, frequency: u32, recency: u32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(frequency, recency) as f64 / self.total as f64
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Build the RF pivot for any set of segmented customers.
pub fn rf_pivot<'a, I>(customers: I) -> RfPivot
where
    I: IntoIterator<Item = &'a SegmentedCustomer>,
{
    let mut counts: BTreeMap<SegmentKey, usize> = BTreeMap::new();
    for c in customers {
        *counts.entry(c.segment()).or_insert(0) += 1;
    }

    let mut frequency: Vec<u32> = counts.keys().map(|k| k.frequency).collect();
    frequency.sort_unstable_by(|a, b| b.cmp(a));
    frequency.dedup();
    let mut recency: Vec<u32> = counts.keys().map(|k| k.recency).collect();
    recency.sort_unstable_by(|a, b| b.cmp(a));
    recency.dedup();

    let total = counts.values().sum();
    RfPivot {
        frequency,
        recency,
        counts,
        total,
    }
}

/// One pivot per sample group, in group order.
pub fn group_pivots(run: &SampleRun) -> Vec<(String, RfPivot)> {
    run.groups
        .iter()
        .map(|g| (g.group.name.clone(), rf_pivot(&g.customers)))
        .collect()
}
