//! Shared domain types.
//!
//! These types are intentionally plain values so every pipeline stage can be a
//! pure function from one table to the next:
//!
//! - `OrderRow` → `CustomerRecord` (aggregation)
//! - `CustomerRecord` → `SegmentedCustomer` (bucketing)
//! - `SegmentedCustomer` → `SampledCustomer` (allocation + sampling)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A cleaned order line, as handed to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub customer_id: String,
    /// `None` when the source cell was blank.
    pub customer_email: Option<String>,
    pub order_id: String,
    /// `None` when the source date could not be parsed.
    pub day: Option<NaiveDate>,
    pub gross_sales: f64,
    pub discounts: f64,
    pub net_sales: f64,
}

/// One row per customer with recency/frequency/monetary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub customer_email: String,
    /// Distinct order count.
    pub frequency: u64,
    pub last_order_date: Option<NaiveDate>,
    pub gross_sales: f64,
    pub discounts: f64,
    pub net_sales: f64,
    /// Whole months between the last order and the as-of date.
    ///
    /// Not clamped: orders dated after the as-of date give a negative value.
    pub recency: Option<i64>,
}

/// Which customer metric a set of bins discretizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketAxis {
    Recency,
    Frequency,
}

impl BucketAxis {
    /// Prefix used in bucket labels (`R3`, `F1`).
    pub fn prefix(self) -> char {
        match self {
            BucketAxis::Recency => 'R',
            BucketAxis::Frequency => 'F',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BucketAxis::Recency => "recency",
            BucketAxis::Frequency => "frequency",
        }
    }
}

/// Validated, strictly increasing bin edges for one axis.
///
/// `k + 1` edges describe `k` half-open buckets. Only the final edge may be
/// `+inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges {
    axis: BucketAxis,
    edges: Vec<f64>,
}

impl BinEdges {
    pub fn new(axis: BucketAxis, edges: Vec<f64>) -> Result<Self, ConfigError> {
        if edges.len() < 2 {
            return Err(ConfigError::TooFewEdges {
                axis: axis.name(),
                count: edges.len(),
            });
        }

        let last = edges.len() - 1;
        for (index, &edge) in edges.iter().enumerate() {
            let allowed = edge.is_finite() || (index == last && edge == f64::INFINITY);
            if !allowed {
                return Err(ConfigError::InvalidEdge {
                    axis: axis.name(),
                    index,
                    value: edge.to_string(),
                });
            }
        }

        for (index, pair) in edges.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(ConfigError::NonIncreasingEdges {
                    axis: axis.name(),
                    index: index + 1,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }

        Ok(Self { axis, edges })
    }

    pub fn axis(&self) -> BucketAxis {
        self.axis
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of buckets (`edges - 1`).
    pub fn bucket_count(&self) -> usize {
        self.edges.len() - 1
    }
}

impl fmt::Display for BinEdges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .edges
            .iter()
            .map(|e| if e.is_infinite() { "inf".to_string() } else { e.to_string() })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

/// A labeled `[lower, upper)` interval on one axis.
///
/// The ordinal (1-based) is the sort key; the label is display-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub axis: BucketAxis,
    pub ordinal: u32,
    pub lower: f64,
    pub upper: f64,
}

impl Bucket {
    pub fn label(&self) -> String {
        format!("{}{}", self.axis.prefix(), self.ordinal)
    }
}

/// Composite stratification key: one frequency bucket × one recency bucket.
///
/// Orders by frequency ordinal, then recency ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentKey {
    pub frequency: u32,
    pub recency: u32,
}

impl SegmentKey {
    pub const SEPARATOR: char = '_';
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            BucketAxis::Frequency.prefix(),
            self.frequency,
            Self::SEPARATOR,
            BucketAxis::Recency.prefix(),
            self.recency
        )
    }
}

/// A customer that landed in a bucket on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCustomer {
    pub customer: CustomerRecord,
    pub recency_bucket: Bucket,
    pub frequency_bucket: Bucket,
}

impl SegmentedCustomer {
    pub fn segment(&self) -> SegmentKey {
        SegmentKey {
            frequency: self.frequency_bucket.ordinal,
            recency: self.recency_bucket.ordinal,
        }
    }
}

/// A named output partition with a population-wide target size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleGroup {
    pub name: String,
    #[serde(alias = "target")]
    pub size: u64,
}

impl SampleGroup {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

impl FromStr for SampleGroup {
    type Err = ConfigError;

    /// Parse `NAME=SIZE`, e.g. `Test=7500`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidGroupSpec(s.to_string());
        let (name, size) = s.split_once('=').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }
        check_group_name(name)?;
        let size = size.trim().parse::<u64>().map_err(|_| invalid())?;
        Ok(Self::new(name, size))
    }
}

/// Group names end up in output file names, so they must stay a single
/// path component.
fn check_group_name(name: &str) -> Result<(), ConfigError> {
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(ConfigError::InvalidGroupName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Ordered, validated sample groups.
///
/// The order is significant: it is the slicing order inside each segment and
/// the last group absorbs the remainder when a segment is short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTargets {
    groups: Vec<SampleGroup>,
}

impl GroupTargets {
    pub fn new(groups: Vec<SampleGroup>) -> Result<Self, ConfigError> {
        if groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        for (idx, group) in groups.iter().enumerate() {
            check_group_name(&group.name)?;
            if group.size == 0 {
                return Err(ConfigError::NonPositiveTarget {
                    name: group.name.clone(),
                });
            }
            if groups[..idx].iter().any(|g| g.name == group.name) {
                return Err(ConfigError::DuplicateGroup {
                    name: group.name.clone(),
                });
            }
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[SampleGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }
}

impl Default for GroupTargets {
    /// Test=7500, Control=7500, Holdout=15000.
    fn default() -> Self {
        Self {
            groups: vec![
                SampleGroup::new("Test", 7_500),
                SampleGroup::new("Control", 7_500),
                SampleGroup::new("Holdout", 15_000),
            ],
        }
    }
}

/// A segmented customer labeled with the sample group it was drawn into.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledCustomer {
    pub group: String,
    pub customer: SegmentedCustomer,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, an optional campaign file, and defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The "current date" recency is measured against.
    pub as_of: NaiveDate,
    pub recency_bins: BinEdges,
    pub frequency_bins: BinEdges,
    /// Inclusive upper bound on recency applied before bucketing.
    pub max_recency: Option<i64>,
    pub groups: GroupTargets,
    pub seed: u64,

    pub out_dir: PathBuf,
    /// Prefix for per-group output files.
    pub prefix: String,
}
