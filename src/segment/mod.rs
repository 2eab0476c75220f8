//! Recency × frequency segmentation.
//!
//! - `bins`: edge parsing/validation and half-open bucket lookup
//! - `segmenter`: max-recency pre-filter, two-axis assignment, segment grouping

pub mod bins;
pub mod segmenter;

pub use bins::{DEFAULT_FREQUENCY_BINS, DEFAULT_RECENCY_BINS, bucket_for, buckets, parse_bin_edges};
pub use segmenter::{
    SegmentationStats, SegmentedTable, apply_recency_filter, assign_segments, group_by_segment, segment_counts,
    segment_customers,
};
