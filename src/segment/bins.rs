//! Bin-edge parsing and half-open bucket lookup.
//!
//! A value `v` belongs to bucket `i` (1-based) iff `edges[i-1] <= v < edges[i]`.
//! Values below the first edge or at/above the last edge have no bucket.

use crate::domain::{BinEdges, Bucket, BucketAxis};
use crate::error::ConfigError;

/// Default recency edges (months).
pub const DEFAULT_RECENCY_BINS: &str = "0,1,2,3,4,5,6,7,13,25,37";
/// Default frequency edges (distinct orders).
pub const DEFAULT_FREQUENCY_BINS: &str = "1,2,3,4,5,inf";

/// Parse a comma-separated edge list such as `"1,2,3,inf"`.
///
/// `inf`, `+inf`, and `infinity` (any case) are accepted as the unbounded
/// sentinel; validation then only allows it in the final position.
pub fn parse_bin_edges(axis: BucketAxis, input: &str) -> Result<BinEdges, ConfigError> {
    let mut edges = Vec::new();
    for (index, raw) in input.split(',').enumerate() {
        let token = raw.trim();
        let value = match token.to_ascii_lowercase().as_str() {
            "inf" | "+inf" | "infinity" | "+infinity" => f64::INFINITY,
            _ => token.parse::<f64>().map_err(|_| ConfigError::InvalidEdge {
                axis: axis.name(),
                index,
                value: token.to_string(),
            })?,
        };
        edges.push(value);
    }
    BinEdges::new(axis, edges)
}

/// All buckets described by `edges`, in ascending ordinal order.
pub fn buckets(edges: &BinEdges) -> Vec<Bucket> {
    edges
        .edges()
        .windows(2)
        .enumerate()
        .map(|(idx, pair)| Bucket {
            axis: edges.axis(),
            ordinal: (idx + 1) as u32,
            lower: pair[0],
            upper: pair[1],
        })
        .collect()
}

/// The bucket containing `value`, if any.
pub fn bucket_for(edges: &BinEdges, value: f64) -> Option<Bucket> {
    let e = edges.edges();
    // Number of edges <= value; bucket `i` needs exactly `i` of them.
    let idx = e.partition_point(|edge| *edge <= value);
    if idx == 0 || idx >= e.len() {
        return None;
    }
    Some(Bucket {
        axis: edges.axis(),
        ordinal: idx as u32,
        lower: e[idx - 1],
        upper: e[idx],
    })
}
