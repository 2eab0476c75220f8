//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input/output rows (`OrderRow`, `CustomerRecord`, `SegmentedCustomer`, `SampledCustomer`)
//! - bucketing primitives (`BinEdges`, `Bucket`, `SegmentKey`)
//! - sampling configuration (`SampleGroup`, `GroupTargets`, `RunConfig`)

pub mod types;

pub use types::*;
