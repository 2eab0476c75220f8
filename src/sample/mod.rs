//! Proportional allocation and seeded stratified sampling.
//!
//! The flow per run:
//! - `allocation`: per-segment group counts (round-half-up, shortfall scaling)
//! - `rng`: one seeded generator per segment
//! - `sampler`: canonical order → shuffle → slice → label

pub mod allocation;
pub mod rng;
pub mod sampler;

pub use allocation::{SegmentAllocation, allocate, allocate_segment, desired_counts, scale_round_half_up};
pub use rng::{derive_segment_seed, segment_rng};
pub use sampler::{GroupSample, SampleRun, sample_segment, stratified_sample};
