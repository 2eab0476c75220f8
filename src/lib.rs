//! `rfm-sampler` library crate.
//!
//! The binary (`rfm`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the aggregation, segmentation, and sampling stages are reusable on
//!   their own (e.g., from a scheduler or notebook)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod rfm;
pub mod sample;
pub mod segment;
