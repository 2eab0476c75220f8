//! Command-line parsing for the RFM segmentation & sampling tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the segmentation/sampling code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::SampleGroup;
use crate::segment::{DEFAULT_FREQUENCY_BINS, DEFAULT_RECENCY_BINS};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_MAX_RECENCY: i64 = 36;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rfm", version, about = "RFM Segmentation & Stratified Sampling")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate order CSVs into a customer summary (frequency, recency, monetary).
    Aggregate(AggregateArgs),
    /// Bucket customers by recency × frequency and print the RF pivot.
    Segment(SegmentArgs),
    /// Segment, then draw seeded stratified sample groups and export them.
    Sample(SampleArgs),
}

/// Options for `rfm aggregate`.
#[derive(Debug, Parser, Clone)]
pub struct AggregateArgs {
    /// Order history CSV(s); several files are concatenated in order.
    #[arg(long, value_name = "CSV", num_args = 1.., required = true)]
    pub orders: Vec<PathBuf>,

    /// Date recency is measured against (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Directory for `customer_summary.csv`.
    #[arg(long, default_value = "data/processed")]
    pub out_dir: PathBuf,
}

/// Where customers come from: raw orders or a saved summary.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Order history CSV(s); several files are concatenated in order.
    #[arg(
        long,
        value_name = "CSV",
        num_args = 1..,
        required_unless_present = "summary",
        conflicts_with = "summary"
    )]
    pub orders: Vec<PathBuf>,

    /// Customer summary CSV written by `rfm aggregate`.
    #[arg(long, value_name = "CSV")]
    pub summary: Option<PathBuf>,

    /// Date recency is measured against (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,
}

/// Options for `rfm segment` (and the segmenting half of `rfm sample`).
#[derive(Debug, Args, Clone)]
pub struct SegmentArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Recency bin edges in months, e.g. "0,1,2,3,inf".
    #[arg(long, default_value = DEFAULT_RECENCY_BINS)]
    pub recency_bins: String,

    /// Frequency bin edges in orders, e.g. "1,2,3,inf".
    #[arg(long, default_value = DEFAULT_FREQUENCY_BINS)]
    pub frequency_bins: String,

    /// Keep only customers with recency <= this many months.
    #[arg(long, default_value_t = DEFAULT_MAX_RECENCY)]
    pub max_recency: i64,

    /// Disable the max-recency pre-filter.
    #[arg(long)]
    pub no_max_recency: bool,

    /// Campaign JSON file; its values override the flags above.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Output directory for CSV exports.
    #[arg(long, default_value = "data/processed")]
    pub out_dir: PathBuf,
}

/// Sampling options.
#[derive(Debug, Args, Clone)]
pub struct SamplingArgs {
    /// Sample group as NAME=SIZE; repeat for several groups, in slicing order.
    /// Defaults to Test=7500, Control=7500, Holdout=15000.
    #[arg(long = "group", value_name = "NAME=SIZE")]
    pub groups: Vec<SampleGroup>,

    /// Random seed for the per-segment shuffles.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Prefix for the per-group output files.
    #[arg(long, default_value = "")]
    pub prefix: String,
}

impl Default for SamplingArgs {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            seed: DEFAULT_SEED,
            prefix: String::new(),
        }
    }
}

/// Options for `rfm sample`.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    #[command(flatten)]
    pub segment: SegmentArgs,

    #[command(flatten)]
    pub sampling: SamplingArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_parses_repeated_groups_in_order() {
        let cli = Cli::try_parse_from([
            "rfm", "sample", "--orders", "a.csv", "b.csv", "--group", "A=10", "--group", "B=20", "--seed", "7",
        ])
        .unwrap();
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.segment.input.orders.len(), 2);
        assert_eq!(args.sampling.groups, vec![SampleGroup::new("A", 10), SampleGroup::new("B", 20)]);
        assert_eq!(args.sampling.seed, 7);
        assert_eq!(args.segment.max_recency, DEFAULT_MAX_RECENCY);
        assert_eq!(args.segment.recency_bins, DEFAULT_RECENCY_BINS);
    }

    #[test]
    fn input_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["rfm", "segment"]).is_err());
        assert!(Cli::try_parse_from(["rfm", "segment", "--orders", "a.csv", "--summary", "s.csv"]).is_err());
        assert!(Cli::try_parse_from(["rfm", "segment", "--summary", "s.csv", "--as-of", "2024-06-30"]).is_ok());
    }

    #[test]
    fn malformed_group_is_a_parse_error() {
        assert!(Cli::try_parse_from(["rfm", "sample", "--summary", "s.csv", "--group", "Test"]).is_err());
    }
}
