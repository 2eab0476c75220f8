//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! orders -> clean -> aggregate -> pre-filter + bucket -> allocate + sample
//!
//! Each stage is a pure function of its input and the `RunConfig`; the
//! subcommands only differ in where they stop and what they write.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::domain::{CustomerRecord, OrderRow, RunConfig};
use crate::error::{AppError, Result};
use crate::io::ingest::{IngestedOrders, load_customer_summary, load_order_files};
use crate::rfm::{CustomerSummary, aggregate_customers};
use crate::sample::{SampleRun, stratified_sample};
use crate::segment::{SegmentedTable, segment_customers};

/// Where customer data comes from.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Raw order-history CSVs, concatenated in order.
    Orders(Vec<PathBuf>),
    /// A customer summary written by a previous `aggregate` run.
    Summary(PathBuf),
}

/// Customer summary plus, when built from orders, the ingest report.
#[derive(Debug, Clone)]
pub struct LoadedCustomers {
    pub ingest: Option<IngestedOrders>,
    pub summary: CustomerSummary,
}

/// All computed outputs of a segment + sample run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub segmented: SegmentedTable,
    pub sample: SampleRun,
}

/// Read the input source and produce the customer summary.
pub fn load_customers(source: &InputSource, as_of: NaiveDate) -> std::result::Result<LoadedCustomers, AppError> {
    match source {
        InputSource::Orders(paths) => {
            let ingest = load_order_files(paths)?;
            let summary = aggregate_customers(&ingest.rows, as_of)?;
            Ok(LoadedCustomers {
                ingest: Some(ingest),
                summary,
            })
        }
        InputSource::Summary(path) => {
            let customers = load_customer_summary(path)?;
            Ok(LoadedCustomers {
                ingest: None,
                summary: CustomerSummary {
                    customers,
                    dropped_missing_email: 0,
                },
            })
        }
    }
}

/// Pre-filter and bucket customers per the configured edges.
pub fn run_segmentation(customers: &[CustomerRecord], config: &RunConfig) -> Result<SegmentedTable> {
    segment_customers(
        customers,
        &config.recency_bins,
        &config.frequency_bins,
        config.max_recency,
    )
}

/// Segment, then allocate and sample every segment.
pub fn run_sampling(customers: &[CustomerRecord], config: &RunConfig) -> Result<RunOutput> {
    let segmented = run_segmentation(customers, config)?;
    let sample = stratified_sample(&segmented.customers, &config.groups, config.seed)?;
    Ok(RunOutput { segmented, sample })
}

/// Full in-memory run from cleaned order rows.
pub fn run_from_orders(rows: &[OrderRow], config: &RunConfig) -> Result<(CustomerSummary, RunOutput)> {
    let summary = aggregate_customers(rows, config.as_of)?;
    let output = run_sampling(&summary.customers, config)?;
    Ok((summary, output))
}
