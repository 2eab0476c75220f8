//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves flags + campaign file into a `RunConfig`
//! - loads orders or a saved customer summary
//! - runs segmentation and sampling
//! - prints reports and writes exports

use chrono::{Local, NaiveDate};
use clap::Parser;
use log::{info, warn};

use crate::cli::{AggregateArgs, Command, SampleArgs, SamplingArgs, SegmentArgs};
use crate::domain::{BucketAxis, GroupTargets, RunConfig};
use crate::error::{AppError, SegmentationError};
use crate::io::campaign::{CampaignFile, RUN_CONFIG_FILE, read_campaign_json, write_campaign_json};
use crate::io::export::{
    CUSTOMER_SUMMARY_FILE, SEGMENTED_FILE, export_customer_summary, export_sample_groups, export_segmented,
};
use crate::io::ingest::IngestedOrders;
use crate::report::{
    format_allocations, format_group_sizes, format_pivot, format_run_summary, format_segmentation, group_pivots,
    rf_pivot,
};
use crate::segment::parse_bin_edges;

use self::pipeline::{InputSource, LoadedCustomers};

pub mod pipeline;

/// Row issues echoed to the log; the rest are only counted.
const MAX_ROW_ERRORS_SHOWN: usize = 10;

/// Entry point for the `rfm` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Aggregate(args) => handle_aggregate(args),
        Command::Segment(args) => handle_segment(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_aggregate(args: AggregateArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(today);
    let loaded = pipeline::load_customers(&InputSource::Orders(args.orders.clone()), as_of)?;
    log_row_errors(loaded.ingest.as_ref());

    println!(
        "{}",
        format_run_summary(as_of, loaded.ingest.as_ref(), &loaded.summary)
    );

    export_customer_summary(&args.out_dir.join(CUSTOMER_SUMMARY_FILE), &loaded.summary.customers)?;
    Ok(())
}

fn handle_segment(args: SegmentArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args, &SamplingArgs::default())?;
    let loaded = load(&args, &config)?;

    let segmented = pipeline::run_segmentation(&loaded.summary.customers, &config)?;

    print!(
        "{}",
        format_run_summary(config.as_of, loaded.ingest.as_ref(), &loaded.summary)
    );
    println!("{}", format_segmentation(&config, &segmented.stats));
    println!("{}", format_pivot("Segmented customers", &rf_pivot(&segmented.customers)));

    export_summary(&loaded, &config)?;
    export_segmented(&config.out_dir.join(SEGMENTED_FILE), &segmented.customers)?;
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.segment, &args.sampling)?;
    let loaded = load(&args.segment, &config)?;

    // Nothing is written unless the whole run succeeds.
    let output = pipeline::run_sampling(&loaded.summary.customers, &config)?;

    print!(
        "{}",
        format_run_summary(config.as_of, loaded.ingest.as_ref(), &loaded.summary)
    );
    println!("{}", format_segmentation(&config, &output.segmented.stats));
    println!("{}", format_pivot("Segmented customers", &rf_pivot(&output.segmented.customers)));
    println!("{}", format_allocations(&output.sample, &config.groups));
    println!("{}", format_group_sizes(&output.sample, config.seed));
    for (name, pivot) in group_pivots(&output.sample) {
        println!("{}", format_pivot(&format!("{name} group"), &pivot));
    }

    export_summary(&loaded, &config)?;
    export_segmented(&config.out_dir.join(SEGMENTED_FILE), &output.segmented.customers)?;
    let written = export_sample_groups(&config.out_dir, &config.prefix, &output.sample)?;
    write_campaign_json(&config.out_dir.join(RUN_CONFIG_FILE), &config)?;
    info!(
        "sampled {} customers into {} file(s) under {}",
        output.sample.total_sampled(),
        written.len(),
        config.out_dir.display()
    );
    Ok(())
}

fn load(args: &SegmentArgs, config: &RunConfig) -> Result<LoadedCustomers, AppError> {
    let source = match &args.input.summary {
        Some(path) => InputSource::Summary(path.clone()),
        None => InputSource::Orders(args.input.orders.clone()),
    };
    let loaded = pipeline::load_customers(&source, config.as_of)?;
    log_row_errors(loaded.ingest.as_ref());
    Ok(loaded)
}

/// Save the customer summary when it was built from raw orders.
fn export_summary(loaded: &LoadedCustomers, config: &RunConfig) -> Result<(), AppError> {
    if loaded.ingest.is_none() {
        return Ok(());
    }
    export_customer_summary(&config.out_dir.join(CUSTOMER_SUMMARY_FILE), &loaded.summary.customers)
}

/// Build the run configuration from flags and the optional campaign file.
pub fn run_config_from_args(args: &SegmentArgs, sampling: &SamplingArgs) -> Result<RunConfig, AppError> {
    let campaign = match &args.config {
        Some(path) => read_campaign_json(path)?,
        None => CampaignFile::default(),
    };
    let as_of = args.input.as_of.unwrap_or_else(today);
    resolve_run_config(args, sampling, campaign, as_of)
}

/// Merge flags with a campaign file; values present in the file win.
pub fn resolve_run_config(
    args: &SegmentArgs,
    sampling: &SamplingArgs,
    campaign: CampaignFile,
    as_of: NaiveDate,
) -> Result<RunConfig, AppError> {
    let recency = campaign.recency_bins.as_deref().unwrap_or(&args.recency_bins);
    let frequency = campaign.frequency_bins.as_deref().unwrap_or(&args.frequency_bins);
    let recency_bins = parse_bin_edges(BucketAxis::Recency, recency).map_err(SegmentationError::from)?;
    let frequency_bins = parse_bin_edges(BucketAxis::Frequency, frequency).map_err(SegmentationError::from)?;

    let max_recency = match campaign.max_recency {
        Some(max) => Some(max),
        None if campaign.no_max_recency || args.no_max_recency => None,
        None => Some(args.max_recency),
    };

    let groups = match campaign.groups {
        Some(groups) => GroupTargets::new(groups).map_err(SegmentationError::from)?,
        None if sampling.groups.is_empty() => GroupTargets::default(),
        None => GroupTargets::new(sampling.groups.clone()).map_err(SegmentationError::from)?,
    };

    Ok(RunConfig {
        as_of,
        recency_bins,
        frequency_bins,
        max_recency,
        groups,
        seed: campaign.seed.unwrap_or(sampling.seed),
        out_dir: args.out_dir.clone(),
        prefix: campaign.prefix.unwrap_or_else(|| sampling.prefix.clone()),
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn log_row_errors(ingest: Option<&IngestedOrders>) {
    let Some(ingest) = ingest else { return };
    for e in ingest.row_errors.iter().take(MAX_ROW_ERRORS_SHOWN) {
        warn!("{}:{}: {}", e.source, e.line, e.message);
    }
    if ingest.row_errors.len() > MAX_ROW_ERRORS_SHOWN {
        warn!("... and {} more dropped row(s)", ingest.row_errors.len() - MAX_ROW_ERRORS_SHOWN);
    }
}
