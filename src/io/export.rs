//! CSV exports: customer summary, segmented table, and sample groups.
//!
//! The files are meant to be easy to consume in spreadsheets or mail-house
//! tooling. Monetary columns are written with two decimals.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::domain::{CustomerRecord, SampledCustomer, SegmentedCustomer};
use crate::error::AppError;
use crate::io::ingest::SUMMARY_COLUMNS;
use crate::sample::SampleRun;

/// Customer-level summary written by every run that starts from orders.
pub const CUSTOMER_SUMMARY_FILE: &str = "customer_summary.csv";
/// Segmented customer table.
pub const SEGMENTED_FILE: &str = "segmented_customers.csv";

const SEGMENT_COLUMNS: [&str; 3] = ["recency_bucket", "frequency_bucket", "segment"];

fn create(path: &Path) -> Result<File, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", parent.display())))?;
    }
    File::create(path).map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn write_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display()))
}

fn summary_fields(c: &CustomerRecord) -> Vec<String> {
    vec![
        c.customer_id.clone(),
        c.customer_email.clone(),
        c.frequency.to_string(),
        c.last_order_date.map(|d| d.to_string()).unwrap_or_default(),
        format!("{:.2}", c.gross_sales),
        format!("{:.2}", c.discounts),
        format!("{:.2}", c.net_sales),
        c.recency.map(|r| r.to_string()).unwrap_or_default(),
    ]
}

fn segmented_fields(c: &SegmentedCustomer) -> Vec<String> {
    let mut fields = summary_fields(&c.customer);
    fields.push(c.recency_bucket.label());
    fields.push(c.frequency_bucket.label());
    fields.push(c.segment().to_string());
    fields
}

/// Write the customer-level summary.
pub fn write_customer_summary<W: Write>(out: W, customers: &[CustomerRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(SUMMARY_COLUMNS)?;
    for c in customers {
        writer.write_record(summary_fields(c))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the segmented table (summary columns + bucket columns).
pub fn write_segmented<W: Write>(out: W, customers: &[SegmentedCustomer]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(SUMMARY_COLUMNS.iter().chain(SEGMENT_COLUMNS.iter()))?;
    for c in customers {
        writer.write_record(segmented_fields(c))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write labeled sample rows (segmented columns + `group`).
pub fn write_sampled<W: Write>(out: W, customers: &[SampledCustomer]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(SUMMARY_COLUMNS.iter().chain(SEGMENT_COLUMNS.iter()).chain(["group"].iter()))?;
    for c in customers {
        let mut fields = segmented_fields(&c.customer);
        fields.push(c.group.clone());
        writer.write_record(fields)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_customer_summary(path: &Path, customers: &[CustomerRecord]) -> Result<(), AppError> {
    let file = create(path)?;
    write_customer_summary(file, customers).map_err(|e| write_err(path, e))?;
    info!("wrote {} customers to {}", customers.len(), path.display());
    Ok(())
}

pub fn export_segmented(path: &Path, customers: &[SegmentedCustomer]) -> Result<(), AppError> {
    let file = create(path)?;
    write_segmented(file, customers).map_err(|e| write_err(path, e))?;
    info!("wrote {} segmented customers to {}", customers.len(), path.display());
    Ok(())
}

/// Write `{prefix}{Group}_Group.csv` for every group plus
/// `{prefix}Combined_Groups.csv`. Returns the written paths.
pub fn export_sample_groups(dir: &Path, prefix: &str, run: &SampleRun) -> Result<Vec<PathBuf>, AppError> {
    let mut written = Vec::with_capacity(run.groups.len() + 1);
    let combined = run.combined();

    for group in &run.groups {
        let path = dir.join(format!("{prefix}{}_Group.csv", group.group.name));
        let rows: Vec<SampledCustomer> = combined
            .iter()
            .filter(|c| c.group == group.group.name)
            .cloned()
            .collect();
        let file = create(&path)?;
        write_sampled(file, &rows).map_err(|e| write_err(&path, e))?;
        written.push(path);
    }

    let path = dir.join(format!("{prefix}Combined_Groups.csv"));
    let file = create(&path)?;
    write_sampled(file, &combined).map_err(|e| write_err(&path, e))?;
    written.push(path);

    info!("wrote {} sample files to {}", written.len(), dir.display());
    Ok(written)
}
