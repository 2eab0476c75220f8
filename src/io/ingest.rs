//! CSV ingest and cleaning.
//!
//! This module turns order-history exports into clean `OrderRow`s, and reloads
//! customer summaries written by a previous `aggregate` run.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level cleaning** (drop rows without ids, but report what happened)
//! - **Lenient values** (unparseable dates become missing, blank money is 0)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use log::{debug, info, warn};

use crate::domain::{CustomerRecord, OrderRow};
use crate::error::{AppError, DataError, SegmentationError};

/// Columns every order file must carry.
pub const ORDER_COLUMNS: [&str; 7] = [
    "customer_id",
    "order_id",
    "day",
    "customer_email",
    "gross_sales",
    "discounts",
    "net_sales",
];

/// Columns of a customer summary file.
pub const SUMMARY_COLUMNS: [&str; 8] = [
    "customer_id",
    "customer_email",
    "frequency",
    "last_order_date",
    "gross_sales",
    "discounts",
    "net_sales",
    "recency",
];

/// A row dropped during cleaning.
#[derive(Debug, Clone)]
pub struct RowError {
    pub source: String,
    pub line: usize,
    pub message: String,
}

/// Ingest output: cleaned rows + what was dropped.
#[derive(Debug, Clone, Default)]
pub struct IngestedOrders {
    pub rows: Vec<OrderRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows kept whose `day` could not be parsed (kept with a missing date).
    pub undated_rows: usize,
}

impl IngestedOrders {
    pub fn rows_used(&self) -> usize {
        self.rows.len()
    }
}

/// Load and concatenate order files, in the given order.
pub fn load_order_files(paths: &[PathBuf]) -> Result<IngestedOrders, AppError> {
    let mut out = IngestedOrders::default();
    for path in paths {
        let file = open(path)?;
        let part = read_orders(file, &path.display().to_string())?;
        out.rows.extend(part.rows);
        out.row_errors.extend(part.row_errors);
        out.rows_read += part.rows_read;
        out.undated_rows += part.undated_rows;
    }

    if !out.row_errors.is_empty() {
        warn!("dropped {} order row(s) during cleaning", out.row_errors.len());
    }
    if out.undated_rows > 0 {
        warn!("{} order row(s) have an unparseable `day`", out.undated_rows);
    }
    info!(
        "read {} order rows from {} file(s), kept {}",
        out.rows_read,
        paths.len(),
        out.rows_used()
    );

    if out.rows.is_empty() {
        return Err(SegmentationError::from(DataError::NoOrderRows).into());
    }
    Ok(out)
}

/// Parse and clean one order CSV.
pub fn read_orders<R: Read>(reader: R, source: &str) -> Result<IngestedOrders, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers in '{source}': {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_columns(&header_map, &ORDER_COLUMNS)?;

    let mut out = IngestedOrders::default();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        out.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                out.row_errors.push(RowError {
                    source: source.to_string(),
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_order_row(&record, &header_map) {
            Ok((row, dated)) => {
                if !dated {
                    out.undated_rows += 1;
                }
                out.rows.push(row);
            }
            Err(message) => out.row_errors.push(RowError {
                source: source.to_string(),
                line,
                message,
            }),
        }
    }

    debug!("{source}: {} rows read, {} kept", out.rows_read, out.rows_used());
    Ok(out)
}

/// Load a customer summary previously written by `write_customer_summary`.
pub fn load_customer_summary(path: &Path) -> Result<Vec<CustomerRecord>, AppError> {
    let file = open(path)?;
    let customers = read_customer_summary(file)?;
    info!("loaded {} customers from {}", customers.len(), path.display());
    Ok(customers)
}

pub fn read_customer_summary<R: Read>(reader: R) -> Result<Vec<CustomerRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read summary headers: {e}")))?
        .clone();
    ensure_columns(&build_header_map(&headers), &SUMMARY_COLUMNS)?;

    let mut customers = Vec::new();
    for (idx, result) in reader.deserialize::<CustomerRecord>().enumerate() {
        let record = result.map_err(|e| AppError::new(2, format!("Invalid summary row at line {}: {e}", idx + 2)))?;
        customers.push(record);
    }
    Ok(customers)
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often start with a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_columns(header_map: &HashMap<String, usize>, required: &[&str]) -> Result<(), AppError> {
    for name in required {
        if !header_map.contains_key(*name) {
            return Err(SegmentationError::from(DataError::MissingColumn((*name).to_string())).into());
        }
    }
    Ok(())
}

/// Returns the row and whether its `day` parsed.
fn parse_order_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<(OrderRow, bool), String> {
    let customer_id = get_required(record, header_map, "customer_id")?.to_string();
    let order_id = get_required(record, header_map, "order_id")?.to_string();
    let customer_email = get_optional(record, header_map, "customer_email").map(str::to_string);

    let day = get_optional(record, header_map, "day").and_then(parse_day);
    let dated = day.is_some();

    Ok((
        OrderRow {
            customer_id,
            customer_email,
            order_id,
            day,
            gross_sales: parse_money(get_optional(record, header_map, "gross_sales")),
            discounts: parse_money(get_optional(record, header_map, "discounts")),
            net_sales: parse_money(get_optional(record, header_map, "net_sales")),
        },
        dated,
    ))
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an order date; `None` when no known format matches.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    // Shop exports carry an offset, e.g. `2024-03-01 09:15:00 -0500`.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    None
}

fn parse_money(s: Option<&str>) -> f64 {
    let Some(s) = s else { return 0.0 };
    let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            debug!("treating unparseable amount '{s}' as 0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = "\u{feff}Customer_ID,order_id,day,customer_email,gross_sales,discounts,net_sales
c1,o1,2024-01-05,a@x.com,10.00,-1.00,9.00
c1,o2,2024-02-05 10:30:00,a@x.com,\"$1,000.50\",0,1000.50
,o3,2024-02-05,b@x.com,1,0,1
c2,,2024-02-05,b@x.com,1,0,1
c3,o4,not-a-date,,5,,5
";

    #[test]
    fn cleans_rows_and_reports_drops() {
        let ingest = read_orders(ORDERS.as_bytes(), "orders.csv").unwrap();
        assert_eq!(ingest.rows_read, 5);
        assert_eq!(ingest.rows_used(), 3);
        assert_eq!(ingest.undated_rows, 1);

        let lines: Vec<usize> = ingest.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, [4, 5]);
        assert!(ingest.row_errors[0].message.contains("customer_id"));

        let second = &ingest.rows[1];
        assert_eq!(second.day, NaiveDate::from_ymd_opt(2024, 2, 5));
        assert!((second.gross_sales - 1000.5).abs() < 1e-9);

        let third = &ingest.rows[2];
        assert_eq!(third.customer_email, None);
        assert_eq!(third.day, None);
        assert_eq!(third.discounts, 0.0);
    }

    #[test]
    fn missing_column_is_rejected() {
        let csv = "customer_id,order_id,day,customer_email\nc1,o1,2024-01-01,a@x.com\n";
        let err = read_orders(csv.as_bytes(), "orders.csv").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("gross_sales"), "{err}");
    }

    #[test]
    fn parse_day_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(parse_day("2024-03-01"), d);
        assert_eq!(parse_day("01/03/2024"), d);
        assert_eq!(parse_day("2024/03/01"), d);
        assert_eq!(parse_day("2024-03-01T23:59:00"), d);
        assert_eq!(parse_day("2024-03-01 09:15:00 -0500"), d);
        assert_eq!(parse_day("March 1st"), None);
    }

    #[test]
    fn reads_summary_with_missing_optional_cells() {
        let csv = "customer_id,customer_email,frequency,last_order_date,gross_sales,discounts,net_sales,recency
c1,a@x.com,3,2024-01-31,10.00,0.00,10.00,4
c2,b@x.com,1,,0.00,0.00,0.00,
";
        let customers = read_customer_summary(csv.as_bytes()).unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].recency, Some(4));
        assert_eq!(customers[0].frequency, 3);
        assert_eq!(customers[1].recency, None);
        assert_eq!(customers[1].last_order_date, None);
    }
}
