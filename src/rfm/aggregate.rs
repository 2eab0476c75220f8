//! Order lines → one RFM row per customer.
//!
//! Rows are folded into an explicit `(customer_id, customer_email)` →
//! accumulator map and each accumulator is finalized exactly once. No
//! customer is dropped before aggregation; customers without an email are
//! removed only from the finalized output.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use log::{info, warn};

use crate::domain::{CustomerRecord, OrderRow};
use crate::error::{DataError, Result};

/// Aggregation output.
#[derive(Debug, Clone)]
pub struct CustomerSummary {
    /// Sorted by `(customer_id, customer_email)`.
    pub customers: Vec<CustomerRecord>,
    /// Customers removed after aggregation because their email was blank.
    pub dropped_missing_email: usize,
}

#[derive(Debug, Default)]
struct CustomerAccumulator {
    order_ids: HashSet<String>,
    last_order_date: Option<NaiveDate>,
    gross_sales: f64,
    discounts: f64,
    net_sales: f64,
}

impl CustomerAccumulator {
    fn update(&mut self, row: &OrderRow) {
        if !self.order_ids.contains(&row.order_id) {
            self.order_ids.insert(row.order_id.clone());
        }
        if let Some(day) = row.day {
            self.last_order_date = Some(self.last_order_date.map_or(day, |d| d.max(day)));
        }
        self.gross_sales += row.gross_sales;
        self.discounts += row.discounts;
        self.net_sales += row.net_sales;
    }

    fn finalize(self, customer_id: String, customer_email: String, as_of: NaiveDate) -> CustomerRecord {
        CustomerRecord {
            customer_id,
            customer_email,
            frequency: self.order_ids.len() as u64,
            last_order_date: self.last_order_date,
            gross_sales: self.gross_sales,
            discounts: self.discounts,
            net_sales: self.net_sales,
            recency: self.last_order_date.map(|d| months_between(d, as_of)),
        }
    }
}

/// Whole calendar months from `last_order` to `as_of`.
///
/// Only year and month take part, so any two days in the same month are 0
/// apart. Negative when `last_order` is in a later month than `as_of`.
pub fn months_between(last_order: NaiveDate, as_of: NaiveDate) -> i64 {
    let years = i64::from(as_of.year()) - i64::from(last_order.year());
    let months = i64::from(as_of.month()) - i64::from(last_order.month());
    years * 12 + months
}

/// Reduce cleaned order rows to one `CustomerRecord` per customer.
pub fn aggregate_customers(rows: &[OrderRow], as_of: NaiveDate) -> Result<CustomerSummary> {
    if rows.is_empty() {
        return Err(DataError::NoOrderRows.into());
    }

    let mut accumulators: BTreeMap<(String, Option<String>), CustomerAccumulator> = BTreeMap::new();
    for row in rows {
        accumulators
            .entry((row.customer_id.clone(), row.customer_email.clone()))
            .or_default()
            .update(row);
    }

    let mut customers = Vec::with_capacity(accumulators.len());
    let mut dropped_missing_email = 0usize;
    for ((customer_id, email), acc) in accumulators {
        match email {
            Some(email) => customers.push(acc.finalize(customer_id, email, as_of)),
            None => dropped_missing_email += 1,
        }
    }

    if dropped_missing_email > 0 {
        warn!("dropped {dropped_missing_email} customer(s) without an email after aggregation");
    }
    info!(
        "aggregated {} order rows into {} customers (as of {as_of})",
        rows.len(),
        customers.len()
    );

    Ok(CustomerSummary {
        customers,
        dropped_missing_email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SegmentationError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(customer: &str, email: Option<&str>, order: &str, day: Option<NaiveDate>, net: f64) -> OrderRow {
        OrderRow {
            customer_id: customer.to_string(),
            customer_email: email.map(str::to_string),
            order_id: order.to_string(),
            day,
            gross_sales: net + 1.0,
            discounts: -1.0,
            net_sales: net,
        }
    }

    #[test]
    fn months_between_uses_calendar_months() {
        assert_eq!(months_between(date(2024, 3, 31), date(2024, 3, 1)), 0);
        assert_eq!(months_between(date(2023, 11, 15), date(2024, 2, 1)), 3);
        assert_eq!(months_between(date(2024, 5, 1), date(2024, 3, 1)), -2);
    }

    #[test]
    fn aggregates_distinct_orders_and_sums() {
        let rows = vec![
            row("c1", Some("a@x.com"), "o1", Some(date(2024, 1, 10)), 10.0),
            row("c1", Some("a@x.com"), "o1", Some(date(2024, 1, 10)), 5.0),
            row("c1", Some("a@x.com"), "o2", Some(date(2024, 4, 2)), 20.0),
            row("c2", Some("b@x.com"), "o3", Some(date(2023, 12, 31)), 7.5),
        ];
        let summary = aggregate_customers(&rows, date(2024, 6, 15)).unwrap();
        assert_eq!(summary.customers.len(), 2);

        let c1 = &summary.customers[0];
        assert_eq!(c1.customer_id, "c1");
        assert_eq!(c1.frequency, 2);
        assert_eq!(c1.last_order_date, Some(date(2024, 4, 2)));
        assert_eq!(c1.recency, Some(2));
        assert!((c1.net_sales - 35.0).abs() < 1e-9);
        assert!((c1.gross_sales - 38.0).abs() < 1e-9);
        assert!((c1.discounts + 3.0).abs() < 1e-9);

        let c2 = &summary.customers[1];
        assert_eq!(c2.recency, Some(6));
        assert_eq!(c2.frequency, 1);
    }

    #[test]
    fn future_orders_give_negative_recency() {
        let rows = vec![row("c1", Some("a@x.com"), "o1", Some(date(2025, 2, 1)), 1.0)];
        let summary = aggregate_customers(&rows, date(2024, 12, 1)).unwrap();
        assert_eq!(summary.customers[0].recency, Some(-2));
    }

    #[test]
    fn missing_email_dropped_after_aggregation() {
        let rows = vec![
            row("c1", None, "o1", Some(date(2024, 1, 1)), 1.0),
            row("c1", None, "o2", Some(date(2024, 1, 2)), 1.0),
            row("c1", Some("a@x.com"), "o3", Some(date(2024, 1, 3)), 1.0),
        ];
        let summary = aggregate_customers(&rows, date(2024, 2, 1)).unwrap();
        assert_eq!(summary.dropped_missing_email, 1);
        assert_eq!(summary.customers.len(), 1);
        assert_eq!(summary.customers[0].frequency, 1);
    }

    #[test]
    fn undated_customer_has_no_recency() {
        let rows = vec![row("c1", Some("a@x.com"), "o1", None, 1.0)];
        let summary = aggregate_customers(&rows, date(2024, 2, 1)).unwrap();
        assert_eq!(summary.customers[0].recency, None);
        assert_eq!(summary.customers[0].last_order_date, None);
    }

    #[test]
    fn empty_input_is_a_data_error() {
        let err = aggregate_customers(&[], date(2024, 1, 1)).unwrap_err();
        assert_eq!(err, SegmentationError::Data(DataError::NoOrderRows));
    }
}
