//! Customer-level RFM aggregation.

pub mod aggregate;

pub use aggregate::{CustomerSummary, aggregate_customers, months_between};
