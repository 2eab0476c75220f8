//! Input/output helpers.
//!
//! - order/summary CSV ingest + cleaning (`ingest`)
//! - summary, segmented, and sample-group CSV exports (`export`)
//! - campaign JSON read/write (`campaign`)

pub mod campaign;
pub mod export;
pub mod ingest;

pub use campaign::*;
pub use export::*;
pub use ingest::*;
