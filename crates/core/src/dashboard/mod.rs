//! Party dashboard figures.
//!
//! This module provides:
//! - Receivables and payables for a principal
//! - Daily and monthly sales totals

pub mod summary;
pub mod types;

pub use summary::SummaryCalculator;
pub use types::*;
