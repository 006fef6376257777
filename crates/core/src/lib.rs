//! Core business logic for Bahi.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `invoice` - Invoice lifecycle, GST calculation and payment settlement
//! - `dashboard` - Receivables, payables and sales summaries

pub mod dashboard;
pub mod invoice;
