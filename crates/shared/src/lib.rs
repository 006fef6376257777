//! Shared types, errors, and configuration for Bahi.
//!
//! This crate provides common types used across all other crates:
//! - Typed integer IDs for entity references
//! - Money precision helpers over `rust_decimal`
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - JWT claims for the identity collaborator

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, InvoicingConfig, SequenceScopeConfig};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
