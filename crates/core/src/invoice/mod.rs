//! Invoice lifecycle and payment settlement.
//!
//! This module provides:
//! - GST line and total calculation
//! - Invoice number allocation rules
//! - Party-based access rules
//! - Payment ledger and settlement derivation
//! - The invoice service over a pluggable repository

pub mod access;
pub mod calculator;
pub mod error;
pub mod lifecycle;
pub mod numbering;
pub mod service;
pub mod settlement;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use access::{AccessPolicy, Principal, Visibility};
pub use calculator::{Calculator, GstRateTable};
pub use error::{ErrorKind, InvoiceError};
pub use lifecycle::LifecycleRules;
pub use numbering::{InvoiceNumber, NumberingAuthority, SequenceScope};
pub use service::{InvoiceRepository, InvoiceService, InvoiceSettings};
pub use settlement::{PaymentLedger, Settlement};
pub use types::{
    ComputedInvoice, ComputedLineItem, Invoice, InvoiceBalanceRow, InvoiceDraft, InvoiceTotals,
    InvoiceType, LineItem, LineItemDraft, NewInvoice, NewPayment, Payment, PaymentDraft,
    PaymentMethod, PaymentReceipt, PaymentStatus, PreparedInvoice,
};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryInvoiceRepository;
