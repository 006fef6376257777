//! Entity re-exports.

pub use super::invoice_counters::Entity as InvoiceCounters;
pub use super::invoice_line_items::Entity as InvoiceLineItems;
pub use super::invoices::Entity as Invoices;
pub use super::payments::Entity as Payments;
pub use super::users::Entity as Users;
