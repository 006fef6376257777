//! `SeaORM` entity definitions.

pub mod prelude;

pub mod invoice_counters;
pub mod invoice_line_items;
pub mod invoices;
pub mod payments;
pub mod sea_orm_active_enums;
pub mod users;
