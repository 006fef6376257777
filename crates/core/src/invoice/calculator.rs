//! Line item and invoice total calculation.
//!
//! Rounding happens per line (half away from zero) before summation, so the
//! totals always equal the sum of what is printed on each line.

use rust_decimal::Decimal;

use bahi_shared::types::money::{
    round_money, round_quantity, within_money_range, within_quantity_range,
};

use super::error::InvoiceError;
use super::types::{ComputedInvoice, ComputedLineItem, InvoiceTotals, LineItemDraft};

/// The GST percentages accepted on line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GstRateTable {
    rates: Vec<i32>,
}

impl GstRateTable {
    /// Standard Indian GST slabs.
    pub const STANDARD: [u8; 5] = [0, 5, 12, 18, 28];

    /// Creates a table from a list of percentages. Duplicates are ignored.
    #[must_use]
    pub fn new(rates: impl IntoIterator<Item = u8>) -> Self {
        let mut rates: Vec<i32> = rates.into_iter().map(i32::from).collect();
        rates.sort_unstable();
        rates.dedup();
        Self { rates }
    }

    /// Returns true if `rate` is one of the recognized percentages.
    #[must_use]
    pub fn is_recognized(&self, rate: i32) -> bool {
        self.rates.binary_search(&rate).is_ok()
    }

    /// Returns the recognized percentages in ascending order.
    #[must_use]
    pub fn rates(&self) -> &[i32] {
        &self.rates
    }
}

impl Default for GstRateTable {
    fn default() -> Self {
        Self::new(Self::STANDARD)
    }
}

/// Computes derived line and invoice amounts.
pub struct Calculator;

impl Calculator {
    /// Validates and computes every line, then the invoice totals.
    pub fn compute(
        lines: &[LineItemDraft],
        rates: &GstRateTable,
    ) -> Result<ComputedInvoice, InvoiceError> {
        if lines.is_empty() {
            return Err(InvoiceError::EmptyLineItems);
        }

        let line_items = lines
            .iter()
            .enumerate()
            .map(|(idx, draft)| Self::compute_line(idx + 1, draft, rates))
            .collect::<Result<Vec<_>, _>>()?;

        let totals = Self::totals(&line_items)?;
        Ok(ComputedInvoice { line_items, totals })
    }

    /// Validates and computes a single line. `line` is 1-based and only
    /// used in error messages.
    pub fn compute_line(
        line: usize,
        draft: &LineItemDraft,
        rates: &GstRateTable,
    ) -> Result<ComputedLineItem, InvoiceError> {
        let description = draft.description.trim();
        if description.is_empty() {
            return Err(InvoiceError::BlankDescription { line });
        }
        if draft.quantity < Decimal::ZERO {
            return Err(InvoiceError::NegativeQuantity { line });
        }
        if draft.rate < Decimal::ZERO {
            return Err(InvoiceError::NegativeRate { line });
        }
        if !rates.is_recognized(draft.gst_rate) {
            return Err(InvoiceError::UnrecognizedGstRate {
                line,
                rate: draft.gst_rate,
            });
        }

        let quantity = round_quantity(draft.quantity);
        let rate = round_money(draft.rate);
        if !within_quantity_range(quantity) || !within_money_range(rate) {
            return Err(InvoiceError::AmountOutOfRange { line });
        }

        let out_of_range = || InvoiceError::AmountOutOfRange { line };
        let amount = quantity
            .checked_mul(rate)
            .map(round_money)
            .filter(|a| within_money_range(*a))
            .ok_or_else(out_of_range)?;
        let gst_amount = amount
            .checked_mul(Decimal::from(draft.gst_rate))
            .and_then(|g| g.checked_div(Decimal::ONE_HUNDRED))
            .map(round_money)
            .ok_or_else(out_of_range)?;
        let total_amount = amount
            .checked_add(gst_amount)
            .filter(|t| within_money_range(*t))
            .ok_or_else(out_of_range)?;

        Ok(ComputedLineItem {
            description: description.to_string(),
            item_id: draft.item_id,
            quantity,
            rate,
            gst_rate: draft.gst_rate,
            amount,
            gst_amount,
            total_amount,
        })
    }

    /// Sums already-computed lines in supply order.
    ///
    /// Fails with `TotalOutOfRange` when the grand total no longer fits the
    /// money column.
    pub fn totals(lines: &[ComputedLineItem]) -> Result<InvoiceTotals, InvoiceError> {
        let (sub_total, total_gst) = lines.iter().try_fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(sub, gst), line| {
                Some((
                    sub.checked_add(line.amount)?,
                    gst.checked_add(line.gst_amount)?,
                ))
            },
        )
        .ok_or(InvoiceError::TotalOutOfRange)?;

        let total_amount = sub_total
            .checked_add(total_gst)
            .filter(|t| within_money_range(*t))
            .ok_or(InvoiceError::TotalOutOfRange)?;

        Ok(InvoiceTotals {
            sub_total,
            total_gst,
            total_amount,
        })
    }
}
