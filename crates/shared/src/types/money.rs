//! Fixed-point precision rules for money and quantities.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` with a 2-digit scale, quantities with a 3-digit scale.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for currency amounts.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept for line item quantities.
pub const QUANTITY_SCALE: u32 = 3;

/// Largest amount a `NUMERIC(15, 2)` column holds: 9,999,999,999,999.99.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xA4C6_7FFF, 0x0003_8D7E, 0, false, MONEY_SCALE);

/// Largest quantity a `NUMERIC(10, 3)` column holds: 9,999,999.999.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(0x540B_E3FF, 0x2, 0, false, QUANTITY_SCALE);

/// Rounds an amount to currency precision, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a quantity to quantity precision, half away from zero.
#[must_use]
pub fn round_quantity(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true if the amount carries no more than currency precision.
#[must_use]
pub fn has_money_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Returns true if the amount fits a money column.
#[must_use]
pub fn within_money_range(amount: Decimal) -> bool {
    amount.abs() <= MAX_MONEY
}

/// Returns true if the quantity fits a quantity column.
#[must_use]
pub fn within_quantity_range(quantity: Decimal) -> bool {
    quantity.abs() <= MAX_QUANTITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round_money(dec!(100)), dec!(100));
    }

    #[test]
    fn test_round_quantity() {
        assert_eq!(round_quantity(dec!(1.23456)), dec!(1.235));
        assert_eq!(round_quantity(dec!(2)), dec!(2));
    }

    #[test]
    fn test_has_money_precision() {
        assert!(has_money_precision(dec!(188.5)));
        assert!(has_money_precision(dec!(188.50)));
        assert!(has_money_precision(dec!(188.5000)));
        assert!(!has_money_precision(dec!(0.001)));
    }

    #[test]
    fn test_column_bounds() {
        assert_eq!(MAX_MONEY, dec!(9999999999999.99));
        assert_eq!(MAX_QUANTITY, dec!(9999999.999));
        assert!(within_money_range(dec!(9999999999999.99)));
        assert!(!within_money_range(dec!(10000000000000)));
        assert!(within_quantity_range(dec!(-9999999.999)));
        assert!(!within_quantity_range(dec!(10000000)));
    }
}
