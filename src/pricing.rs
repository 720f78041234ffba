//! Pricing

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

/// Money amount in an ISO currency.
pub type Price = Money<'static, Currency>;

/// Errors raised by minor-unit arithmetic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PricingError {
    /// Percentage or ratio could not be represented in minor units.
    #[error("amount could not be converted to minor units")]
    Conversion,
}

/// Percentage as a plain decimal fraction (`0.25` for 25%).
pub fn percent_value(percent: &Percentage) -> Decimal {
    (*percent) * Decimal::ONE
}

/// Percentage as points for display (`25` for 25%).
pub fn percent_points(percent: &Percentage) -> Decimal {
    (percent_value(percent) * Decimal::ONE_HUNDRED)
        .round_dp(2)
        .normalize()
}

/// Calculate `percent` of `minor`, rounded half away from zero.
///
/// # Errors
///
/// Returns [`PricingError::Conversion`] if the result does not fit in `i64`.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, PricingError> {
    percent_value(percent)
        .checked_mul(Decimal::from(minor))
        .ok_or(PricingError::Conversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Conversion)
}

/// Calculate `minor * numerator / denominator`, rounded half away from zero.
///
/// # Errors
///
/// Returns [`PricingError::Conversion`] on a zero denominator or overflow.
pub fn share_of_minor(minor: i64, numerator: u32, denominator: u32) -> Result<i64, PricingError> {
    if denominator == 0 {
        return Err(PricingError::Conversion);
    }

    Decimal::from(minor)
        .checked_mul(Decimal::from(numerator))
        .and_then(|scaled| scaled.checked_div(Decimal::from(denominator)))
        .ok_or(PricingError::Conversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Conversion)
}

/// Reduce `minor` by `percent`, leaving it unchanged if the reduction cannot be represented.
pub fn reduce_by_percent(percent: &Percentage, minor: i64) -> i64 {
    percent_of_minor(percent, minor).map_or(minor, |reduction| minor - reduction)
}

/// Format a price as `12.50 USD`.
pub fn format_price(price: &Price) -> String {
    let currency = price.currency();
    let exponent = currency.exponent;
    let amount = Decimal::new(price.to_minor_units(), exponent);

    format!("{amount} {}", currency.iso_alpha_code)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn percent_of_minor_rounds_half_away_from_zero() -> TestResult {
        assert_eq!(percent_of_minor(&Percentage::from(0.25), 10)?, 3);
        assert_eq!(percent_of_minor(&Percentage::from(0.1), 10_000)?, 1_000);

        Ok(())
    }

    #[test]
    fn share_of_minor_divides_then_rounds() -> TestResult {
        assert_eq!(share_of_minor(4_000, 1, 4)?, 1_000);
        assert_eq!(share_of_minor(1_000, 1, 3)?, 333);
        assert_eq!(share_of_minor(500, 1, 3)?, 167);

        Ok(())
    }

    #[test]
    fn share_of_minor_rejects_zero_denominator() {
        assert_eq!(share_of_minor(100, 1, 0), Err(PricingError::Conversion));
    }

    #[test]
    fn reduce_by_percent_subtracts_reduction() {
        assert_eq!(reduce_by_percent(&Percentage::from(0.1), 10_000), 9_000);
    }

    #[test]
    fn percent_points_normalizes() {
        assert_eq!(percent_points(&Percentage::from(0.15)).to_string(), "15");
    }

    #[test]
    fn format_price_uses_currency_exponent() {
        assert_eq!(format_price(&Money::from_minor(1_250, USD)), "12.50 USD");
    }
}
