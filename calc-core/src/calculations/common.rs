//! Common utility functions shared by the calculators.
//!
//! Rounding, rate conversion and compounding used across the loan, tax and
//! health calculators.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const ONE_HUNDRED: Decimal = dec!(100);
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use calc_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    round_dp(value, 2)
}

/// Half-up rounding to an arbitrary number of decimal places.
pub fn round_dp(
    value: Decimal,
    dp: u32,
) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the maximum of two decimal values.
///
/// ```
/// use rust_decimal_macros::dec;
/// use calc_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(-200.00)), dec!(-100.00));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Converts an annual nominal rate in percent to a per-period rate.
///
/// ```
/// use rust_decimal_macros::dec;
/// use calc_core::calculations::common::periodic_rate;
///
/// assert_eq!(periodic_rate(dec!(12), 12), dec!(0.01));
/// ```
pub fn periodic_rate(
    annual_rate_percent: Decimal,
    periods_per_year: u32,
) -> Decimal {
    annual_rate_percent / ONE_HUNDRED / Decimal::from(periods_per_year)
}

pub fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / ONE_HUNDRED / MONTHS_PER_YEAR
}

/// `(1 + rate)^periods` by repeated multiplication.
///
/// Returns `None` when the result overflows the decimal range.
pub fn compound(
    rate: Decimal,
    periods: u32,
) -> Option<Decimal> {
    let growth = Decimal::ONE.checked_add(rate)?;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor.checked_mul(growth)?;
    }
    Some(factor)
}

/// Sum of `values`, or `None` when it leaves the decimal range.
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use calc_core::calculations::common::checked_sum;
///
/// assert_eq!(checked_sum([dec!(1.5), dec!(2.5)]), Some(dec!(4.0)));
/// assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), None);
/// ```
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// `part / whole × 100`, or `None` when `whole` is zero.
pub fn percent_of(
    part: Decimal,
    whole: Decimal,
) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    part.checked_mul(ONE_HUNDRED)?.checked_div(whole)
}
