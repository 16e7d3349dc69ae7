//! Level payment for a fully amortizing loan.
//!
//! ```text
//! M = P · r(1 + r)^n / ((1 + r)^n − 1)      r > 0
//! M = P / n                                 r = 0
//! ```

use rust_decimal::Decimal;

use super::{LoanError, validate_terms};
use crate::LoanTerms;
use crate::calculations::common::{compound, monthly_rate};

/// Level payment for `periods` payments at `periodic_rate` per period.
///
/// # Errors
///
/// Returns [`LoanError`] if:
/// - `periods` is zero
/// - `principal` or `periodic_rate` is negative
/// - the annuity factor overflows
pub fn level_payment(
    principal: Decimal,
    periodic_rate: Decimal,
    periods: u32,
) -> Result<Decimal, LoanError> {
    if periods == 0 {
        return Err(LoanError::InvalidTerm(periods));
    }
    if principal < Decimal::ZERO {
        return Err(LoanError::NegativePrincipal(principal));
    }
    if periodic_rate < Decimal::ZERO {
        return Err(LoanError::NegativeRate(periodic_rate));
    }
    if principal.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if periodic_rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let growth = compound(periodic_rate, periods).ok_or(LoanError::NonFinite("(1 + r)^n"))?;
    let denominator = growth - Decimal::ONE;

    principal
        .checked_mul(periodic_rate)
        .and_then(|v| v.checked_mul(growth))
        .and_then(|v| v.checked_div(denominator))
        .ok_or(LoanError::NonFinite("annuity payment"))
}

/// Monthly principal-and-interest payment for `terms`.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use calc_core::LoanTerms;
/// use calc_core::calculations::mortgage::monthly_payment;
///
/// let terms = LoanTerms::from_years(dec!(320000), dec!(5.98), 30);
/// let payment = monthly_payment(&terms).unwrap();
///
/// assert_eq!(payment.round_dp(2), dec!(1914.45));
/// ```
pub fn monthly_payment(terms: &LoanTerms) -> Result<Decimal, LoanError> {
    validate_terms(terms)?;
    level_payment(
        terms.principal,
        monthly_rate(terms.annual_rate_percent),
        terms.term_months,
    )
}
