//! Loan arithmetic shared by the mortgage widgets.
//!
//! | Module           | Responsibility |
//! |------------------|----------------|
//! | [`payment`]      | Level payment from the annuity formula |
//! | [`amortization`] | Period-by-period schedule until payoff |
//! | [`payoff`]       | Extra-payment and biweekly simulations vs. baseline |
//! | [`breakdown`]    | Home price / down payment setup, PITI, PMI, DTI |

pub mod amortization;
pub mod breakdown;
pub mod payment;
pub mod payoff;

use rust_decimal::Decimal;
use thiserror::Error;

pub use amortization::AmortizationSchedule;
pub use breakdown::{
    AffordabilityInput, DebtToIncome, DownPayment, MortgageCalculator, MortgageInput,
    MortgageResult,
};
pub use payment::{level_payment, monthly_payment};
pub use payoff::{
    BiweeklyInput, BiweeklySimulator, ExtraPaymentInput, ExtraPaymentSimulator,
    PayoffComparison,
};

/// Longest accepted term: 50 years of monthly payments.
pub const MAX_TERM_MONTHS: u32 = 600;

/// Errors raised by the loan calculators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoanError {
    /// The principal must not be negative.
    #[error("principal must not be negative, got {0}")]
    NegativePrincipal(Decimal),

    /// The annual interest rate must not be negative.
    #[error("interest rate must not be negative, got {0}")]
    NegativeRate(Decimal),

    /// The term must contain between 1 and [`MAX_TERM_MONTHS`] payments.
    #[error("invalid term: {0} payments")]
    InvalidTerm(u32),

    /// A money input that must be non-negative was negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    /// The home price must be positive.
    #[error("home price must be positive, got {0}")]
    InvalidHomePrice(Decimal),

    /// The down payment exceeds the home price or is out of range.
    #[error("down payment {down_payment} is outside 0..={home_price}")]
    InvalidDownPayment {
        down_payment: Decimal,
        home_price: Decimal,
    },

    /// Gross income for affordability must be positive.
    #[error("gross monthly income must be positive, got {0}")]
    InvalidIncome(Decimal),

    /// The one-time extra payment period must be 1 or later.
    #[error("one-time payment period must be at least 1, got {0}")]
    InvalidPeriod(u32),

    /// An intermediate value overflowed the decimal range.
    #[error("computation did not produce a finite result ({0})")]
    NonFinite(&'static str),

    /// The payoff date cannot be represented.
    #[error("payoff date is out of range")]
    DateOutOfRange,
}

/// Rejects terms that cannot be amortized.
pub(crate) fn validate_terms(terms: &crate::LoanTerms) -> Result<(), LoanError> {
    if terms.principal < Decimal::ZERO {
        return Err(LoanError::NegativePrincipal(terms.principal));
    }
    if terms.annual_rate_percent < Decimal::ZERO {
        return Err(LoanError::NegativeRate(terms.annual_rate_percent));
    }
    if terms.term_months == 0 || terms.term_months > MAX_TERM_MONTHS {
        return Err(LoanError::InvalidTerm(terms.term_months));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::LoanTerms;

    #[test]
    fn longest_term_is_accepted() {
        let terms = LoanTerms::new(dec!(100000), dec!(6), MAX_TERM_MONTHS);

        assert_eq!(validate_terms(&terms), Ok(()));
    }

    #[test]
    fn term_past_maximum_is_rejected() {
        for months in [MAX_TERM_MONTHS + 1, u32::MAX] {
            let terms = LoanTerms::new(dec!(1000), Decimal::ZERO, months);

            assert_eq!(validate_terms(&terms), Err(LoanError::InvalidTerm(months)));
        }
    }
}
