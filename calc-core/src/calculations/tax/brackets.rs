//! Marginal bracket walk.
//!
//! Each bracket taxes the slice of income between its lower bound and the
//! smaller of its upper bound and the income:
//!
//! ```text
//! taxable_in_bracket = max(0, min(income, upper) − lower)
//! liability          = Σ taxable_in_bracket × rate
//! ```
//!
//! The walk stops at the bracket that contains the income. Tables are assumed
//! valid; [`validate_bracket_table`] checks them where they are loaded.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use calc_core::calculations::tax::ProgressiveTax;
//! use calc_core::{FilingStatusCode, TaxBracket};
//!
//! let bracket = |lower, upper, rate| TaxBracket {
//!     tax_year: 2024,
//!     filing_status: FilingStatusCode::Single,
//!     lower_bound: lower,
//!     upper_bound: upper,
//!     rate,
//! };
//! let brackets = vec![
//!     bracket(dec!(0), Some(dec!(11600)), dec!(0.10)),
//!     bracket(dec!(11600), Some(dec!(47150)), dec!(0.12)),
//!     bracket(dec!(47150), None, dec!(0.22)),
//! ];
//!
//! let tax = ProgressiveTax::new(&brackets).calculate(dec!(50000)).unwrap();
//!
//! assert_eq!(tax.liability, dec!(6053.00));
//! assert_eq!(tax.marginal_rate, dec!(0.22));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BracketTableError, TaxError};
use crate::TaxBracket;
use crate::calculations::common::{max, round_half_up};

/// Tax charged within one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketDetail {
    pub lower_bound: Decimal,
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
    pub taxable_amount: Decimal,
    pub tax: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTax {
    pub liability: Decimal,
    /// Rate of the bracket containing the income, as a fraction.
    pub marginal_rate: Decimal,
    /// Brackets that contributed tax, lowest first.
    pub details: Vec<BracketDetail>,
}

#[derive(Debug, Clone)]
pub struct ProgressiveTax<'a> {
    brackets: &'a [TaxBracket],
}

impl<'a> ProgressiveTax<'a> {
    /// `brackets` must be sorted ascending and cover `[0, ∞)`.
    pub fn new(brackets: &'a [TaxBracket]) -> Self {
        Self { brackets }
    }

    /// Liability for `taxable_income`, rounded to cents.
    ///
    /// Negative income is treated as zero.
    ///
    /// # Errors
    ///
    /// Returns [`TaxError::NoTaxBrackets`] if the table is empty.
    pub fn calculate(
        &self,
        taxable_income: Decimal,
    ) -> Result<BracketTax, TaxError> {
        if self.brackets.is_empty() {
            return Err(TaxError::NoTaxBrackets);
        }
        let income = max(taxable_income, Decimal::ZERO);

        let mut liability = Decimal::ZERO;
        let mut details = Vec::new();
        for bracket in self.brackets {
            let ceiling = bracket.upper_bound.map_or(income, |upper| upper.min(income));
            let taxable = max(ceiling - bracket.lower_bound, Decimal::ZERO);
            let tax = taxable
                .checked_mul(bracket.rate)
                .ok_or(TaxError::NonFinite("bracket tax"))?;
            liability = liability
                .checked_add(tax)
                .ok_or(TaxError::NonFinite("liability"))?;

            if taxable > Decimal::ZERO {
                details.push(BracketDetail {
                    lower_bound: bracket.lower_bound,
                    upper_bound: bracket.upper_bound,
                    rate: bracket.rate,
                    taxable_amount: round_half_up(taxable),
                    tax: round_half_up(tax),
                });
            }

            match bracket.upper_bound {
                Some(upper) if income > upper => continue,
                _ => break,
            }
        }

        Ok(BracketTax {
            liability: round_half_up(liability),
            marginal_rate: self.marginal_rate(income),
            details,
        })
    }

    /// Rate of the last bracket whose lower bound is at or below `income`.
    fn marginal_rate(
        &self,
        income: Decimal,
    ) -> Decimal {
        self.brackets
            .iter()
            .rev()
            .find(|b| b.lower_bound <= income)
            .map(|b| b.rate)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Checks that `brackets` start at zero, ascend without gaps or overlaps, end
/// with a single open bracket and carry no negative rates.
pub fn validate_bracket_table(brackets: &[TaxBracket]) -> Result<(), BracketTableError> {
    let first = brackets.first().ok_or(BracketTableError::Empty)?;
    if !first.lower_bound.is_zero() {
        return Err(BracketTableError::DoesNotStartAtZero(first.lower_bound));
    }

    let last_index = brackets.len() - 1;
    let mut expected_lower = Decimal::ZERO;
    for (index, bracket) in brackets.iter().enumerate() {
        if bracket.rate < Decimal::ZERO {
            return Err(BracketTableError::NegativeRate {
                index,
                rate: bracket.rate,
            });
        }
        if bracket.lower_bound != expected_lower {
            return Err(BracketTableError::NotContiguous {
                index,
                lower: bracket.lower_bound,
                expected: expected_lower,
            });
        }
        match (bracket.upper_bound, index == last_index) {
            (Some(upper), false) => {
                if upper <= bracket.lower_bound {
                    return Err(BracketTableError::NonAscending {
                        index,
                        lower: bracket.lower_bound,
                        upper,
                    });
                }
                expected_lower = upper;
            }
            (None, true) => {}
            _ => return Err(BracketTableError::MisplacedOpenBound(index)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::FilingStatusCode;

    fn bracket(
        lower: Decimal,
        upper: Option<Decimal>,
        rate: Decimal,
    ) -> TaxBracket {
        TaxBracket {
            tax_year: 2024,
            filing_status: FilingStatusCode::Single,
            lower_bound: lower,
            upper_bound: upper,
            rate,
        }
    }

    fn single_2024() -> Vec<TaxBracket> {
        vec![
            bracket(dec!(0), Some(dec!(11600)), dec!(0.10)),
            bracket(dec!(11600), Some(dec!(47150)), dec!(0.12)),
            bracket(dec!(47150), Some(dec!(100525)), dec!(0.22)),
            bracket(dec!(100525), Some(dec!(191950)), dec!(0.24)),
            bracket(dec!(191950), Some(dec!(243725)), dec!(0.32)),
            bracket(dec!(243725), Some(dec!(609350)), dec!(0.35)),
            bracket(dec!(609350), None, dec!(0.37)),
        ]
    }

    // =========================================================================
    // calculate tests
    // =========================================================================

    #[test]
    fn fixture_income_fifty_thousand() {
        let brackets = single_2024();

        let tax = ProgressiveTax::new(&brackets).calculate(dec!(50000)).unwrap();

        // 11600 × 0.10 + 35550 × 0.12 + 2850 × 0.22
        assert_eq!(tax.liability, dec!(6053.00));
        assert_eq!(tax.marginal_rate, dec!(0.22));
        assert_eq!(tax.details.len(), 3);
        assert_eq!(tax.details[1].taxable_amount, dec!(35550.00));
        assert_eq!(tax.details[1].tax, dec!(4266.00));
        assert_eq!(tax.details[2].tax, dec!(627.00));
    }

    #[test]
    fn zero_income_owes_nothing() {
        let brackets = single_2024();

        let tax = ProgressiveTax::new(&brackets).calculate(Decimal::ZERO).unwrap();

        assert_eq!(tax.liability, Decimal::ZERO);
        assert_eq!(tax.marginal_rate, dec!(0.10));
        assert!(tax.details.is_empty());
    }

    #[test]
    fn negative_income_is_floored() {
        let brackets = single_2024();

        let tax = ProgressiveTax::new(&brackets).calculate(dec!(-500)).unwrap();

        assert_eq!(tax.liability, Decimal::ZERO);
    }

    #[test]
    fn income_on_boundary_stays_in_lower_bracket() {
        let brackets = single_2024();

        let tax = ProgressiveTax::new(&brackets).calculate(dec!(11600)).unwrap();

        assert_eq!(tax.liability, dec!(1160.00));
        assert_eq!(tax.details.len(), 1);
    }

    #[test]
    fn boundary_income_reports_upper_marginal_rate() {
        let brackets = single_2024();

        let tax = ProgressiveTax::new(&brackets).calculate(dec!(11600)).unwrap();

        assert_eq!(tax.marginal_rate, dec!(0.12));
    }

    #[test]
    fn top_bracket_is_unbounded() {
        let brackets = single_2024();

        let tax = ProgressiveTax::new(&brackets).calculate(dec!(1000000)).unwrap();

        assert_eq!(tax.marginal_rate, dec!(0.37));
        assert_eq!(tax.details.len(), 7);
        // 183647.25 through 609350, then 37% of the rest
        assert_eq!(tax.liability, dec!(328187.75));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(
            ProgressiveTax::new(&[]).calculate(dec!(100)),
            Err(TaxError::NoTaxBrackets)
        );
    }

    #[test]
    fn tax_past_decimal_range_is_rejected() {
        let brackets = [bracket(dec!(0), None, dec!(2))];

        assert_eq!(
            ProgressiveTax::new(&brackets).calculate(Decimal::MAX),
            Err(TaxError::NonFinite("bracket tax"))
        );
    }

    // =========================================================================
    // validate_bracket_table tests
    // =========================================================================

    #[test]
    fn valid_table_passes() {
        assert_eq!(validate_bracket_table(&single_2024()), Ok(()));
    }

    #[test]
    fn empty_table_fails_validation() {
        assert_eq!(validate_bracket_table(&[]), Err(BracketTableError::Empty));
    }

    #[test]
    fn table_must_start_at_zero() {
        let brackets = vec![bracket(dec!(100), None, dec!(0.10))];

        assert_eq!(
            validate_bracket_table(&brackets),
            Err(BracketTableError::DoesNotStartAtZero(dec!(100)))
        );
    }

    #[test]
    fn gap_is_detected() {
        let brackets = vec![
            bracket(dec!(0), Some(dec!(1000)), dec!(0.10)),
            bracket(dec!(1500), None, dec!(0.20)),
        ];

        assert_eq!(
            validate_bracket_table(&brackets),
            Err(BracketTableError::NotContiguous {
                index: 1,
                lower: dec!(1500),
                expected: dec!(1000),
            })
        );
    }

    #[test]
    fn overlap_is_detected() {
        let brackets = vec![
            bracket(dec!(0), Some(dec!(1000)), dec!(0.10)),
            bracket(dec!(900), None, dec!(0.20)),
        ];

        assert!(matches!(
            validate_bracket_table(&brackets),
            Err(BracketTableError::NotContiguous { index: 1, .. })
        ));
    }

    #[test]
    fn inverted_bracket_is_detected() {
        let brackets = vec![
            bracket(dec!(0), Some(dec!(0)), dec!(0.10)),
            bracket(dec!(0), None, dec!(0.20)),
        ];

        assert!(matches!(
            validate_bracket_table(&brackets),
            Err(BracketTableError::NonAscending { index: 0, .. })
        ));
    }

    #[test]
    fn bounded_last_bracket_is_detected() {
        let brackets = vec![bracket(dec!(0), Some(dec!(1000)), dec!(0.10))];

        assert_eq!(
            validate_bracket_table(&brackets),
            Err(BracketTableError::MisplacedOpenBound(0))
        );
    }

    #[test]
    fn open_middle_bracket_is_detected() {
        let brackets = vec![
            bracket(dec!(0), None, dec!(0.10)),
            bracket(dec!(1000), None, dec!(0.20)),
        ];

        assert_eq!(
            validate_bracket_table(&brackets),
            Err(BracketTableError::MisplacedOpenBound(0))
        );
    }

    #[test]
    fn negative_rate_is_detected() {
        let brackets = vec![bracket(dec!(0), None, dec!(-0.10))];

        assert_eq!(
            validate_bracket_table(&brackets),
            Err(BracketTableError::NegativeRate {
                index: 0,
                rate: dec!(-0.10)
            })
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_liability_matches_direct_sum(income in 0u64..2_000_000) {
            let brackets = single_2024();
            let income = Decimal::from(income);

            let tax = ProgressiveTax::new(&brackets).calculate(income).unwrap();

            let reference: Decimal = brackets
                .iter()
                .map(|b| {
                    let top = b.upper_bound.unwrap_or(income).min(income);
                    max(top - b.lower_bound, Decimal::ZERO) * b.rate
                })
                .sum();
            prop_assert_eq!(tax.liability, round_half_up(reference));
        }
    }
}
