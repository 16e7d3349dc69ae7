//! Federal income tax estimate.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Gross income (wages + other income) |
//! | 2    | Above-the-line adjustments, each clamped to its yearly cap |
//! | 3    | Adjusted gross income (1 − 2) |
//! | 4    | Deduction (itemized when larger than standard) |
//! | 5    | Taxable income (3 − 4, minimum 0) |
//! | 6    | Liability from the bracket schedule |
//! | 7    | Net liability (6 − credits, minimum 0) |
//! | 8    | Balance due (7 − withholding; negative is a refund) |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::brackets::{BracketDetail, ProgressiveTax};
use super::tables::TaxTables;
use super::TaxError;
use crate::calculations::common::{ONE_HUNDRED, checked_sum, max, percent_of, round_half_up};
use crate::{FilingStatusCode, TaxYearConfig};

/// Above-the-line items as entered, before caps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboveTheLineDeductions {
    /// 401(k), 403(b) and similar elective deferrals.
    pub retirement_plan: Decimal,
    pub ira: Decimal,
    pub hsa: Decimal,
    pub student_loan_interest: Decimal,
}

impl AboveTheLineDeductions {
    /// Clamps each item to its cap independently.
    pub fn capped(
        &self,
        config: &TaxYearConfig,
    ) -> Self {
        Self {
            retirement_plan: self.retirement_plan.min(config.retirement_plan_limit),
            ira: self.ira.min(config.ira_limit),
            hsa: self.hsa.min(config.hsa_limit),
            student_loan_interest: self
                .student_loan_interest
                .min(config.student_loan_interest_limit),
        }
    }

    /// Sum of the items, or `None` when it leaves the decimal range.
    pub fn total(&self) -> Option<Decimal> {
        checked_sum([
            self.retirement_plan,
            self.ira,
            self.hsa,
            self.student_loan_interest,
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxInput {
    pub tax_year: i32,
    pub filing_status: FilingStatusCode,
    pub wages: Decimal,
    pub other_income: Decimal,
    #[serde(default)]
    pub adjustments: AboveTheLineDeductions,
    /// Total itemized deductions; zero to take the standard deduction.
    pub itemized_deductions: Decimal,
    /// Non-refundable credits.
    pub credits: Decimal,
    pub withholding: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTaxResult {
    pub tax_year: i32,
    pub filing_status: FilingStatusCode,
    pub gross_income: Decimal,
    /// Adjustments after caps.
    pub adjustments: Decimal,
    pub adjusted_gross_income: Decimal,
    pub standard_deduction: Decimal,
    pub deduction: Decimal,
    pub used_itemized_deduction: bool,
    pub taxable_income: Decimal,
    pub liability: Decimal,
    pub credits: Decimal,
    pub net_liability: Decimal,
    pub withholding: Decimal,
    /// Positive when tax is owed, negative for a refund.
    pub balance_due: Decimal,
    pub effective_rate_percent: Decimal,
    pub marginal_rate_percent: Decimal,
    pub brackets: Vec<BracketDetail>,
}

/// Runs the estimate against a set of loaded tables.
#[derive(Debug, Clone)]
pub struct IncomeTaxCalculator<'a> {
    tables: &'a TaxTables,
}

impl<'a> IncomeTaxCalculator<'a> {
    pub fn new(tables: &'a TaxTables) -> Self {
        Self { tables }
    }

    /// # Errors
    ///
    /// Returns [`TaxError`] if an amount is negative, the year is not loaded,
    /// the year has no data for the filing status, or a total overflows.
    pub fn calculate(
        &self,
        input: &IncomeTaxInput,
    ) -> Result<IncomeTaxResult, TaxError> {
        self.validate(input)?;

        let table = self.tables.get(input.tax_year)?;
        let brackets = table.brackets_for(input.filing_status)?;
        let standard = table.standard_deduction(input.filing_status)?;

        let gross = self.gross_income(input)?;
        let adjustments = input
            .adjustments
            .capped(&table.config)
            .total()
            .ok_or(TaxError::NonFinite("adjustments"))?;
        let agi = max(gross - adjustments, Decimal::ZERO);

        let (deduction, used_itemized) =
            self.determine_deduction(input.itemized_deductions, standard);
        let taxable = self.taxable_income(agi, deduction);

        let tax = ProgressiveTax::new(brackets).calculate(taxable)?;
        let net = self.net_liability(tax.liability, input.credits);
        let marginal = tax
            .marginal_rate
            .checked_mul(ONE_HUNDRED)
            .ok_or(TaxError::NonFinite("marginal rate"))?;

        debug!(
            year = input.tax_year,
            status = %input.filing_status,
            %taxable,
            liability = %tax.liability,
            "income tax calculated"
        );

        Ok(IncomeTaxResult {
            tax_year: input.tax_year,
            filing_status: input.filing_status,
            gross_income: round_half_up(gross),
            adjustments: round_half_up(adjustments),
            adjusted_gross_income: round_half_up(agi),
            standard_deduction: standard,
            deduction: round_half_up(deduction),
            used_itemized_deduction: used_itemized,
            taxable_income: round_half_up(taxable),
            liability: tax.liability,
            credits: round_half_up(input.credits),
            net_liability: net,
            withholding: round_half_up(input.withholding),
            balance_due: round_half_up(net - input.withholding),
            effective_rate_percent: self.effective_rate(net, gross)?,
            marginal_rate_percent: round_half_up(marginal),
            brackets: tax.details,
        })
    }

    fn validate(
        &self,
        input: &IncomeTaxInput,
    ) -> Result<(), TaxError> {
        let adj = &input.adjustments;
        for (field, value) in [
            ("wages", input.wages),
            ("other income", input.other_income),
            ("retirement plan contributions", adj.retirement_plan),
            ("IRA contributions", adj.ira),
            ("HSA contributions", adj.hsa),
            ("student loan interest", adj.student_loan_interest),
            ("itemized deductions", input.itemized_deductions),
            ("credits", input.credits),
            ("withholding", input.withholding),
        ] {
            if value < Decimal::ZERO {
                warn!(field, %value, "negative tax input");
                return Err(TaxError::NegativeAmount { field, value });
            }
        }
        Ok(())
    }

    fn gross_income(
        &self,
        input: &IncomeTaxInput,
    ) -> Result<Decimal, TaxError> {
        input
            .wages
            .checked_add(input.other_income)
            .ok_or(TaxError::NonFinite("gross income"))
    }

    /// Itemized when it exceeds the standard deduction, else standard.
    fn determine_deduction(
        &self,
        itemized: Decimal,
        standard: Decimal,
    ) -> (Decimal, bool) {
        if itemized > standard {
            (itemized, true)
        } else {
            (standard, false)
        }
    }

    fn taxable_income(
        &self,
        agi: Decimal,
        deduction: Decimal,
    ) -> Decimal {
        max(agi - deduction, Decimal::ZERO)
    }

    fn net_liability(
        &self,
        liability: Decimal,
        credits: Decimal,
    ) -> Decimal {
        round_half_up(max(liability - credits, Decimal::ZERO))
    }

    fn effective_rate(
        &self,
        net: Decimal,
        gross: Decimal,
    ) -> Result<Decimal, TaxError> {
        if gross.is_zero() {
            return Ok(Decimal::ZERO);
        }
        percent_of(net, gross)
            .map(round_half_up)
            .ok_or(TaxError::NonFinite("effective rate"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn input(wages: Decimal) -> IncomeTaxInput {
        IncomeTaxInput {
            tax_year: 2024,
            filing_status: FilingStatusCode::Single,
            wages,
            other_income: Decimal::ZERO,
            adjustments: AboveTheLineDeductions::default(),
            itemized_deductions: Decimal::ZERO,
            credits: Decimal::ZERO,
            withholding: Decimal::ZERO,
        }
    }

    fn calculator_with(tables: &TaxTables) -> IncomeTaxCalculator<'_> {
        IncomeTaxCalculator::new(tables)
    }

    // =========================================================================
    // calculate tests
    // =========================================================================

    #[test]
    fn single_filer_standard_deduction() {
        let tables = TaxTables::builtin();

        // 64600 − 14600 = 50000 taxable
        let result = calculator_with(&tables).calculate(&input(dec!(64600))).unwrap();

        assert_eq!(result.taxable_income, dec!(50000.00));
        assert_eq!(result.liability, dec!(6053.00));
        assert_eq!(result.net_liability, dec!(6053.00));
        assert_eq!(result.marginal_rate_percent, dec!(22.00));
        assert!(!result.used_itemized_deduction);
        // 6053 / 64600
        assert_eq!(result.effective_rate_percent, dec!(9.37));
    }

    #[test]
    fn itemized_used_only_when_larger() {
        let tables = TaxTables::builtin();
        let mut smaller = input(dec!(80000));
        smaller.itemized_deductions = dec!(10000);
        let mut larger = input(dec!(80000));
        larger.itemized_deductions = dec!(20000);

        let smaller = calculator_with(&tables).calculate(&smaller).unwrap();
        let larger = calculator_with(&tables).calculate(&larger).unwrap();

        assert_eq!(smaller.deduction, dec!(14600.00));
        assert!(!smaller.used_itemized_deduction);
        assert_eq!(larger.deduction, dec!(20000.00));
        assert!(larger.used_itemized_deduction);
    }

    #[test]
    fn adjustments_are_capped_per_item() {
        let tables = TaxTables::builtin();
        let mut input = input(dec!(150000));
        input.adjustments = AboveTheLineDeductions {
            retirement_plan: dec!(30000),
            ira: dec!(1000),
            hsa: dec!(9000),
            student_loan_interest: dec!(2000),
        };

        let result = calculator_with(&tables).calculate(&input).unwrap();

        // 23000 + 1000 + 4150 + 2000
        assert_eq!(result.adjustments, dec!(30150.00));
        assert_eq!(result.adjusted_gross_income, dec!(119850.00));
    }

    #[test]
    fn credits_floor_at_zero() {
        let tables = TaxTables::builtin();
        let mut input = input(dec!(30000));
        input.credits = dec!(100000);

        let result = calculator_with(&tables).calculate(&input).unwrap();

        assert!(result.liability > Decimal::ZERO);
        assert_eq!(result.net_liability, Decimal::ZERO);
    }

    #[test]
    fn withholding_above_tax_is_refund() {
        let tables = TaxTables::builtin();
        let mut input = input(dec!(64600));
        input.withholding = dec!(7000);

        let result = calculator_with(&tables).calculate(&input).unwrap();

        assert_eq!(result.balance_due, dec!(-947.00));
    }

    #[test]
    fn income_below_deduction_owes_nothing() {
        let tables = TaxTables::builtin();

        let result = calculator_with(&tables).calculate(&input(dec!(10000))).unwrap();

        assert_eq!(result.taxable_income, Decimal::ZERO);
        assert_eq!(result.liability, Decimal::ZERO);
        assert!(result.brackets.is_empty());
    }

    #[test]
    fn zero_income_has_zero_effective_rate() {
        let tables = TaxTables::builtin();

        let result = calculator_with(&tables).calculate(&input(Decimal::ZERO)).unwrap();

        assert_eq!(result.effective_rate_percent, Decimal::ZERO);
    }

    #[test]
    fn joint_filers_use_joint_schedule() {
        let tables = TaxTables::builtin();
        let mut input = input(dec!(129200));
        input.filing_status = FilingStatusCode::MarriedFilingJointly;

        let result = calculator_with(&tables).calculate(&input).unwrap();

        // 100000 taxable: 2320 + 8532 + 1254
        assert_eq!(result.taxable_income, dec!(100000.00));
        assert_eq!(result.liability, dec!(12106.00));
    }

    #[test]
    fn unknown_year_is_rejected() {
        let tables = TaxTables::builtin();
        let mut input = input(dec!(50000));
        input.tax_year = 2010;

        assert_eq!(
            calculator_with(&tables).calculate(&input),
            Err(TaxError::UnknownTaxYear(2010))
        );
    }

    #[test]
    fn negative_wages_are_rejected() {
        let tables = TaxTables::builtin();

        assert_eq!(
            calculator_with(&tables).calculate(&input(dec!(-1))),
            Err(TaxError::NegativeAmount {
                field: "wages",
                value: dec!(-1)
            })
        );
    }

    #[test]
    fn income_past_decimal_range_is_rejected() {
        let tables = TaxTables::builtin();
        let mut input = input(Decimal::MAX);
        input.other_income = Decimal::MAX;

        assert_eq!(
            calculator_with(&tables).calculate(&input),
            Err(TaxError::NonFinite("gross income"))
        );
    }

    #[test]
    fn huge_wages_still_produce_an_estimate() {
        let tables = TaxTables::builtin();

        let result = calculator_with(&tables)
            .calculate(&input(dec!(1000000000000000000000000000)))
            .unwrap();

        assert_eq!(result.marginal_rate_percent, dec!(37.00));
    }

    // =========================================================================
    // helper tests
    // =========================================================================

    #[test]
    fn determine_deduction_tie_prefers_standard() {
        let tables = TaxTables::new();

        assert_eq!(
            calculator_with(&tables).determine_deduction(dec!(15000), dec!(15000)),
            (dec!(15000), false)
        );
    }

    #[test]
    fn taxable_income_floors_at_zero() {
        let tables = TaxTables::new();

        assert_eq!(
            calculator_with(&tables).taxable_income(dec!(1000), dec!(5000)),
            Decimal::ZERO
        );
    }
}
