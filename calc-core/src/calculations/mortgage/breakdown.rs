//! Full monthly cost of a home purchase.
//!
//! Derives the loan from price and down payment, then layers property tax,
//! insurance, PMI and HOA on top of the principal-and-interest payment.
//! PMI applies only while the down payment is below 20% of the price.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{LoanError, MAX_TERM_MONTHS};
use super::amortization::AmortizationSchedule;
use crate::calculations::common::{
    MONTHS_PER_YEAR, ONE_HUNDRED, checked_sum, percent_of, round_half_up,
};
use crate::{LoanTerms, ScheduleMode, ScheduleView};

/// Down payment below this percentage of the price requires PMI.
pub const PMI_THRESHOLD_PERCENT: Decimal = dec!(20);
/// Housing cost ceiling as a share of gross income.
pub const FRONT_END_DTI_LIMIT: Decimal = dec!(28);
/// Total debt ceiling as a share of gross income.
pub const BACK_END_DTI_LIMIT: Decimal = dec!(36);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DownPayment {
    Amount(Decimal),
    Percent(Decimal),
}

impl DownPayment {
    /// Down payment in currency for a given price.
    pub fn amount_for(
        &self,
        home_price: Decimal,
    ) -> Result<Decimal, LoanError> {
        match self {
            Self::Amount(amount) => Ok(*amount),
            Self::Percent(percent) => home_price
                .checked_mul(*percent)
                .map(|v| v / ONE_HUNDRED)
                .ok_or(LoanError::NonFinite("down payment")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffordabilityInput {
    pub gross_monthly_income: Decimal,
    pub other_monthly_debts: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageInput {
    pub home_price: Decimal,
    pub down_payment: DownPayment,
    pub annual_rate_percent: Decimal,
    pub term_years: u32,
    pub annual_property_tax: Decimal,
    pub annual_insurance: Decimal,
    /// Annual PMI rate as a percentage of the loan amount.
    pub pmi_rate_percent: Decimal,
    pub monthly_hoa: Decimal,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub schedule_mode: ScheduleMode,
    #[serde(default)]
    pub affordability: Option<AffordabilityInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtToIncome {
    pub front_end_percent: Decimal,
    pub back_end_percent: Decimal,
    pub qualifies: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageResult {
    pub loan_amount: Decimal,
    pub down_payment_amount: Decimal,
    pub down_payment_percent: Decimal,
    pub principal_and_interest: Decimal,
    pub monthly_property_tax: Decimal,
    pub monthly_insurance: Decimal,
    pub monthly_pmi: Decimal,
    pub monthly_hoa: Decimal,
    pub total_monthly_payment: Decimal,
    pub total_interest: Decimal,
    pub total_principal_and_interest: Decimal,
    pub payoff_date: NaiveDate,
    pub debt_to_income: Option<DebtToIncome>,
    pub schedule: ScheduleView,
}

pub struct MortgageCalculator;

impl MortgageCalculator {
    /// Computes the monthly breakdown and schedule for `input`.
    ///
    /// # Errors
    ///
    /// Returns [`LoanError`] if the price is not positive, the down payment is
    /// outside `0..=price`, the term is zero or longer than
    /// [`MAX_TERM_MONTHS`], any cost is negative, income for the affordability
    /// check is not positive, or a monthly amount overflows.
    pub fn calculate(input: &MortgageInput) -> Result<MortgageResult, LoanError> {
        Self::validate(input)?;

        let down = input.down_payment.amount_for(input.home_price)?;
        if down < Decimal::ZERO || down > input.home_price {
            warn!(%down, price = %input.home_price, "down payment out of range");
            return Err(LoanError::InvalidDownPayment {
                down_payment: down,
                home_price: input.home_price,
            });
        }
        let down_percent = percent_of(down, input.home_price)
            .ok_or(LoanError::InvalidHomePrice(input.home_price))?;
        let loan_amount = input.home_price - down;

        let terms = LoanTerms::from_years(
            loan_amount,
            input.annual_rate_percent,
            input.term_years,
        );
        let schedule = AmortizationSchedule::build(&terms)?;
        debug!(
            %loan_amount,
            payment = %schedule.payment,
            periods = schedule.periods(),
            "mortgage schedule built"
        );

        let monthly_pmi = if down_percent < PMI_THRESHOLD_PERCENT {
            loan_amount
                .checked_mul(input.pmi_rate_percent)
                .map(|v| v / ONE_HUNDRED / MONTHS_PER_YEAR)
                .ok_or(LoanError::NonFinite("monthly PMI"))?
        } else {
            Decimal::ZERO
        };
        let monthly_property_tax = input.annual_property_tax / MONTHS_PER_YEAR;
        let monthly_insurance = input.annual_insurance / MONTHS_PER_YEAR;

        let total_monthly = checked_sum([
            schedule.payment,
            monthly_property_tax,
            monthly_insurance,
            monthly_pmi,
            input.monthly_hoa,
        ])
        .ok_or(LoanError::NonFinite("total monthly payment"))?;

        let debt_to_income = input
            .affordability
            .as_ref()
            .map(|a| Self::debt_to_income(total_monthly, a))
            .transpose()?;

        let payoff_date = input
            .start_date
            .checked_add_months(Months::new(schedule.periods()))
            .ok_or(LoanError::DateOutOfRange)?;

        Ok(MortgageResult {
            loan_amount: round_half_up(loan_amount),
            down_payment_amount: round_half_up(down),
            down_payment_percent: round_half_up(down_percent),
            principal_and_interest: round_half_up(schedule.payment),
            monthly_property_tax: round_half_up(monthly_property_tax),
            monthly_insurance: round_half_up(monthly_insurance),
            monthly_pmi: round_half_up(monthly_pmi),
            monthly_hoa: round_half_up(input.monthly_hoa),
            total_monthly_payment: round_half_up(total_monthly),
            total_interest: round_half_up(schedule.total_interest()),
            total_principal_and_interest: round_half_up(schedule.total_paid()),
            payoff_date,
            debt_to_income,
            schedule: schedule.view(input.schedule_mode),
        })
    }

    /// Front-end and back-end ratios against the 28/36 guideline.
    pub fn debt_to_income(
        housing_payment: Decimal,
        affordability: &AffordabilityInput,
    ) -> Result<DebtToIncome, LoanError> {
        let income = affordability.gross_monthly_income;
        if income <= Decimal::ZERO {
            return Err(LoanError::InvalidIncome(income));
        }
        if affordability.other_monthly_debts < Decimal::ZERO {
            return Err(LoanError::NegativeAmount {
                field: "other monthly debts",
                value: affordability.other_monthly_debts,
            });
        }

        let front = percent_of(housing_payment, income)
            .ok_or(LoanError::NonFinite("front-end ratio"))?;
        let back = housing_payment
            .checked_add(affordability.other_monthly_debts)
            .and_then(|debts| percent_of(debts, income))
            .ok_or(LoanError::NonFinite("back-end ratio"))?;

        Ok(DebtToIncome {
            front_end_percent: round_half_up(front),
            back_end_percent: round_half_up(back),
            qualifies: front <= FRONT_END_DTI_LIMIT && back <= BACK_END_DTI_LIMIT,
        })
    }

    fn validate(input: &MortgageInput) -> Result<(), LoanError> {
        if input.home_price <= Decimal::ZERO {
            warn!(price = %input.home_price, "home price must be positive");
            return Err(LoanError::InvalidHomePrice(input.home_price));
        }
        if input.term_years == 0 || input.term_years > MAX_TERM_MONTHS / 12 {
            return Err(LoanError::InvalidTerm(input.term_years.saturating_mul(12)));
        }
        if input.annual_rate_percent < Decimal::ZERO {
            return Err(LoanError::NegativeRate(input.annual_rate_percent));
        }
        for (field, value) in [
            ("property tax", input.annual_property_tax),
            ("insurance", input.annual_insurance),
            ("PMI rate", input.pmi_rate_percent),
            ("HOA", input.monthly_hoa),
        ] {
            if value < Decimal::ZERO {
                return Err(LoanError::NegativeAmount { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scenario() -> MortgageInput {
        MortgageInput {
            home_price: dec!(400000),
            down_payment: DownPayment::Amount(dec!(80000)),
            annual_rate_percent: dec!(5.98),
            term_years: 30,
            annual_property_tax: dec!(4800),
            annual_insurance: dec!(1200),
            pmi_rate_percent: dec!(0.5),
            monthly_hoa: dec!(50),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            schedule_mode: ScheduleMode::Monthly,
            affordability: None,
        }
    }

    // =========================================================================
    // loan setup tests
    // =========================================================================

    #[test]
    fn twenty_percent_down_has_no_pmi() {
        let result = MortgageCalculator::calculate(&scenario()).unwrap();

        assert_eq!(result.loan_amount, dec!(320000.00));
        assert_eq!(result.down_payment_percent, dec!(20.00));
        assert_eq!(result.monthly_pmi, dec!(0.00));
    }

    #[test]
    fn percent_down_payment_matches_amount() {
        let mut input = scenario();
        input.down_payment = DownPayment::Percent(dec!(20));

        let by_percent = MortgageCalculator::calculate(&input).unwrap();
        let by_amount = MortgageCalculator::calculate(&scenario()).unwrap();

        assert_eq!(by_percent, by_amount);
    }

    #[test]
    fn monthly_costs_are_added_to_payment() {
        let result = MortgageCalculator::calculate(&scenario()).unwrap();

        assert_eq!(result.principal_and_interest, dec!(1914.45));
        assert_eq!(result.monthly_property_tax, dec!(400.00));
        assert_eq!(result.monthly_insurance, dec!(100.00));
        assert_eq!(result.monthly_hoa, dec!(50.00));
        // 1914.4489 + 400 + 100 + 50
        assert_eq!(result.total_monthly_payment, dec!(2464.45));
    }

    #[test]
    fn small_down_payment_adds_pmi() {
        let mut input = scenario();
        input.down_payment = DownPayment::Percent(dec!(10));

        let result = MortgageCalculator::calculate(&input).unwrap();

        // 360000 × 0.5% / 12
        assert_eq!(result.loan_amount, dec!(360000.00));
        assert_eq!(result.monthly_pmi, dec!(150.00));
    }

    #[test]
    fn zero_down_payment_is_allowed() {
        let mut input = scenario();
        input.down_payment = DownPayment::Amount(Decimal::ZERO);

        let result = MortgageCalculator::calculate(&input).unwrap();

        assert_eq!(result.loan_amount, dec!(400000.00));
        assert_eq!(result.down_payment_percent, dec!(0.00));
    }

    #[test]
    fn full_cash_purchase_has_empty_schedule() {
        let mut input = scenario();
        input.down_payment = DownPayment::Percent(dec!(100));

        let result = MortgageCalculator::calculate(&input).unwrap();

        assert_eq!(result.principal_and_interest, dec!(0.00));
        assert!(result.schedule.is_empty());
        assert_eq!(result.payoff_date, input.start_date);
    }

    #[test]
    fn payoff_date_is_thirty_years_out() {
        let result = MortgageCalculator::calculate(&scenario()).unwrap();

        assert_eq!(
            result.payoff_date,
            NaiveDate::from_ymd_opt(2055, 1, 1).unwrap()
        );
    }

    #[test]
    fn annual_view_is_honoured() {
        let mut input = scenario();
        input.schedule_mode = ScheduleMode::Annual;

        let result = MortgageCalculator::calculate(&input).unwrap();

        assert_eq!(result.schedule.mode(), ScheduleMode::Annual);
        assert_eq!(result.schedule.len(), 30);
    }

    // =========================================================================
    // validation tests
    // =========================================================================

    #[test]
    fn down_payment_above_price_is_rejected() {
        let mut input = scenario();
        input.down_payment = DownPayment::Amount(dec!(500000));

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::InvalidDownPayment {
                down_payment: dec!(500000),
                home_price: dec!(400000),
            })
        );
    }

    #[test]
    fn zero_price_is_rejected() {
        let mut input = scenario();
        input.home_price = Decimal::ZERO;

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::InvalidHomePrice(Decimal::ZERO))
        );
    }

    #[test]
    fn zero_term_is_rejected() {
        let mut input = scenario();
        input.term_years = 0;

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::InvalidTerm(0))
        );
    }

    #[test]
    fn term_past_maximum_is_rejected() {
        let mut input = scenario();
        input.term_years = 51;

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::InvalidTerm(612))
        );
    }

    #[test]
    fn overflowing_monthly_costs_are_rejected() {
        let mut input = scenario();
        input.down_payment = DownPayment::Percent(dec!(10));
        input.pmi_rate_percent = Decimal::MAX;

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::NonFinite("monthly PMI"))
        );

        let mut input = scenario();
        input.monthly_hoa = Decimal::MAX;

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::NonFinite("total monthly payment"))
        );
    }

    #[test]
    fn negative_cost_is_rejected() {
        let mut input = scenario();
        input.annual_insurance = dec!(-1);

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::NegativeAmount {
                field: "insurance",
                value: dec!(-1)
            })
        );
    }

    // =========================================================================
    // debt_to_income tests
    // =========================================================================

    #[test]
    fn dti_within_guideline_qualifies() {
        let dti = MortgageCalculator::debt_to_income(dec!(2000), &AffordabilityInput {
            gross_monthly_income: dec!(10000),
            other_monthly_debts: dec!(500),
        })
        .unwrap();

        assert_eq!(dti.front_end_percent, dec!(20.00));
        assert_eq!(dti.back_end_percent, dec!(25.00));
        assert!(dti.qualifies);
    }

    #[test]
    fn dti_over_back_end_limit_does_not_qualify() {
        let dti = MortgageCalculator::debt_to_income(dec!(2500), &AffordabilityInput {
            gross_monthly_income: dec!(10000),
            other_monthly_debts: dec!(1200),
        })
        .unwrap();

        assert_eq!(dti.back_end_percent, dec!(37.00));
        assert!(!dti.qualifies);
    }

    #[test]
    fn dti_at_exact_limits_qualifies() {
        let dti = MortgageCalculator::debt_to_income(dec!(2800), &AffordabilityInput {
            gross_monthly_income: dec!(10000),
            other_monthly_debts: dec!(800),
        })
        .unwrap();

        assert!(dti.qualifies);
    }

    #[test]
    fn dti_with_unbounded_debts_is_rejected() {
        let dti = MortgageCalculator::debt_to_income(dec!(2000), &AffordabilityInput {
            gross_monthly_income: dec!(0.0001),
            other_monthly_debts: Decimal::MAX,
        });

        assert_eq!(dti, Err(LoanError::NonFinite("back-end ratio")));
    }

    #[test]
    fn zero_income_is_rejected() {
        let mut input = scenario();
        input.affordability = Some(AffordabilityInput {
            gross_monthly_income: Decimal::ZERO,
            other_monthly_debts: Decimal::ZERO,
        });

        assert_eq!(
            MortgageCalculator::calculate(&input),
            Err(LoanError::InvalidIncome(Decimal::ZERO))
        );
    }
}
