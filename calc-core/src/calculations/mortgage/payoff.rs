//! Early-payoff simulations.
//!
//! Both simulators rerun the amortization loop of
//! [`amortization`](super::amortization) with a modified cash flow and compare
//! the outcome to the plain monthly schedule:
//!
//! - **Extra payments** add principal every month, every 12th month and once
//!   at a chosen period.
//! - **Biweekly** pays half the monthly payment every two weeks. Interest
//!   compounds per biweekly period; the month count is converted only for
//!   display.

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::amortization::{AmortizationSchedule, amortize};
use super::payment::monthly_payment;
use super::{LoanError, validate_terms};
use crate::calculations::common::{monthly_rate, periodic_rate, round_dp, round_half_up};
use crate::{AmortizationRow, ExtraPaymentPlan, LoanTerms, PaymentCadence, PayoffSummary};

/// Biweekly periods per month used for the displayed month count.
pub const BIWEEKLY_PERIODS_PER_MONTH: Decimal = dec!(2.1667);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraPaymentInput {
    pub terms: LoanTerms,
    pub plan: ExtraPaymentPlan,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiweeklyInput {
    pub terms: LoanTerms,
    pub start_date: NaiveDate,
}

/// An accelerated schedule measured against the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffComparison {
    pub baseline: PayoffSummary,
    pub accelerated: PayoffSummary,
    pub interest_saved: Decimal,
    pub months_saved: Decimal,
    /// Rows of the accelerated schedule.
    pub schedule: Vec<AmortizationRow>,
}

impl PayoffComparison {
    fn new(
        baseline: PayoffSummary,
        accelerated: PayoffSummary,
        schedule: Vec<AmortizationRow>,
    ) -> Self {
        Self {
            interest_saved: baseline.total_interest_paid - accelerated.total_interest_paid,
            months_saved: baseline.months_equivalent - accelerated.months_equivalent,
            baseline,
            accelerated,
            schedule,
        }
    }
}

impl PayoffSummary {
    /// Summarizes a finished schedule.
    pub fn from_schedule(
        schedule: &AmortizationSchedule,
        cadence: PaymentCadence,
        start_date: NaiveDate,
    ) -> Result<Self, LoanError> {
        let periods = schedule.periods();
        let (months_equivalent, payoff_date) = match cadence {
            PaymentCadence::Monthly => (
                Decimal::from(periods),
                start_date.checked_add_months(Months::new(periods)),
            ),
            PaymentCadence::Biweekly => (
                round_dp(Decimal::from(periods) / BIWEEKLY_PERIODS_PER_MONTH, 2),
                start_date.checked_add_days(Days::new(14 * u64::from(periods))),
            ),
        };

        Ok(Self {
            cadence,
            total_periods: periods,
            months_equivalent,
            total_interest_paid: round_half_up(schedule.total_interest()),
            total_paid: round_half_up(schedule.total_paid()),
            payoff_date: payoff_date.ok_or(LoanError::DateOutOfRange)?,
        })
    }
}

/// Monthly schedule with extra principal injections.
pub struct ExtraPaymentSimulator;

impl ExtraPaymentSimulator {
    /// Runs the monthly loop with `plan` applied.
    ///
    /// With an empty plan the result is identical to
    /// [`AmortizationSchedule::build`].
    pub fn simulate(
        terms: &LoanTerms,
        plan: &ExtraPaymentPlan,
    ) -> Result<AmortizationSchedule, LoanError> {
        validate_terms(terms)?;
        Self::validate_plan(plan)?;

        let payment = monthly_payment(terms)?;
        let rows = amortize(
            terms.principal,
            monthly_rate(terms.annual_rate_percent),
            payment,
            terms.term_months,
            |period| plan.extra_for_period(period),
        )?;

        Ok(AmortizationSchedule {
            payment,
            periods_per_year: 12,
            rows,
        })
    }

    /// Simulates `input` and compares it to the baseline schedule.
    pub fn compare(input: &ExtraPaymentInput) -> Result<PayoffComparison, LoanError> {
        let baseline = AmortizationSchedule::build(&input.terms)?;
        let accelerated = Self::simulate(&input.terms, &input.plan)?;
        debug!(
            baseline_periods = baseline.periods(),
            accelerated_periods = accelerated.periods(),
            "extra payment simulation complete"
        );

        Ok(PayoffComparison::new(
            PayoffSummary::from_schedule(&baseline, PaymentCadence::Monthly, input.start_date)?,
            PayoffSummary::from_schedule(&accelerated, PaymentCadence::Monthly, input.start_date)?,
            accelerated.rows,
        ))
    }

    fn validate_plan(plan: &ExtraPaymentPlan) -> Result<(), LoanError> {
        for (field, value) in [
            ("monthly extra", plan.monthly_extra),
            ("yearly extra", plan.yearly_extra),
            ("one-time amount", plan.one_time_amount),
        ] {
            if value < Decimal::ZERO {
                return Err(LoanError::NegativeAmount { field, value });
            }
        }
        if plan.one_time_at_period == 0 {
            return Err(LoanError::InvalidPeriod(plan.one_time_at_period));
        }
        Ok(())
    }
}

/// Half the monthly payment every two weeks.
pub struct BiweeklySimulator;

impl BiweeklySimulator {
    /// Number of biweekly periods allowed for a term of `term_months`.
    pub fn max_periods(term_months: u32) -> u32 {
        (term_months.saturating_mul(26)).div_ceil(12)
    }

    /// Runs the biweekly loop for `terms`.
    pub fn simulate(terms: &LoanTerms) -> Result<AmortizationSchedule, LoanError> {
        validate_terms(terms)?;

        let payment = monthly_payment(terms)? / Decimal::TWO;
        let rows = amortize(
            terms.principal,
            periodic_rate(terms.annual_rate_percent, 26),
            payment,
            Self::max_periods(terms.term_months),
            |_| Decimal::ZERO,
        )?;

        Ok(AmortizationSchedule {
            payment,
            periods_per_year: 26,
            rows,
        })
    }

    /// Simulates `input` and compares it to the monthly baseline.
    pub fn compare(input: &BiweeklyInput) -> Result<PayoffComparison, LoanError> {
        let baseline = AmortizationSchedule::build(&input.terms)?;
        let accelerated = Self::simulate(&input.terms)?;
        debug!(
            baseline_periods = baseline.periods(),
            biweekly_periods = accelerated.periods(),
            "biweekly simulation complete"
        );

        Ok(PayoffComparison::new(
            PayoffSummary::from_schedule(&baseline, PaymentCadence::Monthly, input.start_date)?,
            PayoffSummary::from_schedule(&accelerated, PaymentCadence::Biweekly, input.start_date)?,
            accelerated.rows,
        ))
    }
}
