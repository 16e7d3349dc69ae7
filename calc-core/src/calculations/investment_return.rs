//! Average annual return on an investment.
//!
//! Two modes:
//!
//! - **Cumulative**: a starting and ending value over a date range, giving the
//!   compound annual growth rate.
//! - **Cash flow**: dated contributions and withdrawals plus a final value.
//!   The money-weighted return `r` solves
//!
//!   ```text
//!   Σ amountᵢ × (1 + r)^tᵢ = final value
//!   ```
//!
//!   where `tᵢ` is the years from each flow to the valuation date. It is found
//!   by bisection.

use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::common::{ONE_HUNDRED, checked_sum, round_half_up};

const DAYS_PER_YEAR: Decimal = dec!(365);
const RATE_FLOOR: Decimal = dec!(-0.99);
const RATE_CEILING: Decimal = dec!(10);
const BISECTION_STEPS: u32 = 80;
const BISECTION_TOLERANCE: Decimal = dec!(0.0000000001);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvestmentReturnError {
    #[error("start date {start} is not before end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("initial value must be positive, got {0}")]
    InvalidInitialValue(Decimal),

    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("at least one contribution is required")]
    NoCashFlows,

    /// No rate in the search range balances the cash flows.
    #[error("no annualized return found between -99% and 1000%")]
    NoSolution,

    #[error("computation did not produce a finite result ({0})")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub date: NaiveDate,
    /// Positive for a contribution, negative for a withdrawal.
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvestmentReturnInput {
    Cumulative {
        initial_value: Decimal,
        final_value: Decimal,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    CashFlow {
        cash_flows: Vec<CashFlow>,
        final_value: Decimal,
        valuation_date: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeResult {
    pub gain: Decimal,
    pub total_return_percent: Decimal,
    pub annualized_return_percent: Decimal,
    pub years: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowResult {
    pub total_contributions: Decimal,
    pub total_withdrawals: Decimal,
    /// Final value plus withdrawals minus contributions.
    pub gain: Decimal,
    pub annualized_return_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvestmentReturnResult {
    Cumulative(CumulativeResult),
    CashFlow(CashFlowResult),
}

pub struct InvestmentReturnCalculator;

impl InvestmentReturnCalculator {
    pub fn calculate(
        input: &InvestmentReturnInput,
    ) -> Result<InvestmentReturnResult, InvestmentReturnError> {
        match input {
            InvestmentReturnInput::Cumulative {
                initial_value,
                final_value,
                start_date,
                end_date,
            } => Self::cumulative(*initial_value, *final_value, *start_date, *end_date)
                .map(InvestmentReturnResult::Cumulative),
            InvestmentReturnInput::CashFlow {
                cash_flows,
                final_value,
                valuation_date,
            } => Self::cash_flow(cash_flows, *final_value, *valuation_date)
                .map(InvestmentReturnResult::CashFlow),
        }
    }

    fn cumulative(
        initial: Decimal,
        final_value: Decimal,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CumulativeResult, InvestmentReturnError> {
        if start >= end {
            warn!(%start, %end, "investment start date is not before end date");
            return Err(InvestmentReturnError::StartAfterEnd { start, end });
        }
        if initial <= Decimal::ZERO {
            return Err(InvestmentReturnError::InvalidInitialValue(initial));
        }
        if final_value < Decimal::ZERO {
            return Err(InvestmentReturnError::NegativeAmount {
                field: "final value",
                value: final_value,
            });
        }

        let years = years_between(start, end);
        let ratio = final_value
            .checked_div(initial)
            .ok_or(InvestmentReturnError::NonFinite("growth ratio"))?;
        let annualized = if ratio.is_zero() {
            -Decimal::ONE
        } else {
            ratio
                .checked_powd(Decimal::ONE / years)
                .ok_or(InvestmentReturnError::NonFinite("annualized growth"))?
                - Decimal::ONE
        };
        let total_return = (ratio - Decimal::ONE)
            .checked_mul(ONE_HUNDRED)
            .ok_or(InvestmentReturnError::NonFinite("total return"))?;
        let annualized_percent = annualized
            .checked_mul(ONE_HUNDRED)
            .ok_or(InvestmentReturnError::NonFinite("annualized growth"))?;

        Ok(CumulativeResult {
            gain: round_half_up(final_value - initial),
            total_return_percent: round_half_up(total_return),
            annualized_return_percent: round_half_up(annualized_percent),
            years: round_half_up(years),
        })
    }

    fn cash_flow(
        flows: &[CashFlow],
        final_value: Decimal,
        valuation_date: NaiveDate,
    ) -> Result<CashFlowResult, InvestmentReturnError> {
        if flows.is_empty() {
            return Err(InvestmentReturnError::NoCashFlows);
        }
        if final_value < Decimal::ZERO {
            return Err(InvestmentReturnError::NegativeAmount {
                field: "final value",
                value: final_value,
            });
        }
        if let Some(late) = flows.iter().find(|f| f.date > valuation_date) {
            return Err(InvestmentReturnError::StartAfterEnd {
                start: late.date,
                end: valuation_date,
            });
        }

        let contributions = checked_sum(
            flows
                .iter()
                .map(|f| f.amount)
                .filter(|a| *a > Decimal::ZERO),
        )
        .ok_or(InvestmentReturnError::NonFinite("total contributions"))?;
        if contributions.is_zero() {
            return Err(InvestmentReturnError::NoCashFlows);
        }
        let withdrawals = checked_sum(
            flows
                .iter()
                .map(|f| f.amount)
                .filter(|a| *a < Decimal::ZERO)
                .map(|a| -a),
        )
        .ok_or(InvestmentReturnError::NonFinite("total withdrawals"))?;
        let gain = final_value
            .checked_add(withdrawals)
            .map(|v| v - contributions)
            .ok_or(InvestmentReturnError::NonFinite("gain"))?;

        let timed: Vec<(Decimal, Decimal)> = flows
            .iter()
            .map(|f| (f.amount, years_between(f.date, valuation_date)))
            .collect();
        let rate = solve_money_weighted(&timed, final_value)?;
        debug!(%rate, flows = flows.len(), "money-weighted return solved");

        Ok(CashFlowResult {
            total_contributions: round_half_up(contributions),
            total_withdrawals: round_half_up(withdrawals),
            gain: round_half_up(gain),
            annualized_return_percent: round_half_up(rate * ONE_HUNDRED),
        })
    }
}

fn years_between(
    start: NaiveDate,
    end: NaiveDate,
) -> Decimal {
    Decimal::from((end - start).num_days()) / DAYS_PER_YEAR
}

/// Future value of `flows` at `rate`, minus `target`.
fn excess_value(
    flows: &[(Decimal, Decimal)],
    rate: Decimal,
    target: Decimal,
) -> Result<Decimal, InvestmentReturnError> {
    let growth = Decimal::ONE + rate;
    let mut total = -target;
    for (amount, years) in flows {
        let factor = if years.is_zero() {
            Decimal::ONE
        } else {
            growth
                .checked_powd(*years)
                .ok_or(InvestmentReturnError::NonFinite("cash flow growth"))?
        };
        total = amount
            .checked_mul(factor)
            .and_then(|grown| total.checked_add(grown))
            .ok_or(InvestmentReturnError::NonFinite("cash flow growth"))?;
    }
    Ok(total)
}

fn solve_money_weighted(
    flows: &[(Decimal, Decimal)],
    target: Decimal,
) -> Result<Decimal, InvestmentReturnError> {
    let mut lo = RATE_FLOOR;
    let mut hi = RATE_CEILING;
    let f_lo = excess_value(flows, lo, target)?;
    let f_hi = excess_value(flows, hi, target)?;
    if f_lo.is_zero() {
        return Ok(lo);
    }
    if f_hi.is_zero() {
        return Ok(hi);
    }
    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return Err(InvestmentReturnError::NoSolution);
    }

    let lo_negative = f_lo.is_sign_negative();
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) / Decimal::TWO;
        let f_mid = excess_value(flows, mid, target)?;
        if f_mid.is_zero() || hi - lo < BISECTION_TOLERANCE {
            return Ok(mid);
        }
        if f_mid.is_sign_negative() == lo_negative {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok((lo + hi) / Decimal::TWO)
}
