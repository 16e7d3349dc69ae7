//! Month-by-month amortization.
//!
//! Each period charges interest on the opening balance, applies the rest of
//! the payment (plus any extra principal) to the balance, and stops when the
//! balance reaches zero or the term runs out. The last permitted period always
//! takes the remaining balance so decimal drift never leaves a residue.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{LoanError, payment::monthly_payment, validate_terms};
use crate::calculations::common::{max, monthly_rate};
use crate::{AmortizationRow, AnnualRow, LoanTerms, ScheduleMode, ScheduleView};

/// Balances within this distance of the payment are treated as paid off.
const PAYOFF_TOLERANCE: Decimal = dec!(0.000001);

/// A complete schedule plus the level payment it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmortizationSchedule {
    pub payment: Decimal,
    pub periods_per_year: u32,
    pub rows: Vec<AmortizationRow>,
}

impl AmortizationSchedule {
    /// Builds the baseline monthly schedule for `terms`.
    ///
    /// # Errors
    ///
    /// Returns [`LoanError`] for invalid terms or when the payment or an
    /// interest charge overflows.
    pub fn build(terms: &LoanTerms) -> Result<Self, LoanError> {
        validate_terms(terms)?;
        let payment = monthly_payment(terms)?;
        let rows = amortize(
            terms.principal,
            monthly_rate(terms.annual_rate_percent),
            payment,
            terms.term_months,
            |_| Decimal::ZERO,
        )?;

        Ok(Self {
            payment,
            periods_per_year: 12,
            rows,
        })
    }

    pub fn periods(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn total_interest(&self) -> Decimal {
        self.rows.iter().map(|r| r.interest).sum()
    }

    pub fn total_principal(&self) -> Decimal {
        self.rows.iter().map(|r| r.principal).sum()
    }

    pub fn total_paid(&self) -> Decimal {
        self.rows.iter().map(|r| r.payment).sum()
    }

    /// Folds the rows into one entry per year.
    ///
    /// The final year may hold fewer periods when the loan pays off early.
    pub fn annual_rows(&self) -> Vec<AnnualRow> {
        let window = self.periods_per_year.max(1) as usize;
        self.rows
            .chunks(window)
            .enumerate()
            .map(|(idx, chunk)| AnnualRow {
                year: idx as u32 + 1,
                periods: chunk.len() as u32,
                payment: chunk.iter().map(|r| r.payment).sum(),
                principal: chunk.iter().map(|r| r.principal).sum(),
                interest: chunk.iter().map(|r| r.interest).sum(),
                ending_balance: chunk
                    .last()
                    .map(|r| r.ending_balance)
                    .unwrap_or(Decimal::ZERO),
            })
            .collect()
    }

    pub fn view(
        &self,
        mode: ScheduleMode,
    ) -> ScheduleView {
        match mode {
            ScheduleMode::Monthly => ScheduleView::Monthly(self.rows.clone()),
            ScheduleMode::Annual => ScheduleView::Annual(self.annual_rows()),
        }
    }
}

/// Runs the amortization loop.
///
/// `extra_for` supplies the extra principal for a 1-based period. At most
/// `max_periods` rows are produced. Fails when the running total paid leaves
/// the decimal range, so sums over the returned rows cannot overflow.
pub(crate) fn amortize<F>(
    principal: Decimal,
    rate: Decimal,
    payment: Decimal,
    max_periods: u32,
    extra_for: F,
) -> Result<Vec<AmortizationRow>, LoanError>
where
    F: Fn(u32) -> Decimal,
{
    let mut balance = principal;
    let mut total_paid = Decimal::ZERO;
    let mut rows = Vec::new();

    for period in 1..=max_periods {
        if balance <= Decimal::ZERO {
            break;
        }

        let interest = balance
            .checked_mul(rate)
            .ok_or(LoanError::NonFinite("period interest"))?;
        let scheduled = max(payment - interest, Decimal::ZERO);
        let headroom = max(balance - scheduled, Decimal::ZERO);
        let extra = max(extra_for(period), Decimal::ZERO).min(headroom);

        let mut principal_paid = scheduled + extra;
        if period == max_periods || balance - principal_paid <= PAYOFF_TOLERANCE {
            principal_paid = balance;
        }
        balance -= principal_paid;

        let paid = principal_paid
            .checked_add(interest)
            .ok_or(LoanError::NonFinite("period payment"))?;
        total_paid = total_paid
            .checked_add(paid)
            .ok_or(LoanError::NonFinite("total paid"))?;

        rows.push(AmortizationRow {
            period,
            payment: paid,
            principal: principal_paid,
            interest,
            extra_principal: extra,
            ending_balance: balance,
        });
    }

    Ok(rows)
}
