use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three numbers every amortization starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Decimal,
    pub annual_rate_percent: Decimal,
    pub term_months: u32,
}

impl LoanTerms {
    pub fn new(
        principal: Decimal,
        annual_rate_percent: Decimal,
        term_months: u32,
    ) -> Self {
        Self {
            principal,
            annual_rate_percent,
            term_months,
        }
    }

    /// Convenience for the common "N years" form input.
    pub fn from_years(
        principal: Decimal,
        annual_rate_percent: Decimal,
        term_years: u32,
    ) -> Self {
        Self::new(principal, annual_rate_percent, term_years.saturating_mul(12))
    }
}

/// Additional principal paid on top of the scheduled payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraPaymentPlan {
    /// Added every period.
    pub monthly_extra: Decimal,
    /// Added every 12th period.
    pub yearly_extra: Decimal,
    /// Added once, at `one_time_at_period`.
    pub one_time_amount: Decimal,
    pub one_time_at_period: u32,
}

impl ExtraPaymentPlan {
    pub fn is_empty(&self) -> bool {
        self.monthly_extra.is_zero() && self.yearly_extra.is_zero() && self.one_time_amount.is_zero()
    }

    /// Total extra principal scheduled for `period` (1-based).
    pub fn extra_for_period(
        &self,
        period: u32,
    ) -> Decimal {
        let mut extra = self.monthly_extra;
        if period % 12 == 0 {
            extra += self.yearly_extra;
        }
        if period == self.one_time_at_period {
            extra += self.one_time_amount;
        }
        extra
    }
}

impl Default for ExtraPaymentPlan {
    fn default() -> Self {
        Self {
            monthly_extra: Decimal::ZERO,
            yearly_extra: Decimal::ZERO,
            one_time_amount: Decimal::ZERO,
            one_time_at_period: 1,
        }
    }
}

/// One period of an amortization schedule. Amounts are unrounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub period: u32,
    pub payment: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    /// Portion of `principal` that came from an extra payment.
    pub extra_principal: Decimal,
    pub ending_balance: Decimal,
}

/// Periods of one year folded together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualRow {
    pub year: u32,
    pub periods: u32,
    pub payment: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub ending_balance: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    #[default]
    Monthly,
    Annual,
}

impl ScheduleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(Self::Monthly),
            "annual" => Some(Self::Annual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "rows", rename_all = "snake_case")]
pub enum ScheduleView {
    Monthly(Vec<AmortizationRow>),
    Annual(Vec<AnnualRow>),
}

impl ScheduleView {
    pub fn mode(&self) -> ScheduleMode {
        match self {
            Self::Monthly(_) => ScheduleMode::Monthly,
            Self::Annual(_) => ScheduleMode::Annual,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Monthly(rows) => rows.len(),
            Self::Annual(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentCadence {
    Monthly,
    Biweekly,
}

impl PaymentCadence {
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Biweekly => 26,
        }
    }
}

/// Totals of a finished schedule, rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffSummary {
    pub cadence: PaymentCadence,
    pub total_periods: u32,
    /// `total_periods` expressed in months. Exact for monthly schedules,
    /// approximate for biweekly ones.
    pub months_equivalent: Decimal,
    pub total_interest_paid: Decimal,
    pub total_paid: Decimal,
    pub payoff_date: NaiveDate,
}
