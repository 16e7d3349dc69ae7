//! Revolving credit utilization.
//!
//! Utilization is the share of available credit in use. Each card gets its own
//! ratio; the overall ratio and the pay-down needed to reach a target use the
//! totals across all cards.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{ONE_HUNDRED, checked_sum, max, percent_of, round_half_up};

pub const DEFAULT_TARGET_PERCENT: Decimal = dec!(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreditUtilizationError {
    #[error("at least one account is required")]
    NoAccounts,

    #[error("account {account}: {field} must not be negative, got {value}")]
    NegativeAmount {
        account: String,
        field: &'static str,
        value: Decimal,
    },

    /// Overall utilization is undefined without any credit.
    #[error("total credit limit must be positive")]
    NoCreditLimit,

    #[error("target utilization must be between 0 and 100, got {0}")]
    InvalidTarget(Decimal),

    #[error("computation did not produce a finite result ({0})")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub name: String,
    pub balance: Decimal,
    pub limit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUtilizationInput {
    pub accounts: Vec<CreditAccount>,
    #[serde(default = "default_target")]
    pub target_percent: Decimal,
}

fn default_target() -> Decimal {
    DEFAULT_TARGET_PERCENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationRating {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl UtilizationRating {
    pub fn from_percent(percent: Decimal) -> Self {
        if percent < dec!(10) {
            Self::Excellent
        } else if percent < dec!(30) {
            Self::Good
        } else if percent < dec!(50) {
            Self::Fair
        } else if percent < dec!(75) {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUtilization {
    pub name: String,
    pub balance: Decimal,
    pub limit: Decimal,
    /// `None` for a card with no limit.
    pub utilization_percent: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUtilizationResult {
    pub accounts: Vec<AccountUtilization>,
    pub total_balance: Decimal,
    pub total_limit: Decimal,
    pub overall_percent: Decimal,
    pub rating: UtilizationRating,
    pub target_percent: Decimal,
    /// Balance reduction needed to reach the target; zero when already there.
    pub pay_down_to_target: Decimal,
}

pub struct CreditUtilizationCalculator;

impl CreditUtilizationCalculator {
    pub fn calculate(
        input: &CreditUtilizationInput,
    ) -> Result<CreditUtilizationResult, CreditUtilizationError> {
        if input.accounts.is_empty() {
            return Err(CreditUtilizationError::NoAccounts);
        }
        if input.target_percent < Decimal::ZERO || input.target_percent > ONE_HUNDRED {
            return Err(CreditUtilizationError::InvalidTarget(input.target_percent));
        }

        let mut accounts = Vec::with_capacity(input.accounts.len());
        for account in &input.accounts {
            for (field, value) in [("balance", account.balance), ("limit", account.limit)] {
                if value < Decimal::ZERO {
                    return Err(CreditUtilizationError::NegativeAmount {
                        account: account.name.clone(),
                        field,
                        value,
                    });
                }
            }
            let utilization_percent = if account.limit.is_zero() {
                None
            } else {
                percent_of(account.balance, account.limit)
                    .map(round_half_up)
                    .map(Some)
                    .ok_or(CreditUtilizationError::NonFinite("account utilization"))?
            };
            accounts.push(AccountUtilization {
                name: account.name.clone(),
                balance: account.balance,
                limit: account.limit,
                utilization_percent,
            });
        }

        let total_balance = checked_sum(input.accounts.iter().map(|a| a.balance))
            .ok_or(CreditUtilizationError::NonFinite("total balance"))?;
        let total_limit = checked_sum(input.accounts.iter().map(|a| a.limit))
            .ok_or(CreditUtilizationError::NonFinite("total limit"))?;
        if total_limit.is_zero() {
            return Err(CreditUtilizationError::NoCreditLimit);
        }
        let overall = percent_of(total_balance, total_limit)
            .ok_or(CreditUtilizationError::NonFinite("overall utilization"))?;

        let target_balance = total_limit
            .checked_mul(input.target_percent)
            .map(|v| v / ONE_HUNDRED)
            .ok_or(CreditUtilizationError::NonFinite("target balance"))?;
        let pay_down = max(total_balance - target_balance, Decimal::ZERO);
        debug!(%overall, %pay_down, "credit utilization calculated");

        Ok(CreditUtilizationResult {
            accounts,
            total_balance,
            total_limit,
            overall_percent: round_half_up(overall),
            rating: UtilizationRating::from_percent(overall),
            target_percent: input.target_percent,
            pay_down_to_target: round_half_up(pay_down),
        })
    }
}
