//! One entry point for every widget.
//!
//! [`CalculatorInput`] carries the form values of exactly one calculator;
//! [`calculate`] routes it to the matching engine and wraps the outcome in the
//! mirrored [`CalculatorResult`] variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::bmi::{BmiCalculator, BmiError, BmiInput, BmiResult};
use super::credit_utilization::{
    CreditUtilizationCalculator, CreditUtilizationError, CreditUtilizationInput,
    CreditUtilizationResult,
};
use super::investment_return::{
    InvestmentReturnCalculator, InvestmentReturnError, InvestmentReturnInput,
    InvestmentReturnResult,
};
use super::mortgage::{
    BiweeklyInput, BiweeklySimulator, ExtraPaymentInput, ExtraPaymentSimulator, LoanError,
    MortgageCalculator, MortgageInput, MortgageResult, PayoffComparison,
};
use super::tax::{IncomeTaxCalculator, IncomeTaxInput, IncomeTaxResult, TaxError, TaxTables};
use super::typing_speed::{
    TypingSpeedCalculator, TypingSpeedError, TypingSpeedInput, TypingSpeedResult,
};
use crate::CalculatorKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculatorError {
    #[error(transparent)]
    Loan(#[from] LoanError),

    #[error(transparent)]
    Tax(#[from] TaxError),

    #[error(transparent)]
    Bmi(#[from] BmiError),

    #[error(transparent)]
    CreditUtilization(#[from] CreditUtilizationError),

    #[error(transparent)]
    TypingSpeed(#[from] TypingSpeedError),

    #[error(transparent)]
    InvestmentReturn(#[from] InvestmentReturnError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "input", rename_all = "snake_case")]
pub enum CalculatorInput {
    Mortgage(MortgageInput),
    ExtraPayment(ExtraPaymentInput),
    Biweekly(BiweeklyInput),
    IncomeTax(IncomeTaxInput),
    Bmi(BmiInput),
    CreditUtilization(CreditUtilizationInput),
    TypingSpeed(TypingSpeedInput),
    InvestmentReturn(InvestmentReturnInput),
}

impl CalculatorInput {
    pub fn kind(&self) -> CalculatorKind {
        match self {
            Self::Mortgage(_) => CalculatorKind::Mortgage,
            Self::ExtraPayment(_) => CalculatorKind::ExtraPayment,
            Self::Biweekly(_) => CalculatorKind::Biweekly,
            Self::IncomeTax(_) => CalculatorKind::IncomeTax,
            Self::Bmi(_) => CalculatorKind::Bmi,
            Self::CreditUtilization(_) => CalculatorKind::CreditUtilization,
            Self::TypingSpeed(_) => CalculatorKind::TypingSpeed,
            Self::InvestmentReturn(_) => CalculatorKind::InvestmentReturn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "result", rename_all = "snake_case")]
pub enum CalculatorResult {
    Mortgage(MortgageResult),
    ExtraPayment(PayoffComparison),
    Biweekly(PayoffComparison),
    IncomeTax(IncomeTaxResult),
    Bmi(BmiResult),
    CreditUtilization(CreditUtilizationResult),
    TypingSpeed(TypingSpeedResult),
    InvestmentReturn(InvestmentReturnResult),
}

impl CalculatorResult {
    pub fn kind(&self) -> CalculatorKind {
        match self {
            Self::Mortgage(_) => CalculatorKind::Mortgage,
            Self::ExtraPayment(_) => CalculatorKind::ExtraPayment,
            Self::Biweekly(_) => CalculatorKind::Biweekly,
            Self::IncomeTax(_) => CalculatorKind::IncomeTax,
            Self::Bmi(_) => CalculatorKind::Bmi,
            Self::CreditUtilization(_) => CalculatorKind::CreditUtilization,
            Self::TypingSpeed(_) => CalculatorKind::TypingSpeed,
            Self::InvestmentReturn(_) => CalculatorKind::InvestmentReturn,
        }
    }
}

/// Runs the calculator selected by `input`.
///
/// `tables` is consulted only for income tax.
pub fn calculate(
    input: &CalculatorInput,
    tables: &TaxTables,
) -> Result<CalculatorResult, CalculatorError> {
    let kind = input.kind();
    debug!(mode = kind.as_str(), "running calculator");

    let result = match input {
        CalculatorInput::Mortgage(i) => MortgageCalculator::calculate(i).map(CalculatorResult::Mortgage)?,
        CalculatorInput::ExtraPayment(i) => {
            ExtraPaymentSimulator::compare(i).map(CalculatorResult::ExtraPayment)?
        }
        CalculatorInput::Biweekly(i) => BiweeklySimulator::compare(i).map(CalculatorResult::Biweekly)?,
        CalculatorInput::IncomeTax(i) => IncomeTaxCalculator::new(tables)
            .calculate(i)
            .map(CalculatorResult::IncomeTax)?,
        CalculatorInput::Bmi(i) => BmiCalculator::calculate(i).map(CalculatorResult::Bmi)?,
        CalculatorInput::CreditUtilization(i) => {
            CreditUtilizationCalculator::calculate(i).map(CalculatorResult::CreditUtilization)?
        }
        CalculatorInput::TypingSpeed(i) => {
            TypingSpeedCalculator::calculate(i).map(CalculatorResult::TypingSpeed)?
        }
        CalculatorInput::InvestmentReturn(i) => {
            InvestmentReturnCalculator::calculate(i).map(CalculatorResult::InvestmentReturn)?
        }
    };

    Ok(result)
}

/// Like [`calculate`], logging rejected input at `warn`.
pub fn calculate_logged(
    input: &CalculatorInput,
    tables: &TaxTables,
) -> Result<CalculatorResult, CalculatorError> {
    calculate(input, tables).inspect_err(|err| {
        warn!(mode = input.kind().as_str(), error = %err, "calculation rejected");
    })
}
