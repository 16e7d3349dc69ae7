//! Calculation engines for the calculator widgets.
//!
//! Every engine is a pure function over its input struct. [`calculator`] ties
//! them together behind a single tagged input type.

pub mod bmi;
pub mod calculator;
pub mod common;
pub mod credit_utilization;
pub mod investment_return;
pub mod mortgage;
pub mod tax;
pub mod typing_speed;

pub use bmi::{BmiCalculator, BmiCategory, BmiError, BmiInput, BmiResult, BodyMeasurements};
pub use calculator::{CalculatorError, CalculatorInput, CalculatorResult, calculate};
pub use credit_utilization::{
    CreditAccount, CreditUtilizationCalculator, CreditUtilizationError, CreditUtilizationInput,
    CreditUtilizationResult, UtilizationRating,
};
pub use investment_return::{
    CashFlow, InvestmentReturnCalculator, InvestmentReturnError, InvestmentReturnInput,
    InvestmentReturnResult,
};
pub use mortgage::{
    AmortizationSchedule, BiweeklyInput, BiweeklySimulator, DownPayment, ExtraPaymentInput,
    ExtraPaymentSimulator, LoanError, MortgageCalculator, MortgageInput, MortgageResult,
    PayoffComparison,
};
pub use tax::{
    IncomeTaxCalculator, IncomeTaxInput, IncomeTaxResult, TaxError, TaxTable, TaxTables,
};
pub use typing_speed::{TypingSpeedCalculator, TypingSpeedError, TypingSpeedInput, TypingSpeedResult};
