//! Progressive income tax.
//!
//! | Module         | Responsibility |
//! |----------------|----------------|
//! | [`brackets`]   | Marginal bracket walk and table validation |
//! | [`income_tax`] | Gross income to balance due |
//! | [`tables`]     | Per-year brackets, standard deductions and caps |

pub mod brackets;
pub mod income_tax;
pub mod tables;

use rust_decimal::Decimal;
use thiserror::Error;

pub use brackets::{BracketDetail, BracketTax, ProgressiveTax, validate_bracket_table};
pub use income_tax::{AboveTheLineDeductions, IncomeTaxCalculator, IncomeTaxInput, IncomeTaxResult};
pub use tables::{TaxTable, TaxTableError, TaxTables};

use crate::FilingStatusCode;

/// Errors raised while computing income tax.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxError {
    /// No bracket table was supplied.
    #[error("no tax brackets provided")]
    NoTaxBrackets,

    /// No table is loaded for the requested year.
    #[error("no tax table for year {0}")]
    UnknownTaxYear(i32),

    /// The year's table lacks brackets or a deduction for the status.
    #[error("no tax data for {status} in {year}")]
    MissingFilingStatus {
        year: i32,
        status: FilingStatusCode,
    },

    /// An income or deduction amount was negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    /// An intermediate amount overflowed the decimal range.
    #[error("computation did not produce a finite result ({0})")]
    NonFinite(&'static str),
}

/// Structural problems in a bracket table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketTableError {
    #[error("bracket table is empty")]
    Empty,

    /// The first bracket must start at zero.
    #[error("first bracket starts at {0}, expected 0")]
    DoesNotStartAtZero(Decimal),

    /// A bracket's upper bound is not above its lower bound.
    #[error("bracket {index} is empty or inverted ({lower}..{upper})")]
    NonAscending {
        index: usize,
        lower: Decimal,
        upper: Decimal,
    },

    /// Consecutive brackets leave a gap or overlap.
    #[error("bracket {index} starts at {lower}, expected {expected}")]
    NotContiguous {
        index: usize,
        lower: Decimal,
        expected: Decimal,
    },

    /// Only the last bracket may be unbounded, and it must be.
    #[error("bracket {0} has a misplaced open upper bound")]
    MisplacedOpenBound(usize),

    #[error("bracket {index} has a negative rate {rate}")]
    NegativeRate { index: usize, rate: Decimal },
}
