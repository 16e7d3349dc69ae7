//! Federal tax data by year.
//!
//! A [`TaxTable`] bundles everything the income tax calculator needs for one
//! year: the bracket schedule and standard deduction for each filing status,
//! plus the caps on above-the-line items. [`TaxTables::builtin`] ships 2024
//! and 2025; [`TaxTables::load`] reads a year from a repository instead.
//!
//! Qualifying surviving spouses use the married-filing-jointly schedule and
//! deduction.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::debug;

use super::{BracketTableError, TaxError, validate_bracket_table};
use crate::db::{CalculatorRepository, RepositoryError};
use crate::{FilingStatusCode, TaxBracket, TaxYearConfig};

const FEDERAL_RATES: [Decimal; 7] = [
    dec!(0.10),
    dec!(0.12),
    dec!(0.22),
    dec!(0.24),
    dec!(0.32),
    dec!(0.35),
    dec!(0.37),
];

#[derive(Debug, Error)]
pub enum TaxTableError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid {status} bracket table for {year}: {source}")]
    InvalidBrackets {
        year: i32,
        status: FilingStatusCode,
        #[source]
        source: BracketTableError,
    },
}

/// Tax data for one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxTable {
    pub config: TaxYearConfig,
    pub standard_deductions: BTreeMap<FilingStatusCode, Decimal>,
    pub brackets: BTreeMap<FilingStatusCode, Vec<TaxBracket>>,
}

impl TaxTable {
    pub fn tax_year(&self) -> i32 {
        self.config.tax_year
    }

    pub fn brackets_for(
        &self,
        status: FilingStatusCode,
    ) -> Result<&[TaxBracket], TaxError> {
        self.brackets
            .get(&status)
            .map(Vec::as_slice)
            .filter(|b| !b.is_empty())
            .ok_or(TaxError::MissingFilingStatus {
                year: self.tax_year(),
                status,
            })
    }

    pub fn standard_deduction(
        &self,
        status: FilingStatusCode,
    ) -> Result<Decimal, TaxError> {
        self.standard_deductions
            .get(&status)
            .copied()
            .ok_or(TaxError::MissingFilingStatus {
                year: self.tax_year(),
                status,
            })
    }

    /// Validates every bracket schedule in the table.
    pub fn validate(&self) -> Result<(), TaxTableError> {
        for (status, brackets) in &self.brackets {
            validate_bracket_table(brackets).map_err(|source| TaxTableError::InvalidBrackets {
                year: self.tax_year(),
                status: *status,
                source,
            })?;
        }
        Ok(())
    }
}

/// Tax tables keyed by year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxTables {
    tables: BTreeMap<i32, TaxTable>,
}

impl TaxTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables for 2024 and 2025.
    pub fn builtin() -> Self {
        let mut tables = Self::new();
        tables.insert(table_2024());
        tables.insert(table_2025());
        tables
    }

    /// Adds or replaces the table for its year.
    pub fn insert(
        &mut self,
        table: TaxTable,
    ) {
        self.tables.insert(table.tax_year(), table);
    }

    pub fn get(
        &self,
        year: i32,
    ) -> Result<&TaxTable, TaxError> {
        self.tables.get(&year).ok_or(TaxError::UnknownTaxYear(year))
    }

    /// Loaded years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.tables.keys().copied().collect()
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.tables.keys().next_back().copied()
    }

    /// Reads one year's table from `repo` and validates its brackets.
    ///
    /// Every filing status must have brackets and a standard deduction.
    pub async fn load(
        repo: &dyn CalculatorRepository,
        year: i32,
    ) -> Result<TaxTable, TaxTableError> {
        let config = repo.get_tax_year_config(year).await?;

        let mut standard_deductions = BTreeMap::new();
        let mut brackets = BTreeMap::new();
        for status in FilingStatusCode::ALL {
            let deduction = repo.get_standard_deduction(year, status).await?;
            standard_deductions.insert(status, deduction.amount);
            brackets.insert(status, repo.get_tax_brackets(year, status).await?);
        }

        let table = TaxTable {
            config,
            standard_deductions,
            brackets,
        };
        table.validate()?;
        debug!(year, "loaded tax table from repository");
        Ok(table)
    }
}

fn schedule(
    year: i32,
    status: FilingStatusCode,
    thresholds: [Decimal; 6],
) -> Vec<TaxBracket> {
    let mut lower = Decimal::ZERO;
    FEDERAL_RATES
        .iter()
        .enumerate()
        .map(|(i, rate)| {
            let upper = thresholds.get(i).copied();
            let bracket = TaxBracket {
                tax_year: year,
                filing_status: status,
                lower_bound: lower,
                upper_bound: upper,
                rate: *rate,
            };
            lower = upper.unwrap_or(lower);
            bracket
        })
        .collect()
}

fn build_table(
    config: TaxYearConfig,
    deductions: [Decimal; 4],
    thresholds: [[Decimal; 6]; 4],
) -> TaxTable {
    use FilingStatusCode::*;

    let year = config.tax_year;
    let [single, joint, separate, head] = deductions;
    let [single_t, joint_t, separate_t, head_t] = thresholds;

    let standard_deductions = BTreeMap::from([
        (Single, single),
        (MarriedFilingJointly, joint),
        (MarriedFilingSeparately, separate),
        (HeadOfHousehold, head),
        (QualifyingSurvivingSpouse, joint),
    ]);
    let brackets = BTreeMap::from([
        (Single, schedule(year, Single, single_t)),
        (MarriedFilingJointly, schedule(year, MarriedFilingJointly, joint_t)),
        (MarriedFilingSeparately, schedule(year, MarriedFilingSeparately, separate_t)),
        (HeadOfHousehold, schedule(year, HeadOfHousehold, head_t)),
        (QualifyingSurvivingSpouse, schedule(year, QualifyingSurvivingSpouse, joint_t)),
    ]);

    TaxTable {
        config,
        standard_deductions,
        brackets,
    }
}

fn table_2024() -> TaxTable {
    build_table(
        TaxYearConfig {
            tax_year: 2024,
            retirement_plan_limit: dec!(23000),
            ira_limit: dec!(7000),
            hsa_limit: dec!(4150),
            student_loan_interest_limit: dec!(2500),
        },
        [dec!(14600), dec!(29200), dec!(14600), dec!(21900)],
        [
            [dec!(11600), dec!(47150), dec!(100525), dec!(191950), dec!(243725), dec!(609350)],
            [dec!(23200), dec!(94300), dec!(201050), dec!(383900), dec!(487450), dec!(731200)],
            [dec!(11600), dec!(47150), dec!(100525), dec!(191950), dec!(243725), dec!(365600)],
            [dec!(16550), dec!(63100), dec!(100500), dec!(191950), dec!(243700), dec!(609350)],
        ],
    )
}

fn table_2025() -> TaxTable {
    build_table(
        TaxYearConfig {
            tax_year: 2025,
            retirement_plan_limit: dec!(23500),
            ira_limit: dec!(7000),
            hsa_limit: dec!(4300),
            student_loan_interest_limit: dec!(2500),
        },
        [dec!(15750), dec!(31500), dec!(15750), dec!(23625)],
        [
            [dec!(11925), dec!(48475), dec!(103350), dec!(197300), dec!(250525), dec!(626350)],
            [dec!(23850), dec!(96950), dec!(206700), dec!(394600), dec!(501050), dec!(751600)],
            [dec!(11925), dec!(48475), dec!(103350), dec!(197300), dec!(250525), dec!(375800)],
            [dec!(17000), dec!(64850), dec!(103350), dec!(197300), dec!(250500), dec!(626350)],
        ],
    )
}
