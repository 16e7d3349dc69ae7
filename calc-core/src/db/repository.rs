use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CalculatorKind, FilingStatusCode, NewSavedScenario, SavedScenario, StandardDeduction,
    TaxBracket, TaxYearConfig,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stored snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[async_trait]
pub trait CalculatorRepository: Send + Sync {
    // Tax year config
    async fn get_tax_year_config(&self, year: i32) -> Result<TaxYearConfig, RepositoryError>;
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    // Standard deductions
    async fn get_standard_deduction(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<StandardDeduction, RepositoryError>;

    // Tax brackets
    async fn get_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
    ) -> Result<Vec<TaxBracket>, RepositoryError>;

    /// Replaces every bracket for the year and status with `brackets`.
    ///
    /// Fails with [`RepositoryError::NotFound`] when the tax year has no
    /// config row.
    async fn replace_tax_brackets(
        &self,
        tax_year: i32,
        filing_status: FilingStatusCode,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError>;

    // Saved scenarios
    async fn create_scenario(
        &self,
        scenario: NewSavedScenario,
    ) -> Result<SavedScenario, RepositoryError>;

    async fn get_scenario(&self, id: i64) -> Result<SavedScenario, RepositoryError>;

    async fn delete_scenario(&self, id: i64) -> Result<(), RepositoryError>;

    /// Newest first, optionally restricted to one calculator.
    async fn list_scenarios(
        &self,
        kind: Option<CalculatorKind>,
    ) -> Result<Vec<SavedScenario>, RepositoryError>;
}
