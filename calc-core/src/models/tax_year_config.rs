use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-year caps for above-the-line deduction items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearConfig {
    pub tax_year: i32,
    pub retirement_plan_limit: Decimal,
    pub ira_limit: Decimal,
    pub hsa_limit: Decimal,
    pub student_loan_interest_limit: Decimal,
}
