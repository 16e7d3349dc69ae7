mod filing_status;
mod loan;
mod saved_scenario;
mod standard_deduction;
mod tax_bracket;
mod tax_year_config;

pub use filing_status::FilingStatusCode;
pub use loan::{
    AmortizationRow, AnnualRow, ExtraPaymentPlan, LoanTerms, PaymentCadence, PayoffSummary,
    ScheduleMode, ScheduleView,
};
pub use saved_scenario::{CalculatorKind, NewSavedScenario, SavedScenario};
pub use standard_deduction::StandardDeduction;
pub use tax_bracket::TaxBracket;
pub use tax_year_config::TaxYearConfig;
