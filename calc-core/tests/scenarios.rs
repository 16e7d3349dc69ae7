//! End-to-end calculator scenarios run through the dispatcher.

use calc_core::calculations::bmi::{BmiCategory, BmiError, BmiInput, BodyMeasurements};
use calc_core::calculations::credit_utilization::CreditUtilizationError;
use calc_core::calculations::investment_return::InvestmentReturnError;
use calc_core::calculations::mortgage::{
    BiweeklyInput, DownPayment, ExtraPaymentInput, LoanError, MortgageInput,
};
use calc_core::calculations::tax::{AboveTheLineDeductions, IncomeTaxInput, TaxError, TaxTables};
use calc_core::calculations::typing_speed::TypingSpeedError;
use calc_core::db::{MemoryRepository, RepositoryRegistry, DbConfig, MemoryRepositoryFactory};
use calc_core::{
    CalculatorError, CalculatorInput, CalculatorKind, CalculatorRepository, CalculatorResult,
    ExtraPaymentPlan,
    FilingStatusCode, LoanTerms, NewSavedScenario, ScheduleMode, calculate, share,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn loan() -> LoanTerms {
    LoanTerms::from_years(dec!(320000), dec!(5.98), 30)
}

#[test]
fn scenario_one_twenty_percent_down_mortgage() {
    let input = CalculatorInput::Mortgage(MortgageInput {
        home_price: dec!(400000),
        down_payment: DownPayment::Amount(dec!(80000)),
        annual_rate_percent: dec!(5.98),
        term_years: 30,
        annual_property_tax: Decimal::ZERO,
        annual_insurance: Decimal::ZERO,
        pmi_rate_percent: dec!(0.5),
        monthly_hoa: Decimal::ZERO,
        start_date: start(),
        schedule_mode: ScheduleMode::Monthly,
        affordability: None,
    });

    let CalculatorResult::Mortgage(result) = calculate(&input, &TaxTables::builtin()).unwrap()
    else {
        panic!("expected a mortgage result");
    };

    assert_eq!(result.loan_amount, dec!(320000.00));
    assert_eq!(result.principal_and_interest, dec!(1914.45));
    assert_eq!(result.monthly_pmi, Decimal::ZERO);
    assert_eq!(result.schedule.len(), 360);
}

#[test]
fn scenario_two_biweekly_beats_monthly() {
    let input = CalculatorInput::Biweekly(BiweeklyInput {
        terms: loan(),
        start_date: start(),
    });

    let CalculatorResult::Biweekly(comparison) =
        calculate(&input, &TaxTables::builtin()).unwrap()
    else {
        panic!("expected a biweekly result");
    };

    assert!(comparison.accelerated.total_interest_paid < comparison.baseline.total_interest_paid);
    assert!(comparison.accelerated.months_equivalent < dec!(360));
    assert_eq!(comparison.baseline.total_periods, 360);
    assert!(comparison.interest_saved > dec!(50000));
}

#[test]
fn scenario_three_bmi() {
    let input = CalculatorInput::Bmi(BmiInput {
        measurements: BodyMeasurements::Metric {
            weight_kg: dec!(70),
            height_cm: dec!(170),
        },
        age: None,
    });

    let CalculatorResult::Bmi(result) = calculate(&input, &TaxTables::builtin()).unwrap() else {
        panic!("expected a BMI result");
    };

    assert_eq!(result.bmi, dec!(24.22));
    assert_eq!(result.category, BmiCategory::NormalWeight);
    assert_eq!(result.category.label(), "Normal Weight");
}

#[test]
fn zero_extra_plan_matches_baseline() {
    let input = CalculatorInput::ExtraPayment(ExtraPaymentInput {
        terms: loan(),
        plan: ExtraPaymentPlan::default(),
        start_date: start(),
    });

    let CalculatorResult::ExtraPayment(comparison) =
        calculate(&input, &TaxTables::builtin()).unwrap()
    else {
        panic!("expected an extra payment result");
    };

    assert_eq!(comparison.accelerated, comparison.baseline);
    assert_eq!(comparison.interest_saved, Decimal::ZERO);
}

#[test]
fn single_filer_fixture_through_dispatcher() {
    let input = CalculatorInput::IncomeTax(IncomeTaxInput {
        tax_year: 2024,
        filing_status: FilingStatusCode::Single,
        wages: dec!(64600),
        other_income: Decimal::ZERO,
        adjustments: AboveTheLineDeductions::default(),
        itemized_deductions: Decimal::ZERO,
        credits: Decimal::ZERO,
        withholding: Decimal::ZERO,
    });

    let CalculatorResult::IncomeTax(result) = calculate(&input, &TaxTables::builtin()).unwrap()
    else {
        panic!("expected an income tax result");
    };

    assert_eq!(result.taxable_income, dec!(50000.00));
    assert_eq!(
        result.liability,
        dec!(11600) * dec!(0.10)
            + (dec!(47150) - dec!(11600)) * dec!(0.12)
            + (dec!(50000) - dec!(47150)) * dec!(0.22)
    );
}

// ── out-of-range links ──────────────────────────────────────────────────

const MAX: &str = "79228162514264337593543950335";
const TINY: &str = "0.0000000000000000000000000001";

#[test]
fn out_of_range_links_are_rejected() {
    let cases = [
        (
            "biweekly?p=1000&r=0&n=4294967295&sd=2025-01-01".to_string(),
            CalculatorError::Loan(LoanError::InvalidTerm(u32::MAX)),
        ),
        (
            "extra_payment?p=1000&r=0&n=601&me=0&ye=0&ot=0&op=1&sd=2025-01-01".to_string(),
            CalculatorError::Loan(LoanError::InvalidTerm(601)),
        ),
        (
            "mortgage?hp=400000&dp=80000&dt=a&r=5.98&t=51&tax=0&ins=0&pmi=0&hoa=0\
             &sd=2025-01-01&v=monthly"
                .to_string(),
            CalculatorError::Loan(LoanError::InvalidTerm(612)),
        ),
        (
            format!("typing_speed?c=100&e=0&s={TINY}"),
            CalculatorError::TypingSpeed(TypingSpeedError::NonFinite("gross speed")),
        ),
        (
            format!("bmi?u=metric&w={MAX}&h=0.0000000001"),
            CalculatorError::Bmi(BmiError::NonFinite("bmi")),
        ),
        (
            format!("investment_return?iv={TINY}&fv={MAX}&sd=2024-01-01&ed=2025-01-01"),
            CalculatorError::InvestmentReturn(InvestmentReturnError::NonFinite("growth ratio")),
        ),
        (
            format!(
                "income_tax?y=2024&fs=S&w={MAX}&oi={MAX}&rp=0&ira=0&hsa=0&sli=0&id=0&cr=0&wh=0"
            ),
            CalculatorError::Tax(TaxError::NonFinite("gross income")),
        ),
        (
            format!("credit_utilization?n=Visa,Amex&b=1,1&l={MAX},{MAX}&t=30"),
            CalculatorError::CreditUtilization(CreditUtilizationError::NonFinite("total limit")),
        ),
    ];

    for (link, expected) in cases {
        let input = share::decode(&link).unwrap_or_else(|e| panic!("{link}: {e}"));

        assert_eq!(calculate(&input, &TaxTables::builtin()), Err(expected), "{link}");
    }
}

#[test]
fn longest_term_link_still_calculates() {
    let input = share::decode("biweekly?p=320000&r=5.98&n=600&sd=2025-01-01").unwrap();

    let CalculatorResult::Biweekly(comparison) = calculate(&input, &TaxTables::builtin()).unwrap()
    else {
        panic!("expected a biweekly result");
    };

    assert_eq!(comparison.baseline.total_periods, 600);
    assert!(comparison.accelerated.total_periods < 1300);
}

#[tokio::test]
async fn shared_link_saved_and_restored() {
    let tables = TaxTables::builtin();
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(MemoryRepositoryFactory));
    let repo = registry
        .create(&DbConfig {
            backend: "memory".to_string(),
            connection_string: String::new(),
        })
        .await
        .unwrap();

    let input = share::decode("biweekly?p=320000&r=5.98&n=360&sd=2025-01-01").unwrap();
    let result = calculate(&input, &tables).unwrap();
    let saved = repo
        .create_scenario(NewSavedScenario {
            name: "biweekly plan".to_string(),
            input: input.clone(),
            result: result.clone(),
        })
        .await
        .unwrap();

    let restored = repo.get_scenario(saved.id).await.unwrap();

    assert_eq!(restored.kind, CalculatorKind::Biweekly);
    assert_eq!(restored.input, input);
    assert_eq!(calculate(&restored.input, &tables).unwrap(), restored.result);
}

#[tokio::test]
async fn tables_loaded_from_repository_match_builtin() {
    let builtin = TaxTables::builtin();
    let repo = MemoryRepository::with_tax_tables(&builtin);

    for year in repo.list_tax_years().await.unwrap() {
        let loaded = TaxTables::load(&repo, year).await.unwrap();
        assert_eq!(&loaded, builtin.get(year).unwrap());
    }
}
