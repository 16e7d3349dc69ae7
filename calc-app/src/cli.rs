use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use calc_core::calculations::bmi::{BmiInput, BodyMeasurements};
use calc_core::calculations::credit_utilization::{
    CreditAccount, CreditUtilizationInput, DEFAULT_TARGET_PERCENT,
};
use calc_core::calculations::investment_return::{CashFlow, InvestmentReturnInput};
use calc_core::calculations::mortgage::{
    AffordabilityInput, BiweeklyInput, DownPayment, ExtraPaymentInput, MortgageInput,
};
use calc_core::calculations::tax::{AboveTheLineDeductions, IncomeTaxInput};
use calc_core::calculations::typing_speed::TypingSpeedInput;
use calc_core::{CalculatorInput, ExtraPaymentPlan, FilingStatusCode, LoanTerms, ScheduleMode};

use crate::utils::{
    parse_cash_flow, parse_credit_account, parse_decimal, parse_filing_status, parse_schedule_mode,
};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Everyday finance and health calculators.
///
/// Each calculator prints its result and a share link that `open` can
/// replay. Results can be saved as named scenarios.
#[derive(Debug, Parser)]
#[command(name = "widget-calc", version)]
pub struct Cli {
    /// TOML config file (default: ./widget-calc.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend (`sqlite` or `memory`).
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Connection string. For SQLite a file path or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log level or filter directive; `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Monthly mortgage payment with taxes, insurance, PMI and HOA.
    Mortgage(MortgageArgs),

    /// Payoff with extra principal payments versus the original schedule.
    Extra(ExtraArgs),

    /// Payoff with half payments every two weeks versus monthly.
    Biweekly(BiweeklyArgs),

    /// Federal income tax estimate.
    Tax(TaxArgs),

    /// Body mass index.
    Bmi(BmiArgs),

    /// Credit card utilization.
    Credit(CreditArgs),

    /// Words per minute and accuracy.
    Typing(TypingArgs),

    /// Average annual investment return.
    Invest(InvestArgs),

    /// Recalculate a shared link.
    Open {
        link: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Manage saved scenarios.
    #[command(subcommand)]
    Scenario(ScenarioCommand),
}

#[derive(Debug, Subcommand)]
pub enum ScenarioCommand {
    /// List saved scenarios, newest first.
    List {
        /// Only scenarios of this calculator (e.g. `mortgage`, `income_tax`).
        #[arg(long)]
        mode: Option<String>,
    },

    /// Show a saved scenario's result and share link.
    Show { id: i64 },

    /// Delete a saved scenario.
    Delete { id: i64 },
}

#[derive(Debug, Clone, Default, Args)]
pub struct SaveArgs {
    /// Save the calculation under this name.
    #[arg(long)]
    pub save: Option<String>,
}

/// Values the calculator arguments fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputDefaults {
    pub today: NaiveDate,
    pub tax_year: i32,
    pub schedule_mode: ScheduleMode,
}

// ─── calculator arguments ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MortgageArgs {
    #[arg(long, value_parser = parse_decimal)]
    pub price: Decimal,

    /// Down payment amount.
    #[arg(long, value_parser = parse_decimal, conflicts_with = "down_percent")]
    pub down: Option<Decimal>,

    /// Down payment as a percent of the price.
    #[arg(long, value_parser = parse_decimal)]
    pub down_percent: Option<Decimal>,

    /// Annual interest rate in percent.
    #[arg(long, value_parser = parse_decimal)]
    pub rate: Decimal,

    #[arg(long, default_value_t = 30)]
    pub years: u32,

    /// Annual property tax.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub property_tax: Decimal,

    /// Annual home insurance.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub insurance: Decimal,

    /// Annual PMI rate in percent of the loan, charged below 20% down.
    #[arg(long, value_parser = parse_decimal, default_value = "0.5")]
    pub pmi: Decimal,

    /// Monthly HOA dues.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub hoa: Decimal,

    /// First payment month (default: today).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Schedule view (`monthly` or `annual`).
    #[arg(long, value_parser = parse_schedule_mode)]
    pub schedule: Option<ScheduleMode>,

    /// Gross monthly income, enables the debt-to-income check.
    #[arg(long, value_parser = parse_decimal)]
    pub income: Option<Decimal>,

    /// Other monthly debt payments for the debt-to-income check.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub debts: Decimal,

    /// Write the amortization schedule to this CSV file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl MortgageArgs {
    pub fn to_input(
        &self,
        defaults: &InputDefaults,
    ) -> CalculatorInput {
        let down_payment = match (self.down, self.down_percent) {
            (_, Some(percent)) => DownPayment::Percent(percent),
            (amount, None) => DownPayment::Amount(amount.unwrap_or(Decimal::ZERO)),
        };
        CalculatorInput::Mortgage(MortgageInput {
            home_price: self.price,
            down_payment,
            annual_rate_percent: self.rate,
            term_years: self.years,
            annual_property_tax: self.property_tax,
            annual_insurance: self.insurance,
            pmi_rate_percent: self.pmi,
            monthly_hoa: self.hoa,
            start_date: self.start.unwrap_or(defaults.today),
            schedule_mode: self.schedule.unwrap_or(defaults.schedule_mode),
            affordability: self.income.map(|income| AffordabilityInput {
                gross_monthly_income: income,
                other_monthly_debts: self.debts,
            }),
        })
    }
}

#[derive(Debug, Args)]
pub struct LoanArgs {
    /// Amount borrowed.
    #[arg(long, value_parser = parse_decimal)]
    pub principal: Decimal,

    /// Annual interest rate in percent.
    #[arg(long, value_parser = parse_decimal)]
    pub rate: Decimal,

    #[arg(long, default_value_t = 30)]
    pub years: u32,

    /// First payment date (default: today).
    #[arg(long)]
    pub start: Option<NaiveDate>,
}

impl LoanArgs {
    fn terms(&self) -> LoanTerms {
        LoanTerms::from_years(self.principal, self.rate, self.years)
    }
}

#[derive(Debug, Args)]
pub struct ExtraArgs {
    #[command(flatten)]
    pub loan: LoanArgs,

    /// Added to every monthly payment.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub monthly_extra: Decimal,

    /// Added to every 12th payment.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub yearly_extra: Decimal,

    /// Lump sum paid once.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub one_time: Decimal,

    /// Payment number (1-based) that carries the lump sum.
    #[arg(long, default_value_t = 1)]
    pub one_time_period: u32,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl ExtraArgs {
    pub fn to_input(
        &self,
        defaults: &InputDefaults,
    ) -> CalculatorInput {
        CalculatorInput::ExtraPayment(ExtraPaymentInput {
            terms: self.loan.terms(),
            plan: ExtraPaymentPlan {
                monthly_extra: self.monthly_extra,
                yearly_extra: self.yearly_extra,
                one_time_amount: self.one_time,
                one_time_at_period: self.one_time_period,
            },
            start_date: self.loan.start.unwrap_or(defaults.today),
        })
    }
}

#[derive(Debug, Args)]
pub struct BiweeklyArgs {
    #[command(flatten)]
    pub loan: LoanArgs,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl BiweeklyArgs {
    pub fn to_input(
        &self,
        defaults: &InputDefaults,
    ) -> CalculatorInput {
        CalculatorInput::Biweekly(BiweeklyInput {
            terms: self.loan.terms(),
            start_date: self.loan.start.unwrap_or(defaults.today),
        })
    }
}

#[derive(Debug, Args)]
pub struct TaxArgs {
    /// Tax year (default: config `default_tax_year`, else the newest loaded).
    #[arg(long)]
    pub year: Option<i32>,

    /// Filing status: S, MFJ, MFS, HOH or QSS.
    #[arg(long, value_parser = parse_filing_status, default_value = "S")]
    pub status: FilingStatusCode,

    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub wages: Decimal,

    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub other_income: Decimal,

    /// 401(k)/403(b) contributions.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub retirement: Decimal,

    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub ira: Decimal,

    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub hsa: Decimal,

    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub student_loan_interest: Decimal,

    /// Total itemized deductions; used only when above the standard deduction.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub itemized: Decimal,

    /// Non-refundable credits.
    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub credits: Decimal,

    #[arg(long, value_parser = parse_decimal, default_value = "0")]
    pub withholding: Decimal,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl TaxArgs {
    pub fn to_input(
        &self,
        defaults: &InputDefaults,
    ) -> CalculatorInput {
        CalculatorInput::IncomeTax(IncomeTaxInput {
            tax_year: self.year.unwrap_or(defaults.tax_year),
            filing_status: self.status,
            wages: self.wages,
            other_income: self.other_income,
            adjustments: AboveTheLineDeductions {
                retirement_plan: self.retirement,
                ira: self.ira,
                hsa: self.hsa,
                student_loan_interest: self.student_loan_interest,
            },
            itemized_deductions: self.itemized,
            credits: self.credits,
            withholding: self.withholding,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Units {
    /// Kilograms and centimeters.
    Metric,
    /// Pounds and inches.
    Imperial,
}

#[derive(Debug, Args)]
pub struct BmiArgs {
    #[arg(long, value_enum, default_value_t = Units::Metric)]
    pub units: Units,

    #[arg(long, value_parser = parse_decimal)]
    pub weight: Decimal,

    #[arg(long, value_parser = parse_decimal)]
    pub height: Decimal,

    #[arg(long)]
    pub age: Option<u32>,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl BmiArgs {
    pub fn to_input(&self) -> CalculatorInput {
        let measurements = match self.units {
            Units::Metric => BodyMeasurements::Metric {
                weight_kg: self.weight,
                height_cm: self.height,
            },
            Units::Imperial => BodyMeasurements::Imperial {
                weight_lb: self.weight,
                height_in: self.height,
            },
        };
        CalculatorInput::Bmi(BmiInput {
            measurements,
            age: self.age,
        })
    }
}

#[derive(Debug, Args)]
pub struct CreditArgs {
    /// One card as `name:balance:limit`; repeat for each card.
    #[arg(long = "account", value_parser = parse_credit_account, required = true)]
    pub accounts: Vec<CreditAccount>,

    /// Target utilization percent.
    #[arg(long, value_parser = parse_decimal, default_value_t = DEFAULT_TARGET_PERCENT)]
    pub target: Decimal,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl CreditArgs {
    pub fn to_input(&self) -> CalculatorInput {
        CalculatorInput::CreditUtilization(CreditUtilizationInput {
            accounts: self.accounts.clone(),
            target_percent: self.target,
        })
    }
}

#[derive(Debug, Args)]
pub struct TypingArgs {
    /// Characters typed.
    #[arg(long, conflicts_with_all = ["reference", "typed"])]
    pub chars: Option<u32>,

    /// Errors made.
    #[arg(long, default_value_t = 0, conflicts_with_all = ["reference", "typed"])]
    pub errors: u32,

    /// Text the typist was asked to type.
    #[arg(long, requires = "typed")]
    pub reference: Option<String>,

    /// Text actually typed, compared to `--reference` position by position.
    #[arg(long, requires = "reference")]
    pub typed: Option<String>,

    /// Test duration in seconds.
    #[arg(long, value_parser = parse_decimal)]
    pub seconds: Decimal,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl TypingArgs {
    pub fn to_input(&self) -> Result<CalculatorInput> {
        let input = match (&self.reference, &self.typed, self.chars) {
            (Some(reference), Some(typed), _) => {
                TypingSpeedInput::from_texts(reference, typed, self.seconds)
            }
            (_, _, Some(chars)) => TypingSpeedInput {
                characters_typed: chars,
                errors: self.errors,
                duration_seconds: self.seconds,
            },
            _ => bail!("give either --chars or both --reference and --typed"),
        };
        Ok(CalculatorInput::TypingSpeed(input))
    }
}

#[derive(Debug, Args)]
pub struct InvestArgs {
    /// Starting value (cumulative mode).
    #[arg(long, value_parser = parse_decimal, conflicts_with = "flows")]
    pub initial: Option<Decimal>,

    /// Value at `--end`.
    #[arg(long = "final", value_parser = parse_decimal)]
    pub final_value: Decimal,

    /// Date of the starting value (cumulative mode).
    #[arg(long, conflicts_with = "flows")]
    pub start: Option<NaiveDate>,

    /// Valuation date (default: today).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Dated contribution `YYYY-MM-DD:amount` (negative for withdrawals);
    /// repeat for each. Switches to money-weighted mode.
    #[arg(long = "flow", value_parser = parse_cash_flow)]
    pub flows: Vec<CashFlow>,

    #[command(flatten)]
    pub save: SaveArgs,
}

impl InvestArgs {
    pub fn to_input(
        &self,
        defaults: &InputDefaults,
    ) -> Result<CalculatorInput> {
        let end = self.end.unwrap_or(defaults.today);
        let input = if !self.flows.is_empty() {
            InvestmentReturnInput::CashFlow {
                cash_flows: self.flows.clone(),
                final_value: self.final_value,
                valuation_date: end,
            }
        } else {
            let (Some(initial), Some(start)) = (self.initial, self.start) else {
                bail!("give --initial and --start, or one or more --flow entries");
            };
            InvestmentReturnInput::Cumulative {
                initial_value: initial,
                final_value: self.final_value,
                start_date: start,
                end_date: end,
            }
        };
        Ok(CalculatorInput::InvestmentReturn(input))
    }
}
