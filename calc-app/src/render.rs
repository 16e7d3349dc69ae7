//! Plain-text and CSV output for calculator results.

use std::io::{self, Write};

use calc_core::calculations::credit_utilization::CreditUtilizationResult;
use calc_core::calculations::investment_return::InvestmentReturnResult;
use calc_core::calculations::mortgage::{MortgageResult, PayoffComparison};
use calc_core::calculations::tax::IncomeTaxResult;
use calc_core::calculations::{BmiResult, TypingSpeedResult};
use calc_core::{CalculatorResult, PayoffSummary, SavedScenario, ScheduleView};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::utils::{format_money, opt_decimal_display};

/// Writes a human-readable report of `result`.
pub fn render_result(
    out: &mut dyn Write,
    result: &CalculatorResult,
) -> io::Result<()> {
    match result {
        CalculatorResult::Mortgage(r) => render_mortgage(out, r),
        CalculatorResult::ExtraPayment(r) => render_payoff(out, "Extra payments", r),
        CalculatorResult::Biweekly(r) => render_payoff(out, "Biweekly payments", r),
        CalculatorResult::IncomeTax(r) => render_income_tax(out, r),
        CalculatorResult::Bmi(r) => render_bmi(out, r),
        CalculatorResult::CreditUtilization(r) => render_credit(out, r),
        CalculatorResult::TypingSpeed(r) => render_typing(out, r),
        CalculatorResult::InvestmentReturn(r) => render_investment(out, r),
    }
}

fn line(
    out: &mut dyn Write,
    label: &str,
    value: impl std::fmt::Display,
) -> io::Result<()> {
    writeln!(out, "  {label:<28} {value:>16}")
}

fn percent(d: Decimal) -> String {
    format!("{}%", d.round_dp(2))
}

fn render_mortgage(
    out: &mut dyn Write,
    r: &MortgageResult,
) -> io::Result<()> {
    writeln!(out, "Mortgage")?;
    line(out, "Loan amount", format_money(r.loan_amount))?;
    line(
        out,
        "Down payment",
        format!("{} ({})", format_money(r.down_payment_amount), percent(r.down_payment_percent)),
    )?;
    writeln!(out)?;
    writeln!(out, "Monthly payment")?;
    line(out, "Principal & interest", format_money(r.principal_and_interest))?;
    line(out, "Property tax", format_money(r.monthly_property_tax))?;
    line(out, "Home insurance", format_money(r.monthly_insurance))?;
    line(out, "PMI", format_money(r.monthly_pmi))?;
    line(out, "HOA", format_money(r.monthly_hoa))?;
    line(out, "Total", format_money(r.total_monthly_payment))?;
    writeln!(out)?;
    line(out, "Total interest", format_money(r.total_interest))?;
    line(out, "Total of P&I payments", format_money(r.total_principal_and_interest))?;
    line(out, "Payoff date", r.payoff_date)?;

    if let Some(dti) = &r.debt_to_income {
        writeln!(out)?;
        writeln!(out, "Affordability")?;
        line(out, "Front-end DTI", percent(dti.front_end_percent))?;
        line(out, "Back-end DTI", percent(dti.back_end_percent))?;
        line(out, "Within 28/36 guideline", if dti.qualifies { "yes" } else { "no" })?;
    }

    writeln!(out)?;
    render_schedule(out, &r.schedule)
}

fn render_schedule(
    out: &mut dyn Write,
    schedule: &ScheduleView,
) -> io::Result<()> {
    match schedule {
        ScheduleView::Monthly(rows) => {
            writeln!(
                out,
                "{:>6} {:>12} {:>12} {:>12} {:>14}",
                "Month", "Payment", "Principal", "Interest", "Balance"
            )?;
            for row in rows {
                writeln!(
                    out,
                    "{:>6} {:>12} {:>12} {:>12} {:>14}",
                    row.period,
                    format_money(row.payment),
                    format_money(row.principal),
                    format_money(row.interest),
                    format_money(row.ending_balance),
                )?;
            }
        }
        ScheduleView::Annual(rows) => {
            writeln!(
                out,
                "{:>6} {:>14} {:>14} {:>14} {:>14}",
                "Year", "Payments", "Principal", "Interest", "Balance"
            )?;
            for row in rows {
                writeln!(
                    out,
                    "{:>6} {:>14} {:>14} {:>14} {:>14}",
                    row.year,
                    format_money(row.payment),
                    format_money(row.principal),
                    format_money(row.interest),
                    format_money(row.ending_balance),
                )?;
            }
        }
    }
    Ok(())
}

fn render_summary(
    out: &mut dyn Write,
    title: &str,
    s: &PayoffSummary,
) -> io::Result<()> {
    writeln!(out, "{title}")?;
    line(out, "Payments", s.total_periods)?;
    line(out, "Months", s.months_equivalent)?;
    line(out, "Total interest", format_money(s.total_interest_paid))?;
    line(out, "Total paid", format_money(s.total_paid))?;
    line(out, "Payoff date", s.payoff_date)
}

fn render_payoff(
    out: &mut dyn Write,
    title: &str,
    r: &PayoffComparison,
) -> io::Result<()> {
    render_summary(out, "Original schedule", &r.baseline)?;
    writeln!(out)?;
    render_summary(out, title, &r.accelerated)?;
    writeln!(out)?;
    line(out, "Interest saved", format_money(r.interest_saved))?;
    line(out, "Months saved", r.months_saved)
}

fn render_income_tax(
    out: &mut dyn Write,
    r: &IncomeTaxResult,
) -> io::Result<()> {
    writeln!(out, "Income tax {} ({})", r.tax_year, r.filing_status.label())?;
    line(out, "Gross income", format_money(r.gross_income))?;
    line(out, "Adjustments", format_money(r.adjustments))?;
    line(out, "Adjusted gross income", format_money(r.adjusted_gross_income))?;
    let deduction_label = if r.used_itemized_deduction {
        "Itemized deduction"
    } else {
        "Standard deduction"
    };
    line(out, deduction_label, format_money(r.deduction))?;
    line(out, "Taxable income", format_money(r.taxable_income))?;
    writeln!(out)?;

    writeln!(out, "{:>14} {:>14} {:>7} {:>14} {:>12}", "From", "To", "Rate", "Taxed", "Tax")?;
    for b in &r.brackets {
        writeln!(
            out,
            "{:>14} {:>14} {:>7} {:>14} {:>12}",
            format_money(b.lower_bound),
            b.upper_bound.map(format_money).unwrap_or_else(|| opt_decimal_display(&None)),
            percent(b.rate * Decimal::ONE_HUNDRED),
            format_money(b.taxable_amount),
            format_money(b.tax),
        )?;
    }
    writeln!(out)?;

    line(out, "Tax before credits", format_money(r.liability))?;
    line(out, "Credits", format_money(r.credits))?;
    line(out, "Tax", format_money(r.net_liability))?;
    line(out, "Withholding", format_money(r.withholding))?;
    if r.balance_due.is_sign_negative() && !r.balance_due.is_zero() {
        line(out, "Refund", format_money(-r.balance_due))?;
    } else {
        line(out, "Balance due", format_money(r.balance_due))?;
    }
    line(out, "Effective rate", percent(r.effective_rate_percent))?;
    line(out, "Marginal rate", percent(r.marginal_rate_percent))
}

fn render_bmi(
    out: &mut dyn Write,
    r: &BmiResult,
) -> io::Result<()> {
    writeln!(out, "BMI")?;
    line(out, "BMI", r.bmi)?;
    line(out, "Category", r.category.label())?;
    line(
        out,
        "Healthy weight",
        format!(
            "{}-{} {}",
            r.healthy_weight_min,
            r.healthy_weight_max,
            r.weight_unit.symbol()
        ),
    )
}

fn render_credit(
    out: &mut dyn Write,
    r: &CreditUtilizationResult,
) -> io::Result<()> {
    writeln!(out, "Credit utilization")?;
    writeln!(out, "  {:<20} {:>12} {:>12} {:>8}", "Account", "Balance", "Limit", "Used")?;
    for a in &r.accounts {
        writeln!(
            out,
            "  {:<20} {:>12} {:>12} {:>8}",
            a.name,
            format_money(a.balance),
            format_money(a.limit),
            a.utilization_percent.map(percent).unwrap_or_else(|| opt_decimal_display(&None)),
        )?;
    }
    writeln!(out)?;
    line(out, "Total balance", format_money(r.total_balance))?;
    line(out, "Total limit", format_money(r.total_limit))?;
    line(out, "Overall utilization", percent(r.overall_percent))?;
    line(out, "Rating", r.rating.label())?;
    line(
        out,
        format!("Pay down to reach {}", percent(r.target_percent)).as_str(),
        format_money(r.pay_down_to_target),
    )
}

fn render_typing(
    out: &mut dyn Write,
    r: &TypingSpeedResult,
) -> io::Result<()> {
    writeln!(out, "Typing speed")?;
    line(out, "Gross WPM", r.gross_wpm)?;
    line(out, "Net WPM", r.net_wpm)?;
    line(out, "Accuracy", percent(r.accuracy_percent))?;
    line(out, "Characters", r.characters_typed)?;
    line(out, "Errors", r.errors)
}

fn render_investment(
    out: &mut dyn Write,
    r: &InvestmentReturnResult,
) -> io::Result<()> {
    writeln!(out, "Investment return")?;
    match r {
        InvestmentReturnResult::Cumulative(c) => {
            line(out, "Gain", format_money(c.gain))?;
            line(out, "Total return", percent(c.total_return_percent))?;
            line(out, "Annualized return", percent(c.annualized_return_percent))?;
            line(out, "Years", c.years)
        }
        InvestmentReturnResult::CashFlow(c) => {
            line(out, "Contributions", format_money(c.total_contributions))?;
            line(out, "Withdrawals", format_money(c.total_withdrawals))?;
            line(out, "Gain", format_money(c.gain))?;
            line(out, "Annualized return", percent(c.annualized_return_percent))
        }
    }
}

/// Writes saved scenarios as an aligned table.
pub fn render_scenario_list(
    out: &mut dyn Write,
    scenarios: &[SavedScenario],
) -> io::Result<()> {
    if scenarios.is_empty() {
        return writeln!(out, "No saved scenarios.");
    }
    writeln!(out, "{:>5}  {:<20}  {:<18}  {}", "ID", "Mode", "Saved", "Name")?;
    for s in scenarios {
        writeln!(
            out,
            "{:>5}  {:<20}  {:<18}  {}",
            s.id,
            s.kind.as_str(),
            s.saved_at.format("%Y-%m-%d %H:%M"),
            s.name
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct MonthlyCsvRow {
    period: u32,
    payment: Decimal,
    principal: Decimal,
    interest: Decimal,
    extra_principal: Decimal,
    ending_balance: Decimal,
}

#[derive(Debug, Serialize)]
struct AnnualCsvRow {
    year: u32,
    periods: u32,
    payment: Decimal,
    principal: Decimal,
    interest: Decimal,
    ending_balance: Decimal,
}

/// Writes the schedule with a header row, amounts rounded to cents.
pub fn write_schedule_csv<W: Write>(
    writer: W,
    schedule: &ScheduleView,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    match schedule {
        ScheduleView::Monthly(rows) => {
            for row in rows {
                csv_writer.serialize(MonthlyCsvRow {
                    period: row.period,
                    payment: row.payment.round_dp(2),
                    principal: row.principal.round_dp(2),
                    interest: row.interest.round_dp(2),
                    extra_principal: row.extra_principal.round_dp(2),
                    ending_balance: row.ending_balance.round_dp(2),
                })?;
            }
        }
        ScheduleView::Annual(rows) => {
            for row in rows {
                csv_writer.serialize(AnnualCsvRow {
                    year: row.year,
                    periods: row.periods,
                    payment: row.payment.round_dp(2),
                    principal: row.principal.round_dp(2),
                    interest: row.interest.round_dp(2),
                    ending_balance: row.ending_balance.round_dp(2),
                })?;
            }
        }
    }
    csv_writer.flush()?;
    Ok(())
}
