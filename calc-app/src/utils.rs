use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use calc_core::calculations::investment_return::CashFlow;
use calc_core::calculations::credit_utilization::CreditAccount;
use calc_core::{FilingStatusCode, ScheduleMode};

/// Error returned when a string cannot be parsed as a [`Decimal`].
#[derive(Debug, Error)]
#[error("invalid decimal '{input}': {source}")]
pub struct ParseDecimalError {
    input: String,
    #[source]
    source: rust_decimal::Error,
}

/// Normalizes input for decimal parsing: trims whitespace and removes commas (thousands separator).
fn normalize_decimal_input(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Parses a string into a [`Decimal`].
///
/// Handles comma as thousands separator (e.g. `"1,234.56"`).
/// Empty or whitespace-only input is treated as 0.
pub fn parse_decimal(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    normalized.parse().map_err(|e| {
        tracing::warn!(input = %s, "invalid decimal: {}", e);
        ParseDecimalError {
            input: s.to_string(),
            source: e,
        }
    })
}

pub fn parse_filing_status(s: &str) -> Result<FilingStatusCode, String> {
    FilingStatusCode::parse(&s.trim().to_uppercase())
        .ok_or_else(|| format!("unknown filing status '{s}' (expected S, MFJ, MFS, HOH or QSS)"))
}

pub fn parse_schedule_mode(s: &str) -> Result<ScheduleMode, String> {
    ScheduleMode::parse(&s.trim().to_lowercase())
        .ok_or_else(|| format!("unknown schedule mode '{s}' (expected monthly or annual)"))
}

/// `name:balance:limit`; the name may itself contain colons.
pub fn parse_credit_account(s: &str) -> Result<CreditAccount, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(limit), Some(balance), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected name:balance:limit, got '{s}'"));
    };
    Ok(CreditAccount {
        name: name.trim().to_string(),
        balance: parse_decimal(balance).map_err(|e| e.to_string())?,
        limit: parse_decimal(limit).map_err(|e| e.to_string())?,
    })
}

/// `YYYY-MM-DD:amount`, negative amounts being withdrawals.
pub fn parse_cash_flow(s: &str) -> Result<CashFlow, String> {
    let (date, amount) = s
        .split_once(':')
        .ok_or_else(|| format!("expected YYYY-MM-DD:amount, got '{s}'"))?;
    Ok(CashFlow {
        date: date
            .trim()
            .parse::<NaiveDate>()
            .map_err(|e| format!("invalid date '{date}': {e}"))?,
        amount: parse_decimal(amount).map_err(|e| e.to_string())?,
    })
}

/// `1234567.891` → `1,234,567.89`.
pub fn format_money(d: Decimal) -> String {
    let rounded = d.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((&text, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// Formats an optional [`Decimal`] for display, using "—" when `None`.
pub fn opt_decimal_display(d: &Option<Decimal>) -> String {
    d.as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "—".to_string())
}
