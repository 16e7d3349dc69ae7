//! Shareable links.
//!
//! A link is `<mode>?<query>`, where `mode` is the [`CalculatorKind`] name and
//! the query holds the calculator's inputs under short keys:
//!
//! ```text
//! bmi?u=metric&w=70&h=170
//! credit_utilization?n=Visa%2CAmex&b=1500%2C500&l=5000%2C5000&t=30
//! ```
//!
//! Decoding a link and running the calculator reproduces the original result.
//! Cash-flow investment inputs have no flat form and cannot be shared.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::calculations::bmi::{BmiInput, BodyMeasurements};
use crate::calculations::credit_utilization::{CreditAccount, CreditUtilizationInput};
use crate::calculations::investment_return::InvestmentReturnInput;
use crate::calculations::mortgage::{
    AffordabilityInput, BiweeklyInput, DownPayment, ExtraPaymentInput, MortgageInput,
};
use crate::calculations::tax::{AboveTheLineDeductions, IncomeTaxInput};
use crate::calculations::typing_speed::TypingSpeedInput;
use crate::calculations::CalculatorInput;
use crate::{CalculatorKind, ExtraPaymentPlan, FilingStatusCode, LoanTerms, ScheduleMode};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("link has no '?' separating mode and inputs")]
    MissingQuery,

    #[error("unknown calculator mode '{0}'")]
    UnknownMode(String),

    /// The input has no flat link form.
    #[error("{0} cannot be shared as a link")]
    Unsupported(&'static str),

    #[error("could not encode link: {0}")]
    Encode(String),

    #[error("could not decode link: {0}")]
    Decode(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Encodes `input` as a link.
pub fn encode(input: &CalculatorInput) -> Result<String, ShareError> {
    let query = match input {
        CalculatorInput::Mortgage(i) => to_query(&MortgageQuery::from(i))?,
        CalculatorInput::ExtraPayment(i) => to_query(&ExtraQuery::from(i))?,
        CalculatorInput::Biweekly(i) => to_query(&BiweeklyQuery::from(i))?,
        CalculatorInput::IncomeTax(i) => to_query(&TaxQuery::from(i))?,
        CalculatorInput::Bmi(i) => to_query(&BmiQuery::from(i))?,
        CalculatorInput::CreditUtilization(i) => to_query(&CreditQuery::try_from(i)?)?,
        CalculatorInput::TypingSpeed(i) => to_query(&TypingQuery::from(i))?,
        CalculatorInput::InvestmentReturn(i) => to_query(&InvestQuery::try_from(i)?)?,
    };
    Ok(format!("{}?{}", input.kind().as_str(), query))
}

/// Parses a link produced by [`encode`].
///
/// Anything before the last `/` is ignored, so full URLs ending in the link
/// are accepted.
pub fn decode(link: &str) -> Result<CalculatorInput, ShareError> {
    let link = link.rsplit('/').next().unwrap_or(link);
    let (mode, query) = link.split_once('?').ok_or(ShareError::MissingQuery)?;
    let kind = CalculatorKind::parse(mode).ok_or_else(|| ShareError::UnknownMode(mode.to_string()))?;

    let input = match kind {
        CalculatorKind::Mortgage => CalculatorInput::Mortgage(from_query::<MortgageQuery>(query)?.try_into()?),
        CalculatorKind::ExtraPayment => CalculatorInput::ExtraPayment(from_query::<ExtraQuery>(query)?.into()),
        CalculatorKind::Biweekly => CalculatorInput::Biweekly(from_query::<BiweeklyQuery>(query)?.into()),
        CalculatorKind::IncomeTax => CalculatorInput::IncomeTax(from_query::<TaxQuery>(query)?.try_into()?),
        CalculatorKind::Bmi => CalculatorInput::Bmi(from_query::<BmiQuery>(query)?.try_into()?),
        CalculatorKind::CreditUtilization => {
            CalculatorInput::CreditUtilization(from_query::<CreditQuery>(query)?.try_into()?)
        }
        CalculatorKind::TypingSpeed => CalculatorInput::TypingSpeed(from_query::<TypingQuery>(query)?.into()),
        CalculatorKind::InvestmentReturn => {
            CalculatorInput::InvestmentReturn(from_query::<InvestQuery>(query)?.into())
        }
    };
    Ok(input)
}

fn to_query<T: Serialize>(query: &T) -> Result<String, ShareError> {
    serde_urlencoded::to_string(query).map_err(|e| ShareError::Encode(e.to_string()))
}

fn from_query<T: DeserializeOwned>(query: &str) -> Result<T, ShareError> {
    serde_urlencoded::from_str(query).map_err(|e| ShareError::Decode(e.to_string()))
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

fn split_decimals(
    key: &'static str,
    list: &str,
) -> Result<Vec<Decimal>, ShareError> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|v| {
            v.trim().parse::<Decimal>().map_err(|e| ShareError::InvalidValue {
                key,
                reason: e.to_string(),
            })
        })
        .collect()
}

// ── mortgage ─────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct MortgageQuery {
    hp: Decimal,
    dp: Decimal,
    /// `a` for an amount, `p` for a percentage.
    dt: String,
    r: Decimal,
    t: u32,
    tax: Decimal,
    ins: Decimal,
    pmi: Decimal,
    hoa: Decimal,
    sd: NaiveDate,
    v: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inc: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    debt: Option<Decimal>,
}

impl From<&MortgageInput> for MortgageQuery {
    fn from(i: &MortgageInput) -> Self {
        let (dp, dt) = match i.down_payment {
            DownPayment::Amount(v) => (v, "a"),
            DownPayment::Percent(v) => (v, "p"),
        };
        Self {
            hp: i.home_price,
            dp,
            dt: dt.to_string(),
            r: i.annual_rate_percent,
            t: i.term_years,
            tax: i.annual_property_tax,
            ins: i.annual_insurance,
            pmi: i.pmi_rate_percent,
            hoa: i.monthly_hoa,
            sd: i.start_date,
            v: i.schedule_mode.as_str().to_string(),
            inc: i.affordability.as_ref().map(|a| a.gross_monthly_income),
            debt: i.affordability.as_ref().map(|a| a.other_monthly_debts),
        }
    }
}

impl TryFrom<MortgageQuery> for MortgageInput {
    type Error = ShareError;

    fn try_from(q: MortgageQuery) -> Result<Self, Self::Error> {
        let down_payment = match q.dt.as_str() {
            "a" => DownPayment::Amount(q.dp),
            "p" => DownPayment::Percent(q.dp),
            other => {
                return Err(ShareError::InvalidValue {
                    key: "dt",
                    reason: format!("expected 'a' or 'p', got '{other}'"),
                });
            }
        };
        let schedule_mode = ScheduleMode::parse(&q.v).ok_or_else(|| ShareError::InvalidValue {
            key: "v",
            reason: format!("unknown schedule view '{}'", q.v),
        })?;
        let affordability = q.inc.map(|income| AffordabilityInput {
            gross_monthly_income: income,
            other_monthly_debts: q.debt.unwrap_or(Decimal::ZERO),
        });

        Ok(Self {
            home_price: q.hp,
            down_payment,
            annual_rate_percent: q.r,
            term_years: q.t,
            annual_property_tax: q.tax,
            annual_insurance: q.ins,
            pmi_rate_percent: q.pmi,
            monthly_hoa: q.hoa,
            start_date: q.sd,
            schedule_mode,
            affordability,
        })
    }
}

// ── payoff ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct ExtraQuery {
    p: Decimal,
    r: Decimal,
    n: u32,
    me: Decimal,
    ye: Decimal,
    ot: Decimal,
    op: u32,
    sd: NaiveDate,
}

impl From<&ExtraPaymentInput> for ExtraQuery {
    fn from(i: &ExtraPaymentInput) -> Self {
        Self {
            p: i.terms.principal,
            r: i.terms.annual_rate_percent,
            n: i.terms.term_months,
            me: i.plan.monthly_extra,
            ye: i.plan.yearly_extra,
            ot: i.plan.one_time_amount,
            op: i.plan.one_time_at_period,
            sd: i.start_date,
        }
    }
}

impl From<ExtraQuery> for ExtraPaymentInput {
    fn from(q: ExtraQuery) -> Self {
        Self {
            terms: LoanTerms::new(q.p, q.r, q.n),
            plan: ExtraPaymentPlan {
                monthly_extra: q.me,
                yearly_extra: q.ye,
                one_time_amount: q.ot,
                one_time_at_period: q.op,
            },
            start_date: q.sd,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BiweeklyQuery {
    p: Decimal,
    r: Decimal,
    n: u32,
    sd: NaiveDate,
}

impl From<&BiweeklyInput> for BiweeklyQuery {
    fn from(i: &BiweeklyInput) -> Self {
        Self {
            p: i.terms.principal,
            r: i.terms.annual_rate_percent,
            n: i.terms.term_months,
            sd: i.start_date,
        }
    }
}

impl From<BiweeklyQuery> for BiweeklyInput {
    fn from(q: BiweeklyQuery) -> Self {
        Self {
            terms: LoanTerms::new(q.p, q.r, q.n),
            start_date: q.sd,
        }
    }
}

// ── income tax ───────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct TaxQuery {
    y: i32,
    fs: String,
    w: Decimal,
    oi: Decimal,
    rp: Decimal,
    ira: Decimal,
    hsa: Decimal,
    sli: Decimal,
    id: Decimal,
    cr: Decimal,
    wh: Decimal,
}

impl From<&IncomeTaxInput> for TaxQuery {
    fn from(i: &IncomeTaxInput) -> Self {
        Self {
            y: i.tax_year,
            fs: i.filing_status.as_str().to_string(),
            w: i.wages,
            oi: i.other_income,
            rp: i.adjustments.retirement_plan,
            ira: i.adjustments.ira,
            hsa: i.adjustments.hsa,
            sli: i.adjustments.student_loan_interest,
            id: i.itemized_deductions,
            cr: i.credits,
            wh: i.withholding,
        }
    }
}

impl TryFrom<TaxQuery> for IncomeTaxInput {
    type Error = ShareError;

    fn try_from(q: TaxQuery) -> Result<Self, Self::Error> {
        let filing_status =
            FilingStatusCode::parse(&q.fs).ok_or_else(|| ShareError::InvalidValue {
                key: "fs",
                reason: format!("unknown filing status '{}'", q.fs),
            })?;
        Ok(Self {
            tax_year: q.y,
            filing_status,
            wages: q.w,
            other_income: q.oi,
            adjustments: AboveTheLineDeductions {
                retirement_plan: q.rp,
                ira: q.ira,
                hsa: q.hsa,
                student_loan_interest: q.sli,
            },
            itemized_deductions: q.id,
            credits: q.cr,
            withholding: q.wh,
        })
    }
}

// ── bmi ──────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct BmiQuery {
    u: String,
    w: Decimal,
    h: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
}

impl From<&BmiInput> for BmiQuery {
    fn from(i: &BmiInput) -> Self {
        let (u, w, h) = match i.measurements {
            BodyMeasurements::Metric {
                weight_kg,
                height_cm,
            } => ("metric", weight_kg, height_cm),
            BodyMeasurements::Imperial {
                weight_lb,
                height_in,
            } => ("imperial", weight_lb, height_in),
        };
        Self {
            u: u.to_string(),
            w,
            h,
            age: i.age,
        }
    }
}

impl TryFrom<BmiQuery> for BmiInput {
    type Error = ShareError;

    fn try_from(q: BmiQuery) -> Result<Self, Self::Error> {
        let measurements = match q.u.as_str() {
            "metric" => BodyMeasurements::Metric {
                weight_kg: q.w,
                height_cm: q.h,
            },
            "imperial" => BodyMeasurements::Imperial {
                weight_lb: q.w,
                height_in: q.h,
            },
            other => {
                return Err(ShareError::InvalidValue {
                    key: "u",
                    reason: format!("unknown units '{other}'"),
                });
            }
        };
        Ok(Self {
            measurements,
            age: q.age,
        })
    }
}

// ── credit utilization ───────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct CreditQuery {
    n: String,
    b: String,
    l: String,
    t: Decimal,
}

impl TryFrom<&CreditUtilizationInput> for CreditQuery {
    type Error = ShareError;

    fn try_from(i: &CreditUtilizationInput) -> Result<Self, Self::Error> {
        if i.accounts.iter().any(|a| a.name.contains(',')) {
            return Err(ShareError::Unsupported("account names containing commas"));
        }
        Ok(Self {
            n: join(i.accounts.iter().map(|a| a.name.as_str())),
            b: join(i.accounts.iter().map(|a| a.balance)),
            l: join(i.accounts.iter().map(|a| a.limit)),
            t: i.target_percent,
        })
    }
}

impl TryFrom<CreditQuery> for CreditUtilizationInput {
    type Error = ShareError;

    fn try_from(q: CreditQuery) -> Result<Self, Self::Error> {
        let balances = split_decimals("b", &q.b)?;
        let limits = split_decimals("l", &q.l)?;
        let names: Vec<&str> = if q.n.is_empty() {
            Vec::new()
        } else {
            q.n.split(',').collect()
        };
        if limits.len() != balances.len() || names.len() != balances.len() {
            return Err(ShareError::InvalidValue {
                key: "b",
                reason: format!(
                    "{} names, {} balances and {} limits do not line up",
                    names.len(),
                    balances.len(),
                    limits.len()
                ),
            });
        }

        let accounts = names
            .into_iter()
            .zip(balances.into_iter().zip(limits))
            .map(|(name, (balance, limit))| CreditAccount {
                name: name.to_string(),
                balance,
                limit,
            })
            .collect();
        Ok(Self {
            accounts,
            target_percent: q.t,
        })
    }
}

// ── typing speed ─────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct TypingQuery {
    c: u32,
    e: u32,
    s: Decimal,
}

impl From<&TypingSpeedInput> for TypingQuery {
    fn from(i: &TypingSpeedInput) -> Self {
        Self {
            c: i.characters_typed,
            e: i.errors,
            s: i.duration_seconds,
        }
    }
}

impl From<TypingQuery> for TypingSpeedInput {
    fn from(q: TypingQuery) -> Self {
        Self {
            characters_typed: q.c,
            errors: q.e,
            duration_seconds: q.s,
        }
    }
}

// ── investment return ────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct InvestQuery {
    iv: Decimal,
    fv: Decimal,
    sd: NaiveDate,
    ed: NaiveDate,
}

impl TryFrom<&InvestmentReturnInput> for InvestQuery {
    type Error = ShareError;

    fn try_from(i: &InvestmentReturnInput) -> Result<Self, Self::Error> {
        match i {
            InvestmentReturnInput::Cumulative {
                initial_value,
                final_value,
                start_date,
                end_date,
            } => Ok(Self {
                iv: *initial_value,
                fv: *final_value,
                sd: *start_date,
                ed: *end_date,
            }),
            InvestmentReturnInput::CashFlow { .. } => {
                Err(ShareError::Unsupported("cash-flow investment returns"))
            }
        }
    }
}

impl From<InvestQuery> for InvestmentReturnInput {
    fn from(q: InvestQuery) -> Self {
        Self::Cumulative {
            initial_value: q.iv,
            final_value: q.fv,
            start_date: q.sd,
            end_date: q.ed,
        }
    }
}
