use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculations::{CalculatorInput, CalculatorResult};

/// Discriminant naming each calculator widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculatorKind {
    Mortgage,
    ExtraPayment,
    Biweekly,
    IncomeTax,
    Bmi,
    CreditUtilization,
    TypingSpeed,
    InvestmentReturn,
}

impl CalculatorKind {
    pub const ALL: [CalculatorKind; 8] = [
        Self::Mortgage,
        Self::ExtraPayment,
        Self::Biweekly,
        Self::IncomeTax,
        Self::Bmi,
        Self::CreditUtilization,
        Self::TypingSpeed,
        Self::InvestmentReturn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mortgage => "mortgage",
            Self::ExtraPayment => "extra_payment",
            Self::Biweekly => "biweekly",
            Self::IncomeTax => "income_tax",
            Self::Bmi => "bmi",
            Self::CreditUtilization => "credit_utilization",
            Self::TypingSpeed => "typing_speed",
            Self::InvestmentReturn => "investment_return",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

/// A named snapshot of one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedScenario {
    pub id: i64,
    pub name: String,
    pub kind: CalculatorKind,
    pub input: CalculatorInput,
    pub result: CalculatorResult,
    pub saved_at: DateTime<Utc>,
}

/// For saving new scenarios (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSavedScenario {
    pub name: String,
    pub input: CalculatorInput,
    pub result: CalculatorResult,
}

impl NewSavedScenario {
    pub fn kind(&self) -> CalculatorKind {
        self.input.kind()
    }
}
