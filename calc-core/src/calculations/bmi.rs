//! Body mass index.
//!
//! ```text
//! metric:   bmi = kg / m²
//! imperial: bmi = 703 × lb / in²
//! ```

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{ONE_HUNDRED, round_dp, round_half_up};

const IMPERIAL_FACTOR: Decimal = dec!(703);
const HEALTHY_MIN: Decimal = dec!(18.5);
const HEALTHY_MAX: Decimal = dec!(24.9);
/// Adult BMI categories do not apply below this age.
pub const MINIMUM_AGE: u32 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BmiError {
    #[error("weight must be positive, got {0}")]
    InvalidWeight(Decimal),

    #[error("height must be positive, got {0}")]
    InvalidHeight(Decimal),

    /// Adult categories are not meaningful for children.
    #[error("age must be at least 18, got {0}")]
    TooYoung(u32),

    #[error("computation did not produce a finite result ({0})")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "units", rename_all = "snake_case")]
pub enum BodyMeasurements {
    Metric { weight_kg: Decimal, height_cm: Decimal },
    Imperial { weight_lb: Decimal, height_in: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BmiInput {
    pub measurements: BodyMeasurements,
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    NormalWeight,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: Decimal) -> Self {
        if bmi < dec!(18.5) {
            Self::Underweight
        } else if bmi < dec!(25) {
            Self::NormalWeight
        } else if bmi < dec!(30) {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::NormalWeight => "Normal Weight",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Kilograms,
    Pounds,
}

impl WeightUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Kilograms => "kg",
            Self::Pounds => "lb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BmiResult {
    pub bmi: Decimal,
    pub category: BmiCategory,
    /// Weight range for a BMI of 18.5 to 24.9 at this height.
    pub healthy_weight_min: Decimal,
    pub healthy_weight_max: Decimal,
    pub weight_unit: WeightUnit,
}

pub struct BmiCalculator;

impl BmiCalculator {
    /// # Errors
    ///
    /// Returns [`BmiError`] for a non-positive weight or height, an age under
    /// 18, or measurements whose ratio leaves the decimal range.
    pub fn calculate(input: &BmiInput) -> Result<BmiResult, BmiError> {
        if let Some(age) = input.age.filter(|age| *age < MINIMUM_AGE) {
            warn!(age, "BMI requested for a minor");
            return Err(BmiError::TooYoung(age));
        }

        let (weight, height, unit) = match &input.measurements {
            BodyMeasurements::Metric {
                weight_kg,
                height_cm,
            } => (*weight_kg, *height_cm / ONE_HUNDRED, WeightUnit::Kilograms),
            BodyMeasurements::Imperial {
                weight_lb,
                height_in,
            } => (*weight_lb, *height_in, WeightUnit::Pounds),
        };
        if weight <= Decimal::ZERO {
            return Err(BmiError::InvalidWeight(weight));
        }
        if height <= Decimal::ZERO {
            return Err(BmiError::InvalidHeight(height));
        }

        let height_sq = height
            .checked_mul(height)
            .ok_or(BmiError::NonFinite("height squared"))?;
        let factor = match unit {
            WeightUnit::Kilograms => Decimal::ONE,
            WeightUnit::Pounds => IMPERIAL_FACTOR,
        };
        let bmi = factor
            .checked_mul(weight)
            .and_then(|v| v.checked_div(height_sq))
            .map(round_half_up)
            .ok_or(BmiError::NonFinite("bmi"))?;
        let healthy = |limit: Decimal| {
            limit
                .checked_mul(height_sq)
                .map(|v| round_dp(v / factor, 1))
                .ok_or(BmiError::NonFinite("healthy weight"))
        };

        Ok(BmiResult {
            bmi,
            category: BmiCategory::from_bmi(bmi),
            healthy_weight_min: healthy(HEALTHY_MIN)?,
            healthy_weight_max: healthy(HEALTHY_MAX)?,
            weight_unit: unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn metric(
        weight_kg: Decimal,
        height_cm: Decimal,
    ) -> BmiInput {
        BmiInput {
            measurements: BodyMeasurements::Metric {
                weight_kg,
                height_cm,
            },
            age: None,
        }
    }

    #[test]
    fn metric_normal_weight() {
        let result = BmiCalculator::calculate(&metric(dec!(70), dec!(170))).unwrap();

        // 70 / 1.7²
        assert_eq!(result.bmi, dec!(24.22));
        assert_eq!(result.category, BmiCategory::NormalWeight);
        assert_eq!(result.category.to_string(), "Normal Weight");
    }

    #[test]
    fn metric_healthy_range() {
        let result = BmiCalculator::calculate(&metric(dec!(70), dec!(170))).unwrap();

        // 18.5 × 2.89 and 24.9 × 2.89
        assert_eq!(result.healthy_weight_min, dec!(53.5));
        assert_eq!(result.healthy_weight_max, dec!(72.0));
        assert_eq!(result.weight_unit, WeightUnit::Kilograms);
    }

    #[test]
    fn imperial_uses_703_factor() {
        let input = BmiInput {
            measurements: BodyMeasurements::Imperial {
                weight_lb: dec!(180),
                height_in: dec!(70),
            },
            age: Some(40),
        };

        let result = BmiCalculator::calculate(&input).unwrap();

        // 703 × 180 / 4900 = 25.824...
        assert_eq!(result.bmi, dec!(25.82));
        assert_eq!(result.category, BmiCategory::Overweight);
        assert_eq!(result.weight_unit, WeightUnit::Pounds);
    }

    #[test]
    fn category_thresholds() {
        assert_eq!(BmiCategory::from_bmi(dec!(18.49)), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(dec!(18.5)), BmiCategory::NormalWeight);
        assert_eq!(BmiCategory::from_bmi(dec!(24.99)), BmiCategory::NormalWeight);
        assert_eq!(BmiCategory::from_bmi(dec!(25)), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(dec!(30)), BmiCategory::Obese);
    }

    #[test]
    fn minor_is_rejected() {
        let mut input = metric(dec!(50), dec!(160));
        input.age = Some(17);

        assert_eq!(BmiCalculator::calculate(&input), Err(BmiError::TooYoung(17)));
    }

    #[test]
    fn adult_age_is_accepted() {
        let mut input = metric(dec!(50), dec!(160));
        input.age = Some(18);

        assert!(BmiCalculator::calculate(&input).is_ok());
    }

    #[test]
    fn zero_weight_is_rejected() {
        assert_eq!(
            BmiCalculator::calculate(&metric(Decimal::ZERO, dec!(170))),
            Err(BmiError::InvalidWeight(Decimal::ZERO))
        );
    }

    #[test]
    fn zero_height_is_rejected() {
        assert_eq!(
            BmiCalculator::calculate(&metric(dec!(70), Decimal::ZERO)),
            Err(BmiError::InvalidHeight(Decimal::ZERO))
        );
    }

    #[test]
    fn extreme_measurements_are_rejected() {
        assert_eq!(
            BmiCalculator::calculate(&metric(Decimal::MAX, dec!(0.0000000001))),
            Err(BmiError::NonFinite("bmi"))
        );
        assert_eq!(
            BmiCalculator::calculate(&metric(dec!(70), Decimal::MAX)),
            Err(BmiError::NonFinite("height squared"))
        );
    }
}
