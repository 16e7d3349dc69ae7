//! Words per minute.
//!
//! A "word" is five characters. Net speed subtracts one word per uncorrected
//! error per minute.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::{ONE_HUNDRED, max, round_dp, round_half_up};

const CHARS_PER_WORD: Decimal = dec!(5);
const SECONDS_PER_MINUTE: Decimal = dec!(60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypingSpeedError {
    #[error("duration must be positive, got {0} seconds")]
    InvalidDuration(Decimal),

    #[error("errors ({errors}) exceed characters typed ({characters})")]
    TooManyErrors { errors: u32, characters: u32 },

    #[error("computation did not produce a finite result ({0})")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSpeedInput {
    pub characters_typed: u32,
    pub errors: u32,
    pub duration_seconds: Decimal,
}

impl TypingSpeedInput {
    /// Builds an input by comparing `typed` against `reference`.
    pub fn from_texts(
        reference: &str,
        typed: &str,
        duration_seconds: Decimal,
    ) -> Self {
        Self {
            characters_typed: typed.chars().count() as u32,
            errors: count_errors(reference, typed),
            duration_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSpeedResult {
    pub gross_wpm: Decimal,
    pub net_wpm: Decimal,
    pub accuracy_percent: Decimal,
    pub characters_typed: u32,
    pub errors: u32,
}

/// Counts typed characters that differ from the reference at the same
/// position. Characters typed past the end of the reference all count.
pub fn count_errors(
    reference: &str,
    typed: &str,
) -> u32 {
    let mut expected = reference.chars();
    typed
        .chars()
        .filter(|c| expected.next() != Some(*c))
        .count() as u32
}

pub struct TypingSpeedCalculator;

impl TypingSpeedCalculator {
    pub fn calculate(input: &TypingSpeedInput) -> Result<TypingSpeedResult, TypingSpeedError> {
        if input.duration_seconds <= Decimal::ZERO {
            return Err(TypingSpeedError::InvalidDuration(input.duration_seconds));
        }
        if input.errors > input.characters_typed {
            return Err(TypingSpeedError::TooManyErrors {
                errors: input.errors,
                characters: input.characters_typed,
            });
        }

        let minutes = input.duration_seconds / SECONDS_PER_MINUTE;
        let characters = Decimal::from(input.characters_typed);
        let errors = Decimal::from(input.errors);

        // A duration too short for the decimal scale rounds to zero minutes.
        let gross = (characters / CHARS_PER_WORD)
            .checked_div(minutes)
            .ok_or(TypingSpeedError::NonFinite("gross speed"))?;
        let error_rate = errors
            .checked_div(minutes)
            .ok_or(TypingSpeedError::NonFinite("error rate"))?;
        let net = max(gross - error_rate, Decimal::ZERO);
        let accuracy = if input.characters_typed == 0 {
            ONE_HUNDRED
        } else {
            (characters - errors) * ONE_HUNDRED / characters
        };

        Ok(TypingSpeedResult {
            gross_wpm: round_dp(gross, 1),
            net_wpm: round_dp(net, 1),
            accuracy_percent: round_half_up(accuracy),
            characters_typed: input.characters_typed,
            errors: input.errors,
        })
    }
}
