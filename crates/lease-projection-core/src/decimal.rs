//! Exact decimal helpers shared by every calculator.
//!
//! Nothing in the engine touches floating point. Growth is compounded by
//! repeated checked multiplication rather than `powd()` so that escalation
//! bands produce the same digits on every platform, and a runaway rate
//! surfaces as an input error instead of a panic.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::LeaseProjectionError;
use crate::types::{Money, Rate};
use crate::LeaseProjectionResult;

/// Largest accepted annual growth for any escalating driver (100%).
pub const MAX_ANNUAL_GROWTH: Rate = dec!(1);

pub fn safe_divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// `(1 + rate)^periods` by repeated multiplication, `None` on overflow.
pub fn compound(rate: Rate, periods: u32) -> Option<Decimal> {
    let factor = Decimal::ONE + rate;
    (0..periods).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(factor))
}

/// `base × (1 + rate)^periods`. Overflow is reported against `field`.
pub fn grow(base: Money, rate: Rate, periods: u32, field: &str) -> LeaseProjectionResult<Money> {
    compound(rate, periods)
        .and_then(|factor| base.checked_mul(factor))
        .ok_or_else(|| LeaseProjectionError::InvalidInput {
            field: field.into(),
            reason: format!("Growth of {rate} over {periods} periods exceeds the decimal range"),
        })
}

/// Above -100% and at most [`MAX_ANNUAL_GROWTH`].
pub fn is_valid_growth(rate: Rate) -> bool {
    rate > -Decimal::ONE && rate <= MAX_ANNUAL_GROWTH
}

/// Absolute-difference comparison; amounts range from zero to hundreds of
/// millions so a relative tolerance would be meaningless near zero.
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

pub fn clamp_non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Whole units (e.g. enrolled students), rounded toward zero.
pub fn floor_units(value: Decimal) -> Decimal {
    value.trunc()
}

/// Two decimal places, midpoint away from zero. Display aggregates only;
/// ledger values are never rounded.
pub fn round_money(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
