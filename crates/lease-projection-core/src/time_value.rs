use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::LeaseProjectionError;
use crate::types::{Money, Rate};
use crate::LeaseProjectionResult;

/// Net Present Value of a series of cash flows; the first flow is at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> LeaseProjectionResult<Money> {
    validate_discount_rate(rate)?;

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV of annual flows paid at the end of each year (first flow at t = 1).
pub fn npv_end_of_period(rate: Rate, cash_flows: &[Money]) -> LeaseProjectionResult<Money> {
    let mut shifted = Vec::with_capacity(cash_flows.len() + 1);
    shifted.push(Decimal::ZERO);
    shifted.extend_from_slice(cash_flows);
    npv(rate, &shifted)
}

fn validate_discount_rate(rate: Rate) -> LeaseProjectionResult<()> {
    if rate <= dec!(-1) {
        return Err(LeaseProjectionError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    Ok(())
}
