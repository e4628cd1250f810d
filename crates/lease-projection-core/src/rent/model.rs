//! Rent expense under the three negotiated payment structures.
//!
//! Fixed escalation and partner investment rents step up once per
//! escalation band (`frequency` years) rather than annually. Revenue share
//! rent tracks the period's own revenue.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::decimal::{grow, is_valid_growth};
use crate::error::LeaseProjectionError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Serialized tag of every supported rent model.
pub const RENT_MODEL_NAMES: [&str; 3] = ["FixedEscalation", "RevenueShare", "PartnerInvestment"];

// ---------------------------------------------------------------------------
// Rent model
// ---------------------------------------------------------------------------

/// Negotiated rent structure. Adding a variant forces every match below to
/// handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum RentModel {
    FixedEscalation {
        /// Annual rent in the first dynamic year
        base_rent: Money,
        /// Step-up applied at each band boundary (may be negative)
        growth_rate: Rate,
        /// Years per escalation band
        frequency: u32,
    },
    RevenueShare {
        /// Share of period revenue, 0 to 1 inclusive
        percent: Rate,
    },
    PartnerInvestment {
        /// Land area in square metres
        land_size: Decimal,
        land_price_per_sqm: Money,
        /// Built-up area in square metres
        bua_size: Decimal,
        construction_cost_per_sqm: Money,
        /// Annual yield the partner earns on land plus construction
        yield_rate: Rate,
        growth_rate: Rate,
        frequency: u32,
    },
}

impl RentModel {
    pub fn name(&self) -> &'static str {
        match self {
            RentModel::FixedEscalation { .. } => RENT_MODEL_NAMES[0],
            RentModel::RevenueShare { .. } => RENT_MODEL_NAMES[1],
            RentModel::PartnerInvestment { .. } => RENT_MODEL_NAMES[2],
        }
    }

    /// First-band rent, or `None` when rent is revenue-driven.
    pub fn base_rent(&self) -> Option<Money> {
        match self {
            RentModel::FixedEscalation { base_rent, .. } => Some(*base_rent),
            RentModel::RevenueShare { .. } => None,
            RentModel::PartnerInvestment {
                land_size,
                land_price_per_sqm,
                bua_size,
                construction_cost_per_sqm,
                yield_rate,
                ..
            } => Some(partner_investment_base_rent(
                *land_size,
                *land_price_per_sqm,
                *bua_size,
                *construction_cost_per_sqm,
                *yield_rate,
            )),
        }
    }

    pub fn growth_rate(&self) -> Option<Rate> {
        match self {
            RentModel::FixedEscalation { growth_rate, .. }
            | RentModel::PartnerInvestment { growth_rate, .. } => Some(*growth_rate),
            RentModel::RevenueShare { .. } => None,
        }
    }

    /// Copy of the model with its escalation rate replaced. Revenue share has
    /// no escalation and is returned unchanged.
    pub fn with_growth_rate(&self, rate: Rate) -> RentModel {
        let mut model = self.clone();
        match &mut model {
            RentModel::FixedEscalation { growth_rate, .. }
            | RentModel::PartnerInvestment { growth_rate, .. } => *growth_rate = rate,
            RentModel::RevenueShare { .. } => {}
        }
        model
    }

    pub fn validate(&self) -> LeaseProjectionResult<()> {
        match self {
            RentModel::FixedEscalation {
                base_rent,
                growth_rate,
                frequency,
            } => {
                validate_non_negative("rent_model.base_rent", *base_rent)?;
                validate_growth("rent_model.growth_rate", *growth_rate)?;
                validate_frequency(*frequency)
            }
            RentModel::RevenueShare { percent } => {
                if *percent < Decimal::ZERO || *percent > Decimal::ONE {
                    return Err(LeaseProjectionError::InvalidInput {
                        field: "rent_model.percent".into(),
                        reason: format!("Revenue share must be between 0 and 1, got {percent}"),
                    });
                }
                Ok(())
            }
            RentModel::PartnerInvestment {
                land_size,
                land_price_per_sqm,
                bua_size,
                construction_cost_per_sqm,
                yield_rate,
                growth_rate,
                frequency,
            } => {
                validate_non_negative("rent_model.land_size", *land_size)?;
                validate_non_negative("rent_model.land_price_per_sqm", *land_price_per_sqm)?;
                validate_non_negative("rent_model.bua_size", *bua_size)?;
                validate_non_negative(
                    "rent_model.construction_cost_per_sqm",
                    *construction_cost_per_sqm,
                )?;
                validate_non_negative("rent_model.yield_rate", *yield_rate)?;
                validate_growth("rent_model.growth_rate", *growth_rate)?;
                validate_frequency(*frequency)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Rent expense for the zero-based `period_index` of the dynamic window.
///
/// `trailing_revenue` is only read by revenue share; periods are annual so it
/// is the period's own revenue.
pub fn resolve_rent(
    model: &RentModel,
    period_index: u32,
    trailing_revenue: Money,
) -> LeaseProjectionResult<Money> {
    match model {
        RentModel::FixedEscalation {
            base_rent,
            growth_rate,
            frequency,
        } => escalate(*base_rent, *growth_rate, *frequency, period_index),
        RentModel::RevenueShare { percent } => Ok(trailing_revenue * *percent),
        RentModel::PartnerInvestment {
            land_size,
            land_price_per_sqm,
            bua_size,
            construction_cost_per_sqm,
            yield_rate,
            growth_rate,
            frequency,
        } => {
            let base = partner_investment_base_rent(
                *land_size,
                *land_price_per_sqm,
                *bua_size,
                *construction_cost_per_sqm,
                *yield_rate,
            );
            escalate(base, *growth_rate, *frequency, period_index)
        }
    }
}

/// `yield × (land × land price + BUA × construction cost)`.
pub fn partner_investment_base_rent(
    land_size: Decimal,
    land_price_per_sqm: Money,
    bua_size: Decimal,
    construction_cost_per_sqm: Money,
    yield_rate: Rate,
) -> Money {
    let investment = land_size * land_price_per_sqm + bua_size * construction_cost_per_sqm;
    investment * yield_rate
}

/// Zero-based escalation band for a period.
pub fn escalation_band(period_index: u32, frequency: u32) -> LeaseProjectionResult<u32> {
    validate_frequency(frequency)?;
    Ok(period_index / frequency)
}

fn escalate(base: Money, growth: Rate, frequency: u32, period_index: u32) -> LeaseProjectionResult<Money> {
    let band = escalation_band(period_index, frequency)?;
    grow(base, growth, band, "rent_model.growth_rate")
}

// ---------------------------------------------------------------------------
// Rent schedule
// ---------------------------------------------------------------------------

/// Input for a stand-alone rent schedule over the dynamic window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentScheduleInput {
    pub rent_model: RentModel,
    /// Number of dynamic years
    pub years: u32,
    /// First calendar year of the dynamic window
    pub start_year: i32,
    /// Revenue per year (required for revenue share)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenues: Option<Vec<Money>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentScheduleRow {
    pub year: i32,
    pub period_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_band: Option<u32>,
    pub rent: Money,
    pub cumulative_rent: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentScheduleOutput {
    pub model: String,
    pub rows: Vec<RentScheduleRow>,
    pub total_rent: Money,
    pub average_rent: Money,
}

pub fn rent_schedule(
    input: &RentScheduleInput,
) -> LeaseProjectionResult<ComputationOutput<RentScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.rent_model.validate()?;
    if input.years == 0 {
        return Err(LeaseProjectionError::InvalidInput {
            field: "years".into(),
            reason: "Must project at least one year".into(),
        });
    }

    let revenues = match (&input.rent_model, &input.revenues) {
        (RentModel::RevenueShare { .. }, None) => {
            return Err(LeaseProjectionError::InvalidInput {
                field: "revenues".into(),
                reason: "Revenue share schedules require one revenue per year".into(),
            })
        }
        (_, Some(revs)) if revs.len() != input.years as usize => {
            return Err(LeaseProjectionError::InvalidInput {
                field: "revenues".into(),
                reason: format!("Expected {} revenues, got {}", input.years, revs.len()),
            })
        }
        (_, revs) => revs.clone().unwrap_or_default(),
    };

    if input.rent_model.growth_rate().is_some_and(|g| g < Decimal::ZERO) {
        warnings.push("Negative escalation: rent declines at each band boundary".into());
    }

    let mut rows = Vec::with_capacity(input.years as usize);
    let mut cumulative = Decimal::ZERO;
    for idx in 0..input.years {
        let revenue = revenues.get(idx as usize).copied().unwrap_or(Decimal::ZERO);
        let rent = resolve_rent(&input.rent_model, idx, revenue)?;
        cumulative = cumulative
            .checked_add(rent)
            .ok_or_else(|| LeaseProjectionError::InvalidInput {
                field: "years".into(),
                reason: format!("Cumulative rent exceeds the decimal range by year {idx}"),
            })?;
        let band = match &input.rent_model {
            RentModel::FixedEscalation { frequency, .. }
            | RentModel::PartnerInvestment { frequency, .. } => {
                Some(escalation_band(idx, *frequency)?)
            }
            RentModel::RevenueShare { .. } => None,
        };
        rows.push(RentScheduleRow {
            year: input.start_year + idx as i32,
            period_index: idx,
            escalation_band: band,
            rent,
            cumulative_rent: cumulative,
        });
    }

    let output = RentScheduleOutput {
        model: input.rent_model.name().to_string(),
        average_rent: cumulative / Decimal::from(input.years),
        total_rent: cumulative,
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Banded Rent Escalation Schedule",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_frequency(frequency: u32) -> LeaseProjectionResult<()> {
    if frequency == 0 {
        return Err(LeaseProjectionError::InvalidInput {
            field: "rent_model.frequency".into(),
            reason: "Escalation frequency must be at least one year".into(),
        });
    }
    Ok(())
}

fn validate_growth(field: &str, growth: Rate) -> LeaseProjectionResult<()> {
    if !is_valid_growth(growth) {
        return Err(LeaseProjectionError::InvalidInput {
            field: field.into(),
            reason: format!("Growth must be greater than -100% and at most 100%, got {growth}"),
        });
    }
    Ok(())
}

fn validate_non_negative(field: &str, value: Decimal) -> LeaseProjectionResult<()> {
    if value < Decimal::ZERO {
        return Err(LeaseProjectionError::InvalidInput {
            field: field.into(),
            reason: format!("Value must be non-negative, got {value}"),
        });
    }
    Ok(())
}
