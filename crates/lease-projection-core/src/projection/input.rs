//! The complete, already type-checked input to one engine invocation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::capex::depreciation::CapexConfig;
use crate::config::{
    validate_non_negative, validate_unit_rate, CircularSolverConfig, SystemConfig,
    ValidationConfig,
};
use crate::decimal::{grow, MAX_ANNUAL_GROWTH};
use crate::error::LeaseProjectionError;
use crate::rent::model::{RentModel, RENT_MODEL_NAMES};
use crate::revenue::enrollment::{validate_curriculum, CurriculumTrack};
use crate::revenue::transition::{validate_transition_period, TransitionDefaults, TransitionPeriod};
use crate::types::{Money, Rate};
use crate::working_capital::balances::{BaselineYear, WorkingCapitalRatios};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Historical actuals
// ---------------------------------------------------------------------------

/// Reported P&L lines of an actual year. Totals are derived, never input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalProfitLoss {
    pub tuition_revenue: Money,
    #[serde(default)]
    pub other_revenue: Money,
    pub rent_expense: Money,
    pub staff_costs: Money,
    pub other_operating_expenses: Money,
    pub depreciation: Money,
    #[serde(default)]
    pub interest_expense: Money,
    #[serde(default)]
    pub interest_income: Money,
    #[serde(default)]
    pub zakat: Money,
}

/// Reported closing balances of an actual year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBalanceSheet {
    pub cash: Money,
    pub accounts_receivable: Money,
    #[serde(default)]
    pub prepaid_expenses: Money,
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    pub accounts_payable: Money,
    #[serde(default)]
    pub accrued_expenses: Money,
    #[serde(default)]
    pub deferred_revenue: Money,
    pub debt: Money,
    pub share_capital: Money,
    pub retained_earnings: Money,
}

/// A closed fiscal year. Never recomputed; seeds the transition window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPeriod {
    pub year: i32,
    #[serde(default = "default_immutable")]
    pub immutable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_tuition: Option<Money>,
    pub profit_loss: HistoricalProfitLoss,
    pub balance_sheet: HistoricalBalanceSheet,
}

fn default_immutable() -> bool {
    true
}

impl HistoricalPeriod {
    /// Revenue, costs and balances in the shape ratio derivation expects.
    pub fn baseline_year(&self) -> BaselineYear {
        let pl = &self.profit_loss;
        let bs = &self.balance_sheet;
        BaselineYear {
            year: self.year,
            tuition_revenue: pl.tuition_revenue,
            other_revenue: pl.other_revenue,
            operating_expenses: pl.rent_expense + pl.staff_costs + pl.other_operating_expenses,
            accounts_receivable: bs.accounts_receivable,
            prepaid_expenses: bs.prepaid_expenses,
            accounts_payable: bs.accounts_payable,
            accrued_expenses: bs.accrued_expenses,
            deferred_revenue: bs.deferred_revenue,
        }
    }
}

// ---------------------------------------------------------------------------
// Dynamic window
// ---------------------------------------------------------------------------

/// Staff costs: a fixed base plus a per-student component, indexed to CPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffCostConfig {
    pub base_annual_cost: Money,
    pub cost_per_student: Money,
    pub cpi_rate: Rate,
}

impl StaffCostConfig {
    pub fn cost(&self, students: Decimal, period_index: u32) -> LeaseProjectionResult<Money> {
        grow(
            self.base_annual_cost + self.cost_per_student * students,
            self.cpi_rate,
            period_index,
            "dynamic.staff.cpi_rate",
        )
    }
}

/// Parameters that generate every year of the dynamic window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicPeriodConfig {
    /// Length of the dynamic window in years
    pub years: u32,
    /// Occupancy per year; defaults to a 20/40/60/80/100% ramp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_plan: Option<Vec<Rate>>,
    pub curriculum: Vec<CurriculumTrack>,
    pub staff: StaffCostConfig,
    /// Other cash operating expenses as % of revenue
    pub other_opex_ratio: Rate,
    pub rent_model: RentModel,
    #[serde(default)]
    pub capex: CapexConfig,
}

// ---------------------------------------------------------------------------
// Engine input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInput {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub solver: CircularSolverConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Locked ratios from the confirmed baseline year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_capital: Option<WorkingCapitalRatios>,
    #[serde(default)]
    pub transition_defaults: TransitionDefaults,
    pub historical: Vec<HistoricalPeriod>,
    #[serde(default)]
    pub transition: Vec<TransitionPeriod>,
    pub dynamic: DynamicPeriodConfig,
}

impl EngineInput {
    /// Working-capital ratios, or the configuration error for their absence.
    pub fn ratios(&self) -> LeaseProjectionResult<&WorkingCapitalRatios> {
        self.working_capital.as_ref().ok_or_else(|| {
            LeaseProjectionError::MissingBaseline(
                "working-capital ratios have not been established".into(),
            )
        })
    }

    pub fn last_historical_year(&self) -> Option<i32> {
        self.historical.last().map(|h| h.year)
    }

    /// First calendar year of the dynamic window.
    pub fn dynamic_start_year(&self) -> Option<i32> {
        self.transition
            .last()
            .map(|t| t.year)
            .or_else(|| self.last_historical_year())
            .map(|y| y + 1)
    }

    pub fn total_periods(&self) -> usize {
        self.historical.len() + self.transition.len() + self.dynamic.years as usize
    }

    pub fn validate(&self) -> LeaseProjectionResult<()> {
        self.system.validate()?;
        self.solver.validate()?;
        validate_non_negative("validation.tolerance", self.validation.tolerance)?;
        self.ratios()?.validate()?;

        if self.historical.is_empty() {
            return Err(LeaseProjectionError::MissingBaseline(
                "at least one historical year is required to seed opening balances".into(),
            ));
        }
        check_contiguous(
            "historical",
            self.historical.iter().map(|h| h.year),
            None,
        )?;
        check_contiguous(
            "transition",
            self.transition.iter().map(|t| t.year),
            self.last_historical_year(),
        )?;
        for period in &self.transition {
            validate_transition_period(period)?;
        }

        let dynamic = &self.dynamic;
        if dynamic.years == 0 {
            return Err(LeaseProjectionError::InvalidInput {
                field: "dynamic.years".into(),
                reason: "The dynamic window must cover at least one year".into(),
            });
        }
        validate_curriculum(
            &dynamic.curriculum,
            dynamic.ramp_plan.as_deref().unwrap_or_default(),
        )?;
        validate_non_negative("dynamic.staff.base_annual_cost", dynamic.staff.base_annual_cost)?;
        validate_non_negative("dynamic.staff.cost_per_student", dynamic.staff.cost_per_student)?;
        validate_non_negative("dynamic.staff.cpi_rate", dynamic.staff.cpi_rate)?;
        if dynamic.staff.cpi_rate > MAX_ANNUAL_GROWTH {
            return Err(LeaseProjectionError::InvalidInput {
                field: "dynamic.staff.cpi_rate".into(),
                reason: format!("CPI must be at most 100%, got {}", dynamic.staff.cpi_rate),
            });
        }
        validate_unit_rate("dynamic.other_opex_ratio", dynamic.other_opex_ratio)?;
        dynamic.rent_model.validate()?;
        dynamic.capex.validate()?;
        Ok(())
    }
}

/// Parse a JSON engine input, rejecting unknown rent models with a
/// configuration error rather than a generic deserialization failure.
pub fn parse_engine_input(json: &str) -> LeaseProjectionResult<EngineInput> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    engine_input_from_value(value)
}

pub fn engine_input_from_value(value: serde_json::Value) -> LeaseProjectionResult<EngineInput> {
    if let Some(rent_model) = value.pointer("/dynamic/rent_model") {
        match rent_model.get("model").and_then(|m| m.as_str()) {
            Some(name) if RENT_MODEL_NAMES.contains(&name) => {}
            Some(name) => return Err(LeaseProjectionError::UnknownRentModel(name.to_string())),
            None => return Err(LeaseProjectionError::UnknownRentModel(String::new())),
        }
    }
    Ok(serde_json::from_value(value)?)
}

fn check_contiguous(
    window: &str,
    years: impl Iterator<Item = i32>,
    previous: Option<i32>,
) -> LeaseProjectionResult<()> {
    let mut expected = previous.map(|y| y + 1);
    for year in years {
        if let Some(exp) = expected {
            if year != exp {
                return Err(LeaseProjectionError::InvalidSequence(format!(
                    "{window} year {year} follows {} (expected {exp})",
                    exp - 1
                )));
            }
        }
        expected = Some(year + 1);
    }
    Ok(())
}
