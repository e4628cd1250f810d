//! Straight-line depreciation over existing assets and new CapEx.
//!
//! The scheduler is seeded from the last actual balance sheet: the existing
//! net book value runs off over its remaining life. Manual and automatic
//! reinvestment additions start depreciating in their acquisition year.
//! An asset stops contributing once fully depreciated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{grow, is_valid_growth};
use crate::error::LeaseProjectionError;
use crate::types::{Money, Rate};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_EXISTING_LIFE: u32 = 10;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// A one-off capital expenditure in a given year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexEntry {
    pub year: i32,
    pub amount: Money,
    pub useful_life_years: u32,
}

/// Periodic refurbishment triggered every `frequency_years` of the dynamic
/// window (never in its first year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoReinvestment {
    pub frequency_years: u32,
    /// Spend at dynamic index 0 prices, escalated per year
    pub amount: Money,
    #[serde(default)]
    pub escalation_rate: Rate,
    pub useful_life_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexConfig {
    /// Years over which the opening net book value runs off
    #[serde(default = "default_existing_life")]
    pub existing_asset_remaining_life: u32,
    #[serde(default)]
    pub manual: Vec<CapexEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_reinvestment: Option<AutoReinvestment>,
}

fn default_existing_life() -> u32 {
    DEFAULT_EXISTING_LIFE
}

impl Default for CapexConfig {
    fn default() -> Self {
        Self {
            existing_asset_remaining_life: DEFAULT_EXISTING_LIFE,
            manual: Vec::new(),
            auto_reinvestment: None,
        }
    }
}

impl CapexConfig {
    pub fn validate(&self) -> LeaseProjectionResult<()> {
        if self.existing_asset_remaining_life == 0 {
            return Err(invalid(
                "capex.existing_asset_remaining_life",
                "Remaining life must be at least one year",
            ));
        }
        for entry in &self.manual {
            if entry.amount < Decimal::ZERO {
                return Err(invalid(
                    &format!("capex.manual[{}].amount", entry.year),
                    "CapEx must be non-negative",
                ));
            }
            if entry.useful_life_years == 0 {
                return Err(invalid(
                    &format!("capex.manual[{}].useful_life_years", entry.year),
                    "Useful life must be at least one year",
                ));
            }
        }
        if let Some(auto) = &self.auto_reinvestment {
            if auto.frequency_years == 0 {
                return Err(invalid(
                    "capex.auto_reinvestment.frequency_years",
                    "Frequency must be at least one year",
                ));
            }
            if auto.useful_life_years == 0 {
                return Err(invalid(
                    "capex.auto_reinvestment.useful_life_years",
                    "Useful life must be at least one year",
                ));
            }
            if auto.amount < Decimal::ZERO {
                return Err(invalid(
                    "capex.auto_reinvestment.amount",
                    "CapEx must be non-negative",
                ));
            }
            if !is_valid_growth(auto.escalation_rate) {
                return Err(invalid(
                    "capex.auto_reinvestment.escalation_rate",
                    "Escalation must be greater than -100% and at most 100%",
                ));
            }
        }
        Ok(())
    }

    /// Additions acquired in `year`. `dynamic_index` is the zero-based
    /// position within the dynamic window, or `None` for transition years.
    pub fn additions_for(
        &self,
        year: i32,
        dynamic_index: Option<u32>,
    ) -> LeaseProjectionResult<Vec<CapexEntry>> {
        let mut additions: Vec<CapexEntry> = self
            .manual
            .iter()
            .filter(|e| e.year == year)
            .cloned()
            .collect();

        if let (Some(auto), Some(idx)) = (&self.auto_reinvestment, dynamic_index) {
            if idx > 0 && auto.frequency_years > 0 && idx % auto.frequency_years == 0 {
                additions.push(CapexEntry {
                    year,
                    amount: grow(
                        auto.amount,
                        auto.escalation_rate,
                        idx,
                        "capex.auto_reinvestment.escalation_rate",
                    )?,
                    useful_life_years: auto.useful_life_years,
                });
            }
        }
        Ok(additions)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct AssetSchedule {
    cost: Money,
    annual_charge: Money,
    useful_life_years: u32,
    years_charged: u32,
    accumulated: Money,
}

impl AssetSchedule {
    fn new(cost: Money, useful_life_years: u32) -> Self {
        Self {
            cost,
            annual_charge: cost / Decimal::from(useful_life_years),
            useful_life_years,
            years_charged: 0,
            accumulated: Decimal::ZERO,
        }
    }

    fn is_active(&self) -> bool {
        self.accumulated < self.cost
    }

    /// Charge one year; the final year takes whatever book value is left.
    fn charge(&mut self) -> Money {
        if !self.is_active() {
            return Decimal::ZERO;
        }
        let remaining = self.cost - self.accumulated;
        let amount = if self.years_charged + 1 >= self.useful_life_years {
            remaining
        } else {
            self.annual_charge.min(remaining)
        };
        self.years_charged += 1;
        self.accumulated += amount;
        amount
    }
}

/// One year of the PP&E roll-forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationStep {
    pub year: i32,
    pub capex: Money,
    pub depreciation: Money,
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    pub net_ppe: Money,
    pub active_assets: usize,
}

/// PP&E roll-forward state for one engine invocation.
#[derive(Debug, Clone)]
pub struct DepreciationScheduler {
    assets: Vec<AssetSchedule>,
    gross_ppe: Money,
    accumulated_depreciation: Money,
}

impl DepreciationScheduler {
    /// Seed from closing actuals; the net book value becomes one schedule.
    pub fn seed(gross_ppe: Money, accumulated_depreciation: Money, remaining_life: u32) -> Self {
        let net_book_value = gross_ppe - accumulated_depreciation;
        let mut assets = Vec::new();
        if net_book_value > Decimal::ZERO {
            assets.push(AssetSchedule::new(net_book_value, remaining_life.max(1)));
        }
        Self {
            assets,
            gross_ppe,
            accumulated_depreciation,
        }
    }

    /// Book additions for `year`, then charge every active schedule.
    pub fn advance(&mut self, year: i32, additions: &[CapexEntry]) -> DepreciationStep {
        let mut capex = Decimal::ZERO;
        for addition in additions {
            if addition.amount > Decimal::ZERO {
                self.assets
                    .push(AssetSchedule::new(addition.amount, addition.useful_life_years.max(1)));
            }
            capex += addition.amount;
        }
        self.gross_ppe += capex;

        let depreciation: Money = self.assets.iter_mut().map(AssetSchedule::charge).sum();
        self.accumulated_depreciation += depreciation;

        DepreciationStep {
            year,
            capex,
            depreciation,
            gross_ppe: self.gross_ppe,
            accumulated_depreciation: self.accumulated_depreciation,
            net_ppe: self.gross_ppe - self.accumulated_depreciation,
            active_assets: self.assets.iter().filter(|a| a.is_active()).count(),
        }
    }
}

fn invalid(field: &str, reason: &str) -> LeaseProjectionError {
    LeaseProjectionError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}
