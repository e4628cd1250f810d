//! Process-wide financial constants and solver tuning.
//!
//! These are passed into every engine invocation as plain data. The engine
//! never reads ambient state, which keeps a run a pure function of its input.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LeaseProjectionError;
use crate::types::{Money, Rate};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_MAX_ITERATIONS: u32 = 100;
const DEFAULT_CACHE_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// System constants
// ---------------------------------------------------------------------------

/// Admin-maintained rates, immutable within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Zakat charged on positive earnings before zakat
    pub zakat_rate: Rate,
    /// Annual rate charged on the closing debt balance
    pub debt_interest_rate: Rate,
    /// Annual rate earned on cash held at or above the minimum balance
    pub deposit_interest_rate: Rate,
    /// Cash floor; shortfalls below it are funded with debt
    pub min_cash_balance: Money,
    /// Discount rate for rent NPV (falls back to the debt rate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npv_discount_rate: Option<Rate>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            zakat_rate: dec!(0.025),
            debt_interest_rate: dec!(0.05),
            deposit_interest_rate: dec!(0.02),
            min_cash_balance: dec!(1_000_000),
            npv_discount_rate: None,
        }
    }
}

impl SystemConfig {
    pub fn discount_rate(&self) -> Rate {
        self.npv_discount_rate.unwrap_or(self.debt_interest_rate)
    }

    pub fn validate(&self) -> LeaseProjectionResult<()> {
        validate_unit_rate("system.zakat_rate", self.zakat_rate)?;
        validate_unit_rate("system.debt_interest_rate", self.debt_interest_rate)?;
        validate_unit_rate("system.deposit_interest_rate", self.deposit_interest_rate)?;
        validate_non_negative("system.min_cash_balance", self.min_cash_balance)?;
        if let Some(rate) = self.npv_discount_rate {
            if rate <= dec!(-1) {
                return Err(LeaseProjectionError::InvalidInput {
                    field: "system.npv_discount_rate".into(),
                    reason: "Discount rate must be greater than -100%".into(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Circular solver tuning
// ---------------------------------------------------------------------------

/// Governs the interest/debt/cash fixed-point iteration. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularSolverConfig {
    pub max_iterations: u32,
    /// Absolute tolerance on both the debt and cash step
    pub convergence_tolerance: Money,
    /// Share of each candidate adopted per iteration, in (0, 1]
    pub relaxation_factor: Rate,
}

impl Default for CircularSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_tolerance: dec!(0.01),
            relaxation_factor: dec!(0.8),
        }
    }
}

impl CircularSolverConfig {
    pub fn validate(&self) -> LeaseProjectionResult<()> {
        if self.max_iterations == 0 {
            return Err(LeaseProjectionError::InvalidInput {
                field: "solver.max_iterations".into(),
                reason: "At least one iteration is required".into(),
            });
        }
        if self.convergence_tolerance <= dec!(0) {
            return Err(LeaseProjectionError::InvalidInput {
                field: "solver.convergence_tolerance".into(),
                reason: format!(
                    "Tolerance must be positive, got {}",
                    self.convergence_tolerance
                ),
            });
        }
        if self.relaxation_factor <= dec!(0) || self.relaxation_factor > dec!(1) {
            return Err(LeaseProjectionError::InvalidInput {
                field: "solver.relaxation_factor".into(),
                reason: format!(
                    "Relaxation factor must be in (0, 1], got {}",
                    self.relaxation_factor
                ),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation and cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Absolute epsilon for balance and cash checks, in currency units
    pub tolerance: Money,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { tolerance: dec!(1) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum stored outputs; 0 disables storage
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn validate_unit_rate(field: &str, value: Rate) -> LeaseProjectionResult<()> {
    if value < dec!(0) || value > dec!(1) {
        return Err(LeaseProjectionError::InvalidInput {
            field: field.into(),
            reason: format!("Rate must be between 0 and 1, got {value}"),
        });
    }
    Ok(())
}

pub(crate) fn validate_non_negative(field: &str, value: Money) -> LeaseProjectionResult<()> {
    if value < dec!(0) {
        return Err(LeaseProjectionError::InvalidInput {
            field: field.into(),
            reason: format!("Value must be non-negative, got {value}"),
        });
    }
    Ok(())
}
