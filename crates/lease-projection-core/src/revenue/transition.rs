//! Pre-fill rules for the transition window between actuals and the
//! dynamic forecast.
//!
//! Each transition year may override a handful of drivers. Anything not
//! overridden is carried from the prior period or from the admin baseline.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{is_valid_growth, safe_divide};
use crate::error::LeaseProjectionError;
use crate::types::{Money, Rate};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A bridging year with optional driver overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPeriod {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_tuition: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_growth_rate: Option<Rate>,
}

impl TransitionPeriod {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            student_count: None,
            average_tuition: None,
            revenue_growth_rate: None,
            rent_growth_rate: None,
        }
    }

    fn has_enrollment_override(&self) -> bool {
        self.student_count.is_some() || self.average_tuition.is_some()
    }
}

/// Admin-maintained growth assumptions used when a year has no override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDefaults {
    pub revenue_growth_rate: Rate,
    pub rent_growth_rate: Rate,
}

impl Default for TransitionDefaults {
    fn default() -> Self {
        Self {
            revenue_growth_rate: dec!(0.05),
            rent_growth_rate: dec!(0.03),
        }
    }
}

/// Closing P&L drivers of the period before a transition year.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorDrivers {
    pub total_revenue: Money,
    pub rent_expense: Money,
    pub staff_costs: Money,
    pub other_operating_expenses: Money,
    pub students: Option<Decimal>,
    pub average_tuition: Option<Money>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevenueBasis {
    /// Students × tuition
    Enrollment,
    /// Prior revenue × (1 + growth)
    Growth,
}

/// Fully resolved drivers for one transition year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDrivers {
    pub year: i32,
    pub basis: RevenueBasis,
    pub students: Option<Decimal>,
    pub average_tuition: Option<Money>,
    pub tuition_revenue: Money,
    pub other_revenue: Money,
    pub total_revenue: Money,
    pub rent_expense: Money,
    pub staff_costs: Money,
    pub other_operating_expenses: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn resolve_transition_period(
    period: &TransitionPeriod,
    prior: &PriorDrivers,
    defaults: &TransitionDefaults,
    other_revenue_ratio: Rate,
) -> TransitionDrivers {
    let students = period.student_count.or(prior.students);
    let tuition = period.average_tuition.or(prior.average_tuition);

    let (basis, tuition_revenue, other_revenue) = match (students, tuition) {
        (Some(s), Some(t)) if period.has_enrollment_override() => {
            let tuition_revenue = s * t;
            (
                RevenueBasis::Enrollment,
                tuition_revenue,
                tuition_revenue * other_revenue_ratio,
            )
        }
        _ => {
            let growth = period
                .revenue_growth_rate
                .unwrap_or(defaults.revenue_growth_rate);
            let total = prior.total_revenue * (Decimal::ONE + growth);
            let tuition_revenue = total / (Decimal::ONE + other_revenue_ratio);
            (RevenueBasis::Growth, tuition_revenue, total - tuition_revenue)
        }
    };
    let total_revenue = tuition_revenue + other_revenue;

    let rent_growth = period.rent_growth_rate.unwrap_or(defaults.rent_growth_rate);
    let rent_expense = prior.rent_expense * (Decimal::ONE + rent_growth);

    TransitionDrivers {
        year: period.year,
        basis,
        students,
        average_tuition: tuition,
        tuition_revenue,
        other_revenue,
        total_revenue,
        rent_expense,
        staff_costs: carry_cost_ratio(prior.staff_costs, prior.total_revenue, total_revenue),
        other_operating_expenses: carry_cost_ratio(
            prior.other_operating_expenses,
            prior.total_revenue,
            total_revenue,
        ),
    }
}

pub fn validate_transition_period(period: &TransitionPeriod) -> LeaseProjectionResult<()> {
    let field = |name: &str| format!("transition[{}].{name}", period.year);
    if period.student_count.is_some_and(|s| s < Decimal::ZERO) {
        return Err(LeaseProjectionError::InvalidInput {
            field: field("student_count"),
            reason: "Student count must be non-negative".into(),
        });
    }
    if period.average_tuition.is_some_and(|t| t < Decimal::ZERO) {
        return Err(LeaseProjectionError::InvalidInput {
            field: field("average_tuition"),
            reason: "Tuition must be non-negative".into(),
        });
    }
    for (name, rate) in [
        ("revenue_growth_rate", period.revenue_growth_rate),
        ("rent_growth_rate", period.rent_growth_rate),
    ] {
        if rate.is_some_and(|r| !is_valid_growth(r)) {
            return Err(LeaseProjectionError::InvalidInput {
                field: field(name),
                reason: "Growth must be greater than -100% and at most 100%".into(),
            });
        }
    }
    Ok(())
}

/// Scale a cost with revenue at the prior period's cost-to-revenue ratio.
/// With no prior revenue the cost is carried flat.
fn carry_cost_ratio(prior_cost: Money, prior_revenue: Money, revenue: Money) -> Money {
    if prior_revenue.is_zero() {
        prior_cost
    } else {
        revenue * safe_divide(prior_cost, prior_revenue)
    }
}
