//! Post-run integrity checks over every period.
//!
//! Each period must balance (assets = liabilities + equity) and its cash flow
//! statement must land on the balance sheet cash, both within an absolute
//! tolerance. Failures are reported, never raised: a caller always gets the
//! full projection plus the list of offending years.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::within_tolerance;
use crate::projection::statements::Period;
use crate::types::{Money, PeriodWindow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodCheck {
    pub year: i32,
    pub window: PeriodWindow,
    /// Assets minus liabilities and equity
    pub balance_difference: Money,
    /// Cash flow ending cash minus balance sheet cash
    pub cash_reconciliation_difference: Money,
    pub balanced: bool,
    pub cash_reconciled: bool,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub tolerance: Money,
    pub all_periods_balanced: bool,
    pub all_cash_flows_reconciled: bool,
    pub all_periods_converged: bool,
    pub imbalanced_periods: Vec<i32>,
    pub unreconciled_periods: Vec<i32>,
    pub unconverged_periods: Vec<i32>,
    pub max_balance_difference: Money,
    pub max_cash_reconciliation_difference: Money,
    pub checks: Vec<PeriodCheck>,
}

impl ValidationSummary {
    pub fn is_clean(&self) -> bool {
        self.all_periods_balanced && self.all_cash_flows_reconciled && self.all_periods_converged
    }
}

pub fn check_period(period: &Period, tolerance: Money) -> PeriodCheck {
    let balance_difference = period.balance_sheet.balance_difference();
    let cash_reconciliation_difference = period.cash_flow.ending_cash - period.balance_sheet.cash;
    PeriodCheck {
        year: period.year,
        window: period.window,
        balance_difference,
        cash_reconciliation_difference,
        balanced: within_tolerance(
            period.balance_sheet.total_assets,
            period.balance_sheet.total_liabilities_and_equity,
            tolerance,
        ),
        cash_reconciled: within_tolerance(
            period.cash_flow.ending_cash,
            period.balance_sheet.cash,
            tolerance,
        ),
        converged: period.is_converged(),
    }
}

pub fn validate_periods(periods: &[Period], tolerance: Money) -> ValidationSummary {
    let checks: Vec<PeriodCheck> = periods.iter().map(|p| check_period(p, tolerance)).collect();

    let failing = |pred: fn(&PeriodCheck) -> bool| -> Vec<i32> {
        checks.iter().filter(|c| !pred(c)).map(|c| c.year).collect()
    };
    let imbalanced_periods = failing(|c| c.balanced);
    let unreconciled_periods = failing(|c| c.cash_reconciled);
    let unconverged_periods = failing(|c| c.converged);

    let max_balance_difference = checks
        .iter()
        .map(|c| c.balance_difference.abs())
        .max()
        .unwrap_or(Decimal::ZERO);
    let max_cash_reconciliation_difference = checks
        .iter()
        .map(|c| c.cash_reconciliation_difference.abs())
        .max()
        .unwrap_or(Decimal::ZERO);

    ValidationSummary {
        tolerance,
        all_periods_balanced: imbalanced_periods.is_empty(),
        all_cash_flows_reconciled: unreconciled_periods.is_empty(),
        all_periods_converged: unconverged_periods.is_empty(),
        imbalanced_periods,
        unreconciled_periods,
        unconverged_periods,
        max_balance_difference,
        max_cash_reconciliation_difference,
        checks,
    }
}
