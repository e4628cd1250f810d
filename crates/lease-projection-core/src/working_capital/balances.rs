//! Ratio-driven working-capital balances.
//!
//! Every balance is a ratio of the *current* period's revenue or cash
//! operating expenses. Ratios are derived once from a confirmed baseline year
//! and then locked.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::safe_divide;
use crate::error::LeaseProjectionError;
use crate::types::{Money, Rate};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Ratios
// ---------------------------------------------------------------------------

/// Working-capital ratios established from a confirmed baseline year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapitalRatios {
    /// Year the ratios were derived from
    pub baseline_year: i32,
    /// Accounts receivable as % of revenue
    pub receivables_pct: Rate,
    /// Prepaid expenses as % of operating expenses
    pub prepaid_pct: Rate,
    /// Accounts payable as % of operating expenses
    pub payables_pct: Rate,
    /// Accrued expenses as % of operating expenses
    pub accrued_pct: Rate,
    /// Deferred (collected, unearned) revenue as % of revenue
    pub deferred_revenue_pct: Rate,
    /// Non-tuition revenue as a ratio of tuition revenue
    pub other_revenue_ratio: Rate,
    #[serde(default)]
    pub locked: bool,
}

/// Revenue, costs and balances of the year the ratios are derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineYear {
    pub year: i32,
    pub tuition_revenue: Money,
    pub other_revenue: Money,
    /// Cash operating expenses (rent + staff + other opex)
    pub operating_expenses: Money,
    pub accounts_receivable: Money,
    pub prepaid_expenses: Money,
    pub accounts_payable: Money,
    pub accrued_expenses: Money,
    pub deferred_revenue: Money,
}

impl WorkingCapitalRatios {
    /// Derive unlocked ratios from a baseline year.
    pub fn from_baseline(baseline: &BaselineYear) -> LeaseProjectionResult<Self> {
        let revenue = baseline.tuition_revenue + baseline.other_revenue;
        if revenue <= Decimal::ZERO {
            return Err(LeaseProjectionError::InvalidInput {
                field: "baseline.revenue".into(),
                reason: format!(
                    "Year {} has no revenue; ratios cannot be derived",
                    baseline.year
                ),
            });
        }
        Ok(Self {
            baseline_year: baseline.year,
            receivables_pct: baseline.accounts_receivable / revenue,
            prepaid_pct: safe_divide(baseline.prepaid_expenses, baseline.operating_expenses),
            payables_pct: safe_divide(baseline.accounts_payable, baseline.operating_expenses),
            accrued_pct: safe_divide(baseline.accrued_expenses, baseline.operating_expenses),
            deferred_revenue_pct: baseline.deferred_revenue / revenue,
            other_revenue_ratio: safe_divide(baseline.other_revenue, baseline.tuition_revenue),
            locked: false,
        })
    }

    pub fn lock(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Re-derive from a new baseline. Fails once the ratios are locked.
    pub fn rederive_from_baseline(&self, baseline: &BaselineYear) -> LeaseProjectionResult<Self> {
        if self.locked {
            return Err(LeaseProjectionError::RatiosLocked {
                baseline_year: self.baseline_year,
            });
        }
        Self::from_baseline(baseline)
    }

    pub fn validate(&self) -> LeaseProjectionResult<()> {
        for (field, value) in [
            ("working_capital.receivables_pct", self.receivables_pct),
            ("working_capital.prepaid_pct", self.prepaid_pct),
            ("working_capital.payables_pct", self.payables_pct),
            ("working_capital.accrued_pct", self.accrued_pct),
            ("working_capital.deferred_revenue_pct", self.deferred_revenue_pct),
            ("working_capital.other_revenue_ratio", self.other_revenue_ratio),
        ] {
            if value < Decimal::ZERO {
                return Err(LeaseProjectionError::InvalidInput {
                    field: field.into(),
                    reason: format!("Ratio must be non-negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapitalBalances {
    pub accounts_receivable: Money,
    pub prepaid_expenses: Money,
    pub accounts_payable: Money,
    pub accrued_expenses: Money,
    pub deferred_revenue: Money,
}

impl WorkingCapitalBalances {
    /// Balances for a period from that same period's revenue and opex.
    pub fn compute(ratios: &WorkingCapitalRatios, revenue: Money, operating_expenses: Money) -> Self {
        Self {
            accounts_receivable: revenue * ratios.receivables_pct,
            prepaid_expenses: operating_expenses * ratios.prepaid_pct,
            accounts_payable: operating_expenses * ratios.payables_pct,
            accrued_expenses: operating_expenses * ratios.accrued_pct,
            deferred_revenue: revenue * ratios.deferred_revenue_pct,
        }
    }

    pub fn current_assets(&self) -> Money {
        self.accounts_receivable + self.prepaid_expenses
    }

    pub fn current_liabilities(&self) -> Money {
        self.accounts_payable + self.accrued_expenses + self.deferred_revenue
    }

    pub fn net_working_capital(&self) -> Money {
        self.current_assets() - self.current_liabilities()
    }
}

/// Year-on-year movement in each balance, signed as balance changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingCapitalChange {
    pub change_in_receivables: Money,
    pub change_in_prepaid: Money,
    pub change_in_payables: Money,
    pub change_in_accrued: Money,
    pub change_in_deferred_revenue: Money,
}

impl WorkingCapitalChange {
    pub fn between(prior: &WorkingCapitalBalances, current: &WorkingCapitalBalances) -> Self {
        Self {
            change_in_receivables: current.accounts_receivable - prior.accounts_receivable,
            change_in_prepaid: current.prepaid_expenses - prior.prepaid_expenses,
            change_in_payables: current.accounts_payable - prior.accounts_payable,
            change_in_accrued: current.accrued_expenses - prior.accrued_expenses,
            change_in_deferred_revenue: current.deferred_revenue - prior.deferred_revenue,
        }
    }

    /// Effect on operating cash flow: asset increases consume cash,
    /// liability increases release it.
    pub fn cash_impact(&self) -> Money {
        -self.change_in_receivables - self.change_in_prepaid
            + self.change_in_payables
            + self.change_in_accrued
            + self.change_in_deferred_revenue
    }
}
