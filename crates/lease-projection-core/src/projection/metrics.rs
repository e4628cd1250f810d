//! Whole-projection aggregates reported alongside the periods.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::safe_divide;
use crate::projection::statements::Period;
use crate::time_value::npv_end_of_period;
use crate::types::{Money, PeriodWindow, Rate};
use crate::LeaseProjectionResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    /// Number of dynamic years summarized
    pub dynamic_years: u32,
    /// Σ rent over the dynamic window
    pub total_rent: Money,
    /// Dynamic rent discounted at year end
    pub rent_npv: Money,
    pub npv_discount_rate: Rate,
    pub total_revenue: Money,
    pub total_ebitda: Money,
    pub total_net_income: Money,
    /// Mean of each dynamic year's rent/revenue (years without revenue skipped)
    pub average_rent_to_revenue: Rate,
    /// Highest closing debt across projected years
    pub peak_debt: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_debt_year: Option<i32>,
    /// Cash at the close of the final year
    pub terminal_cash: Money,
}

pub fn compute_metrics(periods: &[Period], discount_rate: Rate) -> LeaseProjectionResult<AggregateMetrics> {
    let dynamic: Vec<&Period> = periods
        .iter()
        .filter(|p| p.window == PeriodWindow::Dynamic)
        .collect();

    let rents: Vec<Money> = dynamic.iter().map(|p| p.profit_loss.rent_expense).collect();
    let total_rent: Money = rents.iter().sum();
    let rent_npv = npv_end_of_period(discount_rate, &rents)?;

    let ratios: Vec<Rate> = dynamic
        .iter()
        .filter(|p| !p.profit_loss.total_revenue.is_zero())
        .map(|p| p.profit_loss.rent_expense / p.profit_loss.total_revenue)
        .collect();
    let average_rent_to_revenue = safe_divide(
        ratios.iter().sum(),
        Decimal::from(ratios.len() as u64),
    );

    let mut peak_debt = Decimal::ZERO;
    let mut peak_debt_year = None;
    for period in periods.iter().filter(|p| p.window != PeriodWindow::Historical) {
        if peak_debt_year.is_none() || period.balance_sheet.debt > peak_debt {
            peak_debt = period.balance_sheet.debt;
            peak_debt_year = Some(period.year);
        }
    }

    Ok(AggregateMetrics {
        dynamic_years: dynamic.len() as u32,
        total_rent,
        rent_npv,
        npv_discount_rate: discount_rate,
        total_revenue: dynamic.iter().map(|p| p.profit_loss.total_revenue).sum(),
        total_ebitda: dynamic.iter().map(|p| p.profit_loss.ebitda).sum(),
        total_net_income: dynamic.iter().map(|p| p.profit_loss.net_income).sum(),
        average_rent_to_revenue,
        peak_debt,
        peak_debt_year,
        terminal_cash: periods
            .last()
            .map_or(Decimal::ZERO, |p| p.balance_sheet.cash),
    })
}
