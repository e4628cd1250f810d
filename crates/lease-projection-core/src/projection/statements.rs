use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::projection::solver::SolverDiagnostics;
use crate::types::{Money, PeriodWindow};
use crate::working_capital::balances::{WorkingCapitalBalances, WorkingCapitalChange};

// ---------------------------------------------------------------------------
// Profit and loss
// ---------------------------------------------------------------------------

/// Revenue and operating cost lines, everything above EBIT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingLines {
    pub tuition_revenue: Money,
    pub other_revenue: Money,
    pub rent_expense: Money,
    pub staff_costs: Money,
    pub other_operating_expenses: Money,
    pub depreciation: Money,
}

impl OperatingLines {
    pub fn total_revenue(&self) -> Money {
        self.tuition_revenue + self.other_revenue
    }

    /// Cash operating expenses (before depreciation).
    pub fn operating_expenses(&self) -> Money {
        self.rent_expense + self.staff_costs + self.other_operating_expenses
    }

    pub fn ebitda(&self) -> Money {
        self.total_revenue() - self.operating_expenses()
    }

    pub fn ebit(&self) -> Money {
        self.ebitda() - self.depreciation
    }
}

/// Income statement for a single year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub tuition_revenue: Money,
    pub other_revenue: Money,
    pub total_revenue: Money,
    pub rent_expense: Money,
    pub staff_costs: Money,
    pub other_operating_expenses: Money,
    pub total_operating_expenses: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub interest_expense: Money,
    pub interest_income: Money,
    pub ebt: Money,
    pub zakat: Money,
    pub net_income: Money,
}

impl ProfitLoss {
    pub fn assemble(
        lines: &OperatingLines,
        interest_expense: Money,
        interest_income: Money,
        zakat: Money,
    ) -> Self {
        let ebit = lines.ebit();
        let ebt = ebit + interest_income - interest_expense;
        Self {
            tuition_revenue: lines.tuition_revenue,
            other_revenue: lines.other_revenue,
            total_revenue: lines.total_revenue(),
            rent_expense: lines.rent_expense,
            staff_costs: lines.staff_costs,
            other_operating_expenses: lines.other_operating_expenses,
            total_operating_expenses: lines.operating_expenses(),
            ebitda: lines.ebitda(),
            depreciation: lines.depreciation,
            ebit,
            interest_expense,
            interest_income,
            ebt,
            zakat,
            net_income: ebt - zakat,
        }
    }
}

// ---------------------------------------------------------------------------
// Balance sheet
// ---------------------------------------------------------------------------

/// Closing position for a single year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub cash: Money,
    pub accounts_receivable: Money,
    pub prepaid_expenses: Money,
    pub total_current_assets: Money,
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    pub net_ppe: Money,
    pub total_assets: Money,
    pub accounts_payable: Money,
    pub accrued_expenses: Money,
    pub deferred_revenue: Money,
    pub total_current_liabilities: Money,
    pub debt: Money,
    pub total_liabilities: Money,
    pub share_capital: Money,
    pub retained_earnings: Money,
    pub total_equity: Money,
    pub total_liabilities_and_equity: Money,
}

/// Non-cash, non-working-capital closing balances.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosingBalances {
    pub cash: Money,
    pub gross_ppe: Money,
    pub accumulated_depreciation: Money,
    pub debt: Money,
    pub share_capital: Money,
    pub retained_earnings: Money,
}

impl BalanceSheet {
    pub fn assemble(closing: &ClosingBalances, wc: &WorkingCapitalBalances) -> Self {
        let total_current_assets = closing.cash + wc.current_assets();
        let net_ppe = closing.gross_ppe - closing.accumulated_depreciation;
        let total_current_liabilities = wc.current_liabilities();
        let total_liabilities = total_current_liabilities + closing.debt;
        let total_equity = closing.share_capital + closing.retained_earnings;
        Self {
            cash: closing.cash,
            accounts_receivable: wc.accounts_receivable,
            prepaid_expenses: wc.prepaid_expenses,
            total_current_assets,
            gross_ppe: closing.gross_ppe,
            accumulated_depreciation: closing.accumulated_depreciation,
            net_ppe,
            total_assets: total_current_assets + net_ppe,
            accounts_payable: wc.accounts_payable,
            accrued_expenses: wc.accrued_expenses,
            deferred_revenue: wc.deferred_revenue,
            total_current_liabilities,
            debt: closing.debt,
            total_liabilities,
            share_capital: closing.share_capital,
            retained_earnings: closing.retained_earnings,
            total_equity,
            total_liabilities_and_equity: total_liabilities + total_equity,
        }
    }

    pub fn working_capital(&self) -> WorkingCapitalBalances {
        WorkingCapitalBalances {
            accounts_receivable: self.accounts_receivable,
            prepaid_expenses: self.prepaid_expenses,
            accounts_payable: self.accounts_payable,
            accrued_expenses: self.accrued_expenses,
            deferred_revenue: self.deferred_revenue,
        }
    }

    /// Assets minus liabilities and equity; zero when the sheet balances.
    pub fn balance_difference(&self) -> Money {
        self.total_assets - self.total_liabilities_and_equity
    }
}

// ---------------------------------------------------------------------------
// Cash flow
// ---------------------------------------------------------------------------

/// Indirect-method cash flow statement for a single year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub beginning_cash: Money,
    pub net_income: Money,
    pub depreciation: Money,
    pub change_in_receivables: Money,
    pub change_in_prepaid: Money,
    pub change_in_payables: Money,
    pub change_in_accrued: Money,
    pub change_in_deferred_revenue: Money,
    pub working_capital_impact: Money,
    pub cash_from_operations: Money,
    pub capex: Money,
    pub cash_from_investing: Money,
    pub debt_drawdown: Money,
    pub debt_repayment: Money,
    /// Equity issued less distributions (historical years only)
    pub equity_movements: Money,
    pub cash_from_financing: Money,
    pub net_change_in_cash: Money,
    pub ending_cash: Money,
}

/// Financing movements for a year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancingFlows {
    pub debt_drawdown: Money,
    pub debt_repayment: Money,
    pub equity_movements: Money,
}

impl FinancingFlows {
    /// Split a debt movement into drawdown and repayment.
    pub fn from_debt_change(prior_debt: Money, closing_debt: Money) -> Self {
        let change = closing_debt - prior_debt;
        Self {
            debt_drawdown: change.max(Decimal::ZERO),
            debt_repayment: (-change).max(Decimal::ZERO),
            equity_movements: Decimal::ZERO,
        }
    }

    pub fn net(&self) -> Money {
        self.debt_drawdown - self.debt_repayment + self.equity_movements
    }
}

impl CashFlowStatement {
    pub fn assemble(
        beginning_cash: Money,
        net_income: Money,
        depreciation: Money,
        wc_change: &WorkingCapitalChange,
        capex: Money,
        financing: &FinancingFlows,
    ) -> Self {
        let working_capital_impact = wc_change.cash_impact();
        let cash_from_operations = net_income + depreciation + working_capital_impact;
        let cash_from_investing = -capex;
        let cash_from_financing = financing.net();
        let net_change_in_cash = cash_from_operations + cash_from_investing + cash_from_financing;
        Self {
            beginning_cash,
            net_income,
            depreciation,
            change_in_receivables: wc_change.change_in_receivables,
            change_in_prepaid: wc_change.change_in_prepaid,
            change_in_payables: wc_change.change_in_payables,
            change_in_accrued: wc_change.change_in_accrued,
            change_in_deferred_revenue: wc_change.change_in_deferred_revenue,
            working_capital_impact,
            cash_from_operations,
            capex,
            cash_from_investing,
            debt_drawdown: financing.debt_drawdown,
            debt_repayment: financing.debt_repayment,
            equity_movements: financing.equity_movements,
            cash_from_financing,
            net_change_in_cash,
            ending_cash: beginning_cash + net_change_in_cash,
        }
    }

    pub fn free_cash_flow(&self) -> Money {
        self.cash_from_operations + self.cash_from_investing
    }
}

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

/// One fiscal year of the projection with all three statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub window: PeriodWindow,
    /// Actual years flagged immutable are never recomputed
    pub immutable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_tuition: Option<Money>,
    pub profit_loss: ProfitLoss,
    pub balance_sheet: BalanceSheet,
    pub cash_flow: CashFlowStatement,
    /// Present on solved (transition and dynamic) periods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverDiagnostics>,
}

impl Period {
    pub fn is_converged(&self) -> bool {
        self.solver.as_ref().map_or(true, |s| s.converged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lines() -> OperatingLines {
        OperatingLines {
            tuition_revenue: dec!(40_000_000),
            other_revenue: dec!(5_000_000),
            rent_expense: dec!(9_000_000),
            staff_costs: dec!(18_000_000),
            other_operating_expenses: dec!(4_500_000),
            depreciation: dec!(1_500_000),
        }
    }

    #[test]
    fn test_profit_loss_cascade() {
        let pl = ProfitLoss::assemble(&lines(), dec!(500_000), dec!(20_000), dec!(300_000));
        assert_eq!(pl.total_revenue, dec!(45_000_000));
        assert_eq!(pl.total_operating_expenses, dec!(31_500_000));
        assert_eq!(pl.ebitda, dec!(13_500_000));
        assert_eq!(pl.ebit, dec!(12_000_000));
        assert_eq!(pl.ebt, dec!(11_520_000));
        assert_eq!(pl.net_income, dec!(11_220_000));
    }

    #[test]
    fn test_balance_sheet_totals() {
        let wc = WorkingCapitalBalances {
            accounts_receivable: dec!(4_500_000),
            prepaid_expenses: dec!(500_000),
            accounts_payable: dec!(2_000_000),
            accrued_expenses: dec!(1_000_000),
            deferred_revenue: dec!(6_000_000),
        };
        let closing = ClosingBalances {
            cash: dec!(5_000_000),
            gross_ppe: dec!(30_000_000),
            accumulated_depreciation: dec!(10_000_000),
            debt: dec!(8_000_000),
            share_capital: dec!(10_000_000),
            retained_earnings: dec!(3_000_000),
        };
        let bs = BalanceSheet::assemble(&closing, &wc);
        assert_eq!(bs.total_assets, dec!(30_000_000));
        assert_eq!(bs.total_liabilities_and_equity, dec!(30_000_000));
        assert_eq!(bs.balance_difference(), Decimal::ZERO);
        assert_eq!(bs.working_capital(), wc);
    }

    #[test]
    fn test_cash_flow_ties_to_ending_cash() {
        let change = WorkingCapitalChange {
            change_in_receivables: dec!(100),
            change_in_payables: dec!(40),
            ..Default::default()
        };
        let financing = FinancingFlows::from_debt_change(dec!(1_000), dec!(700));
        assert_eq!(financing.debt_repayment, dec!(300));
        assert_eq!(financing.debt_drawdown, Decimal::ZERO);

        let cf = CashFlowStatement::assemble(dec!(2_000), dec!(900), dec!(200), &change, dec!(250), &financing);
        // 900 + 200 - 100 + 40
        assert_eq!(cf.cash_from_operations, dec!(1_040));
        assert_eq!(cf.cash_from_investing, dec!(-250));
        assert_eq!(cf.cash_from_financing, dec!(-300));
        assert_eq!(cf.ending_cash, dec!(2_490));
        assert_eq!(cf.free_cash_flow(), dec!(790));
    }
}
