//! Circular interest/debt/cash resolution for a single projected year.
//!
//! Interest expense depends on closing debt, interest income on closing
//! cash, and both flow through net income back into the cash and debt
//! balances. The solver iterates a relaxed fixed point on the (debt, cash)
//! pair, seeded from the prior year's closing balances.
//!
//! Debt is the balancing item: given target cash, it is whatever funds the
//! remaining assets after working-capital liabilities and equity. Target
//! cash is the larger of the minimum balance and the cash that would remain
//! after repaying all opening debt, so surplus cash retires debt first.

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{CircularSolverConfig, SystemConfig};
use crate::decimal::clamp_non_negative;
use crate::types::Money;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything about a year that does not depend on the financing solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverInputs {
    pub year: i32,
    pub ebit: Money,
    pub opening_cash: Money,
    pub opening_debt: Money,
    /// Depreciation plus working-capital cash impact
    pub non_cash_adjustments: Money,
    pub capex: Money,
    /// AR + prepaid + net PP&E at close
    pub non_cash_assets: Money,
    /// AP + accrued + deferred revenue at close
    pub operating_liabilities: Money,
    pub share_capital: Money,
    pub opening_retained_earnings: Money,
}

/// How the solve went; reported on every projected period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    pub iterations: u32,
    pub converged: bool,
    /// Last absolute debt step
    pub final_debt_delta: Money,
    /// Last absolute cash step
    pub final_cash_delta: Money,
    /// Cash sat below the minimum so no deposit interest was earned
    pub cash_shortfall: bool,
    /// Funding need was negative and debt was floored at zero
    pub debt_plug_clamped: bool,
}

/// Financing lines of a solved year.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedFinancing {
    pub interest_expense: Money,
    pub interest_income: Money,
    pub zakat: Money,
    pub net_income: Money,
    pub closing_cash: Money,
    pub closing_debt: Money,
    pub diagnostics: SolverDiagnostics,
}

/// One pass of the circular chain at a given (debt, cash) estimate.
#[derive(Debug, Clone)]
struct Evaluation {
    interest_expense: Money,
    interest_income: Money,
    zakat: Money,
    net_income: Money,
    target_cash: Money,
    required_debt: Money,
    shortfall: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve interest, zakat, closing cash and closing debt for one year.
///
/// Never fails: a year that does not converge within the iteration budget
/// keeps its last estimate and is flagged.
pub fn solve_period(
    inputs: &SolverInputs,
    system: &SystemConfig,
    config: &CircularSolverConfig,
) -> SolvedFinancing {
    let omega = config.relaxation_factor;
    let tolerance = config.convergence_tolerance;

    let mut debt = inputs.opening_debt;
    let mut cash = inputs.opening_cash;
    let mut debt_delta = Decimal::ZERO;
    let mut cash_delta = Decimal::ZERO;
    let mut iterations = 0u32;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let eval = evaluate(inputs, system, tolerance, debt, cash);
        let candidate_debt = clamp_non_negative(eval.required_debt);

        let next_debt = debt + omega * (candidate_debt - debt);
        let next_cash = cash + omega * (eval.target_cash - cash);
        debt_delta = (next_debt - debt).abs();
        cash_delta = (next_cash - cash).abs();
        debt = next_debt;
        cash = next_cash;

        if debt_delta < tolerance && cash_delta < tolerance {
            converged = true;
            break;
        }
    }

    // Settle: statements from the accepted estimate, closing balances from
    // the policy so the balance sheet ties exactly.
    let settled = evaluate(inputs, system, tolerance, debt, cash);
    let debt_plug_clamped = settled.required_debt < -tolerance;

    if converged {
        debug!(
            "Year {}: circular solve converged in {iterations} iterations",
            inputs.year
        );
    } else {
        warn!(
            "Year {}: circular solve stopped after {iterations} iterations (debt step {debt_delta}, cash step {cash_delta})",
            inputs.year
        );
    }

    SolvedFinancing {
        interest_expense: settled.interest_expense,
        interest_income: settled.interest_income,
        zakat: settled.zakat,
        net_income: settled.net_income,
        closing_cash: settled.target_cash,
        closing_debt: clamp_non_negative(settled.required_debt),
        diagnostics: SolverDiagnostics {
            iterations,
            converged,
            final_debt_delta: debt_delta,
            final_cash_delta: cash_delta,
            cash_shortfall: settled.shortfall,
            debt_plug_clamped,
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn evaluate(
    inputs: &SolverInputs,
    system: &SystemConfig,
    tolerance: Money,
    debt_estimate: Money,
    cash_estimate: Money,
) -> Evaluation {
    let interest_expense = clamp_non_negative(debt_estimate) * system.debt_interest_rate;

    // Estimates approach the floor from below; count them as at the floor
    // once inside the tolerance.
    let shortfall = cash_estimate + tolerance < system.min_cash_balance;
    let interest_income = if shortfall {
        Decimal::ZERO
    } else {
        cash_estimate * system.deposit_interest_rate
    };

    let ebt = inputs.ebit + interest_income - interest_expense;
    let zakat = if ebt > Decimal::ZERO {
        ebt * system.zakat_rate
    } else {
        Decimal::ZERO
    };
    let net_income = ebt - zakat;

    let pre_financing_cash =
        inputs.opening_cash + net_income + inputs.non_cash_adjustments - inputs.capex;
    let target_cash = system
        .min_cash_balance
        .max(pre_financing_cash - inputs.opening_debt);

    let equity = inputs.share_capital + inputs.opening_retained_earnings + net_income;
    let required_debt =
        target_cash + inputs.non_cash_assets - inputs.operating_liabilities - equity;

    Evaluation {
        interest_expense,
        interest_income,
        zakat,
        net_income,
        target_cash,
        required_debt,
        shortfall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// A year whose opening sheet balances: cash 5M + other assets 40M =
    /// liabilities 10M + debt 15M + equity 20M.
    fn balanced_inputs() -> SolverInputs {
        SolverInputs {
            year: 2027,
            ebit: dec!(4_000_000),
            opening_cash: dec!(5_000_000),
            opening_debt: dec!(15_000_000),
            non_cash_adjustments: dec!(2_000_000),
            capex: dec!(2_000_000),
            non_cash_assets: dec!(40_000_000),
            operating_liabilities: dec!(10_000_000),
            share_capital: dec!(10_000_000),
            opening_retained_earnings: dec!(10_000_000),
        }
    }

    fn closing_gap(inputs: &SolverInputs, solved: &SolvedFinancing) -> Money {
        let assets = solved.closing_cash + inputs.non_cash_assets;
        let claims = inputs.operating_liabilities
            + solved.closing_debt
            + inputs.share_capital
            + inputs.opening_retained_earnings
            + solved.net_income;
        assets - claims
    }

    #[test]
    fn test_converges_with_default_tuning() {
        let inputs = balanced_inputs();
        let solved = solve_period(&inputs, &SystemConfig::default(), &CircularSolverConfig::default());
        assert!(solved.diagnostics.converged);
        assert!(solved.diagnostics.iterations < 100);
        assert!(closing_gap(&inputs, &solved).abs() < dec!(0.000001));
    }

    #[test]
    fn test_interest_consistent_with_closing_debt() {
        let inputs = balanced_inputs();
        let system = SystemConfig::default();
        let solved = solve_period(&inputs, &system, &CircularSolverConfig::default());
        let implied = solved.closing_debt * system.debt_interest_rate;
        assert!((solved.interest_expense - implied).abs() < dec!(1));
    }

    #[test]
    fn test_surplus_cash_retires_debt() {
        let mut inputs = balanced_inputs();
        inputs.ebit = dec!(30_000_000);
        let solved = solve_period(&inputs, &SystemConfig::default(), &CircularSolverConfig::default());
        assert!(solved.closing_debt < dec!(0.01));
        assert!(solved.closing_cash > dec!(1_000_000));
        assert!(solved.interest_income > Decimal::ZERO);
        assert!(closing_gap(&inputs, &solved).abs() < dec!(0.000001));
    }

    #[test]
    fn test_loss_year_draws_debt_and_holds_minimum_cash() {
        let mut inputs = balanced_inputs();
        inputs.ebit = dec!(-8_000_000);
        let system = SystemConfig::default();
        let solved = solve_period(&inputs, &system, &CircularSolverConfig::default());
        assert_eq!(solved.closing_cash, system.min_cash_balance);
        assert!(solved.closing_debt > inputs.opening_debt);
        assert_eq!(solved.zakat, Decimal::ZERO);
        assert!(closing_gap(&inputs, &solved).abs() < dec!(0.000001));
    }

    #[test]
    fn test_zakat_only_on_positive_earnings() {
        let inputs = balanced_inputs();
        let system = SystemConfig::default();
        let solved = solve_period(&inputs, &system, &CircularSolverConfig::default());
        let ebt = inputs.ebit + solved.interest_income - solved.interest_expense;
        assert_eq!(solved.zakat, ebt * system.zakat_rate);
    }

    #[test]
    fn test_iteration_cap_flags_without_failing() {
        let config = CircularSolverConfig {
            max_iterations: 1,
            convergence_tolerance: dec!(0.000001),
            relaxation_factor: dec!(0.1),
        };
        let solved = solve_period(&balanced_inputs(), &SystemConfig::default(), &config);
        assert!(!solved.diagnostics.converged);
        assert_eq!(solved.diagnostics.iterations, 1);
    }

    #[test]
    fn test_deterministic() {
        let inputs = balanced_inputs();
        let a = solve_period(&inputs, &SystemConfig::default(), &CircularSolverConfig::default());
        let b = solve_period(&inputs, &SystemConfig::default(), &CircularSolverConfig::default());
        assert_eq!(a, b);
    }
}
