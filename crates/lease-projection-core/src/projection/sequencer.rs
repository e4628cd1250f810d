//! Ordered construction of every period in a projection.
//!
//! The sequencer is a small state machine, `Historical -> Transition ->
//! Dynamic -> Done`. Periods live in one contiguous vector and each year
//! reads its opening position from the entry immediately before it.
//! Historical actuals are taken as reported; only transition and dynamic
//! years are solved.

use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::capex::depreciation::{CapexEntry, DepreciationScheduler};
use crate::decimal::safe_divide;
use crate::error::LeaseProjectionError;
use crate::projection::input::{EngineInput, HistoricalPeriod};
use crate::projection::solver::{solve_period, SolverDiagnostics, SolverInputs};
use crate::projection::statements::{
    BalanceSheet, CashFlowStatement, ClosingBalances, FinancingFlows, OperatingLines, Period,
    ProfitLoss,
};
use crate::rent::model::resolve_rent;
use crate::revenue::enrollment::compute_period_revenue;
use crate::revenue::transition::{resolve_transition_period, PriorDrivers};
use crate::types::{Money, PeriodWindow};
use crate::working_capital::balances::{
    WorkingCapitalBalances, WorkingCapitalChange, WorkingCapitalRatios,
};
use crate::LeaseProjectionResult;

/// Rent above this share of revenue is reported.
const RENT_BURDEN_WARNING: Decimal = dec!(0.5);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    Historical,
    Transition,
    Dynamic,
    Done,
}

/// Everything the sequencer produced for one run.
#[derive(Debug, Clone)]
pub struct SequencedPeriods {
    pub periods: Vec<Period>,
    pub warnings: Vec<String>,
    pub solver_iterations: u64,
}

/// Operating drivers of one projected year, before financing.
#[derive(Debug, Clone)]
struct PeriodDrivers {
    year: i32,
    window: PeriodWindow,
    students: Option<Decimal>,
    average_tuition: Option<Money>,
    tuition_revenue: Money,
    other_revenue: Money,
    rent_expense: Money,
    staff_costs: Money,
    other_operating_expenses: Money,
    capex_additions: Vec<CapexEntry>,
}

pub struct PeriodSequencer<'a> {
    input: &'a EngineInput,
    ratios: &'a WorkingCapitalRatios,
    state: SequencerState,
    periods: Vec<Period>,
    scheduler: Option<DepreciationScheduler>,
    warnings: Vec<String>,
    solver_iterations: u64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl<'a> PeriodSequencer<'a> {
    /// Validates the input; no period is built until `step` or `run`.
    pub fn new(input: &'a EngineInput) -> LeaseProjectionResult<Self> {
        input.validate()?;
        let ratios = input.ratios()?;
        Ok(Self {
            input,
            ratios,
            state: SequencerState::Historical,
            periods: Vec::with_capacity(input.total_periods()),
            scheduler: None,
            warnings: Vec::new(),
            solver_iterations: 0,
        })
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Build the current window in full and advance to the next one.
    pub fn step(&mut self) -> LeaseProjectionResult<SequencerState> {
        self.state = match self.state {
            SequencerState::Historical => {
                self.build_historical();
                SequencerState::Transition
            }
            SequencerState::Transition => {
                self.build_transition()?;
                SequencerState::Dynamic
            }
            SequencerState::Dynamic => {
                self.build_dynamic()?;
                SequencerState::Done
            }
            SequencerState::Done => SequencerState::Done,
        };
        Ok(self.state)
    }

    pub fn run(mut self) -> LeaseProjectionResult<SequencedPeriods> {
        while self.state != SequencerState::Done {
            self.step()?;
        }
        Ok(SequencedPeriods {
            periods: self.periods,
            warnings: self.warnings,
            solver_iterations: self.solver_iterations,
        })
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

impl<'a> PeriodSequencer<'a> {
    fn build_historical(&mut self) {
        let input = self.input;
        for actual in &input.historical {
            let period = historical_period(actual, self.periods.last());
            let diff = period.balance_sheet.balance_difference();
            if diff.abs() > input.validation.tolerance {
                self.warnings.push(format!(
                    "Year {}: reported balance sheet is out of balance by {diff}",
                    actual.year
                ));
            }
            self.periods.push(period);
        }
        debug!("Historical window: {} actual years", input.historical.len());
    }

    fn build_transition(&mut self) -> LeaseProjectionResult<()> {
        let input = self.input;
        for period in &input.transition {
            let prior = prior_drivers(self.prior()?);
            let resolved = resolve_transition_period(
                period,
                &prior,
                &input.transition_defaults,
                self.ratios.other_revenue_ratio,
            );
            let projected = self.project_period(PeriodDrivers {
                year: period.year,
                window: PeriodWindow::Transition,
                students: resolved.students,
                average_tuition: resolved.average_tuition,
                tuition_revenue: resolved.tuition_revenue,
                other_revenue: resolved.other_revenue,
                rent_expense: resolved.rent_expense,
                staff_costs: resolved.staff_costs,
                other_operating_expenses: resolved.other_operating_expenses,
                capex_additions: input.dynamic.capex.additions_for(period.year, None)?,
            })?;
            self.periods.push(projected);
        }
        debug!("Transition window: {} bridging years", input.transition.len());
        Ok(())
    }

    fn build_dynamic(&mut self) -> LeaseProjectionResult<()> {
        let input = self.input;
        let dynamic = &input.dynamic;
        let ramp = dynamic.ramp_plan.as_deref().unwrap_or_default();
        let start_year = self.prior()?.year + 1;

        for idx in 0..dynamic.years {
            let year = start_year + idx as i32;
            let revenue = compute_period_revenue(
                &dynamic.curriculum,
                ramp,
                self.ratios.other_revenue_ratio,
                idx,
            )?;
            let projected = self.project_period(PeriodDrivers {
                year,
                window: PeriodWindow::Dynamic,
                students: Some(revenue.students),
                average_tuition: Some(revenue.average_tuition()),
                tuition_revenue: revenue.tuition_revenue,
                other_revenue: revenue.other_revenue,
                rent_expense: resolve_rent(&dynamic.rent_model, idx, revenue.total_revenue)?,
                staff_costs: dynamic.staff.cost(revenue.students, idx)?,
                other_operating_expenses: revenue.total_revenue * dynamic.other_opex_ratio,
                capex_additions: dynamic.capex.additions_for(year, Some(idx))?,
            })?;
            self.periods.push(projected);
        }
        debug!("Dynamic window: {} years from {start_year}", dynamic.years);
        Ok(())
    }

    fn prior(&self) -> LeaseProjectionResult<&Period> {
        self.periods.last().ok_or_else(|| {
            LeaseProjectionError::MissingBaseline("no prior period to open from".into())
        })
    }

    /// Shared transformation for every solved year: depreciation, working
    /// capital, circular financing, then the three statements.
    fn project_period(&mut self, drivers: PeriodDrivers) -> LeaseProjectionResult<Period> {
        let opening = self.prior()?.balance_sheet.clone();
        let remaining_life = self.input.dynamic.capex.existing_asset_remaining_life;

        let ppe = self
            .scheduler
            .get_or_insert_with(|| {
                DepreciationScheduler::seed(
                    opening.gross_ppe,
                    opening.accumulated_depreciation,
                    remaining_life,
                )
            })
            .advance(drivers.year, &drivers.capex_additions);

        let lines = OperatingLines {
            tuition_revenue: drivers.tuition_revenue,
            other_revenue: drivers.other_revenue,
            rent_expense: drivers.rent_expense,
            staff_costs: drivers.staff_costs,
            other_operating_expenses: drivers.other_operating_expenses,
            depreciation: ppe.depreciation,
        };
        let wc = WorkingCapitalBalances::compute(
            self.ratios,
            lines.total_revenue(),
            lines.operating_expenses(),
        );
        let wc_change = WorkingCapitalChange::between(&opening.working_capital(), &wc);

        let solved = solve_period(
            &SolverInputs {
                year: drivers.year,
                ebit: lines.ebit(),
                opening_cash: opening.cash,
                opening_debt: opening.debt,
                non_cash_adjustments: ppe.depreciation + wc_change.cash_impact(),
                capex: ppe.capex,
                non_cash_assets: wc.current_assets() + ppe.net_ppe,
                operating_liabilities: wc.current_liabilities(),
                share_capital: opening.share_capital,
                opening_retained_earnings: opening.retained_earnings,
            },
            &self.input.system,
            &self.input.solver,
        );
        self.solver_iterations += u64::from(solved.diagnostics.iterations);

        let profit_loss = ProfitLoss::assemble(
            &lines,
            solved.interest_expense,
            solved.interest_income,
            solved.zakat,
        );
        let balance_sheet = BalanceSheet::assemble(
            &ClosingBalances {
                cash: solved.closing_cash,
                gross_ppe: ppe.gross_ppe,
                accumulated_depreciation: ppe.accumulated_depreciation,
                debt: solved.closing_debt,
                share_capital: opening.share_capital,
                retained_earnings: opening.retained_earnings + profit_loss.net_income,
            },
            &wc,
        );
        let cash_flow = CashFlowStatement::assemble(
            opening.cash,
            profit_loss.net_income,
            ppe.depreciation,
            &wc_change,
            ppe.capex,
            &FinancingFlows::from_debt_change(opening.debt, solved.closing_debt),
        );

        self.record_warnings(drivers.year, &profit_loss, &solved.diagnostics);

        Ok(Period {
            year: drivers.year,
            window: drivers.window,
            immutable: false,
            students: drivers.students,
            average_tuition: drivers.average_tuition,
            profit_loss,
            balance_sheet,
            cash_flow,
            solver: Some(solved.diagnostics),
        })
    }

    fn record_warnings(&mut self, year: i32, pl: &ProfitLoss, diagnostics: &SolverDiagnostics) {
        if !diagnostics.converged {
            self.warnings.push(format!(
                "Year {year}: circular solver did not converge after {} iterations",
                diagnostics.iterations
            ));
        }
        if diagnostics.debt_plug_clamped {
            warn!("Year {year}: funding requirement negative, debt floored at zero");
            self.warnings.push(format!(
                "Year {year}: funding requirement negative; debt floored at zero"
            ));
        }
        if diagnostics.cash_shortfall {
            self.warnings.push(format!(
                "Year {year}: cash below minimum balance; no deposit interest earned"
            ));
        }
        if pl.total_revenue.is_zero() {
            self.warnings
                .push(format!("Year {year}: no revenue; all costs funded from cash and debt"));
        } else {
            let burden = safe_divide(pl.rent_expense, pl.total_revenue);
            if burden > RENT_BURDEN_WARNING {
                self.warnings.push(format!(
                    "Year {year}: rent is {:.1}% of revenue",
                    burden * dec!(100)
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// An actual year as reported, with a cash flow statement derived from the
/// movement against the previous actual year.
fn historical_period(actual: &HistoricalPeriod, prior: Option<&Period>) -> Period {
    let reported = &actual.profit_loss;
    let closing = &actual.balance_sheet;

    let lines = OperatingLines {
        tuition_revenue: reported.tuition_revenue,
        other_revenue: reported.other_revenue,
        rent_expense: reported.rent_expense,
        staff_costs: reported.staff_costs,
        other_operating_expenses: reported.other_operating_expenses,
        depreciation: reported.depreciation,
    };
    let profit_loss = ProfitLoss::assemble(
        &lines,
        reported.interest_expense,
        reported.interest_income,
        reported.zakat,
    );
    let wc = WorkingCapitalBalances {
        accounts_receivable: closing.accounts_receivable,
        prepaid_expenses: closing.prepaid_expenses,
        accounts_payable: closing.accounts_payable,
        accrued_expenses: closing.accrued_expenses,
        deferred_revenue: closing.deferred_revenue,
    };
    let balance_sheet = BalanceSheet::assemble(
        &ClosingBalances {
            cash: closing.cash,
            gross_ppe: closing.gross_ppe,
            accumulated_depreciation: closing.accumulated_depreciation,
            debt: closing.debt,
            share_capital: closing.share_capital,
            retained_earnings: closing.retained_earnings,
        },
        &wc,
    );

    let cash_flow = match prior {
        Some(prior) => {
            let opening = &prior.balance_sheet;
            let wc_change = WorkingCapitalChange::between(&opening.working_capital(), &wc);
            let capex = balance_sheet.net_ppe - opening.net_ppe + lines.depreciation;
            let mut financing = FinancingFlows::from_debt_change(opening.debt, balance_sheet.debt);
            financing.equity_movements = (balance_sheet.share_capital - opening.share_capital)
                + (balance_sheet.retained_earnings
                    - opening.retained_earnings
                    - profit_loss.net_income);
            CashFlowStatement::assemble(
                opening.cash,
                profit_loss.net_income,
                lines.depreciation,
                &wc_change,
                capex,
                &financing,
            )
        }
        None => {
            // No earlier sheet: movements are unknown, so opening cash is
            // backed out of the operating result.
            let flows = CashFlowStatement::assemble(
                Decimal::ZERO,
                profit_loss.net_income,
                lines.depreciation,
                &WorkingCapitalChange::default(),
                Decimal::ZERO,
                &FinancingFlows::default(),
            );
            CashFlowStatement::assemble(
                closing.cash - flows.net_change_in_cash,
                profit_loss.net_income,
                lines.depreciation,
                &WorkingCapitalChange::default(),
                Decimal::ZERO,
                &FinancingFlows::default(),
            )
        }
    };

    let average_tuition = actual.average_tuition.or_else(|| {
        actual
            .student_count
            .filter(|s| !s.is_zero())
            .map(|s| reported.tuition_revenue / s)
    });

    Period {
        year: actual.year,
        window: PeriodWindow::Historical,
        immutable: actual.immutable,
        students: actual.student_count,
        average_tuition,
        profit_loss,
        balance_sheet,
        cash_flow,
        solver: None,
    }
}

fn prior_drivers(prior: &Period) -> PriorDrivers {
    PriorDrivers {
        total_revenue: prior.profit_loss.total_revenue,
        rent_expense: prior.profit_loss.rent_expense,
        staff_costs: prior.profit_loss.staff_costs,
        other_operating_expenses: prior.profit_loss.other_operating_expenses,
        students: prior.students,
        average_tuition: prior.average_tuition,
    }
}
