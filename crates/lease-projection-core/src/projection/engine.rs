//! Single entry point: one validated input in, one complete projection out.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::decimal::round_money;
use crate::projection::input::EngineInput;
use crate::projection::metrics::{compute_metrics, AggregateMetrics};
use crate::projection::sequencer::PeriodSequencer;
use crate::projection::statements::Period;
use crate::types::PeriodWindow;
use crate::validation::checker::{validate_periods, ValidationSummary};
use crate::LeaseProjectionResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceCounters {
    pub elapsed_us: u64,
    pub period_count: usize,
    pub solver_iterations: u64,
}

/// Full result of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationEngineOutput {
    pub periods: Vec<Period>,
    pub metrics: AggregateMetrics,
    pub validation: ValidationSummary,
    pub warnings: Vec<String>,
    pub performance: PerformanceCounters,
    pub calculated_at: DateTime<Utc>,
}

impl CalculationEngineOutput {
    /// Equality of everything derived from the input; timings and the
    /// timestamp are ignored.
    pub fn same_content(&self, other: &Self) -> bool {
        self.periods == other.periods
            && self.metrics == other.metrics
            && self.validation == other.validation
            && self.warnings == other.warnings
    }

    pub fn period(&self, year: i32) -> Option<&Period> {
        self.periods.iter().find(|p| p.year == year)
    }

    pub fn window(&self, window: PeriodWindow) -> impl Iterator<Item = &Period> {
        self.periods.iter().filter(move |p| p.window == window)
    }
}

/// Run the full projection synchronously.
///
/// Pure with respect to its input: the same input always yields the same
/// periods, metrics, validation and warnings.
pub fn run_projection(input: &EngineInput) -> LeaseProjectionResult<CalculationEngineOutput> {
    let start = Instant::now();

    let sequenced = PeriodSequencer::new(input)?.run()?;
    let metrics = compute_metrics(&sequenced.periods, input.system.discount_rate())?;
    let validation = validate_periods(&sequenced.periods, input.validation.tolerance);

    let mut warnings = sequenced.warnings;
    if !validation.all_periods_balanced {
        warnings.push(format!(
            "Balance sheet out of tolerance in years {:?} (largest gap {})",
            validation.imbalanced_periods,
            round_money(validation.max_balance_difference)
        ));
    }
    if !validation.all_cash_flows_reconciled {
        warnings.push(format!(
            "Cash flow does not reconcile in years {:?} (largest gap {})",
            validation.unreconciled_periods,
            round_money(validation.max_cash_reconciliation_difference)
        ));
    }

    let elapsed_us = start.elapsed().as_micros() as u64;
    info!(
        "Projected {} periods in {elapsed_us}us ({} solver iterations)",
        sequenced.periods.len(),
        sequenced.solver_iterations
    );

    Ok(CalculationEngineOutput {
        performance: PerformanceCounters {
            elapsed_us,
            period_count: sequenced.periods.len(),
            solver_iterations: sequenced.solver_iterations,
        },
        periods: sequenced.periods,
        metrics,
        validation,
        warnings,
        calculated_at: Utc::now(),
    })
}
