//! What-if dials over a baseline engine input.
//!
//! A dial either scales (enrollment) or replaces (CPI, tuition growth, rent
//! escalation) the matching baseline fields. The baseline is never touched;
//! every scenario is evaluated on an independent copy and compared against
//! the baseline run.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::cache::store::FingerprintCache;
use crate::decimal::floor_units;
use crate::error::LeaseProjectionError;
use crate::projection::engine::CalculationEngineOutput;
use crate::projection::input::EngineInput;
use crate::revenue::enrollment::default_ramp_plan;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

const ENROLLMENT_BOUNDS: (Decimal, Decimal) = (dec!(0.5), dec!(1.5));
const CPI_BOUNDS: (Decimal, Decimal) = (dec!(0), dec!(0.10));
const TUITION_GROWTH_BOUNDS: (Decimal, Decimal) = (dec!(0), dec!(0.15));
const RENT_ESCALATION_BOUNDS: (Decimal, Decimal) = (dec!(0), dec!(0.10));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Scenario dials. Absent dials leave the baseline unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDials {
    /// Multiplier on baseline enrollment (1.0 = baseline).
    ///
    /// Scales the ramp plan, but occupancy is capped at full capacity, so a
    /// factor above 1 only lifts the years still below 100% occupancy.
    /// `run_scenario` warns with the years where the cap applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_factor: Option<Decimal>,
    /// Replaces the staff-cost CPI rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpi_rate: Option<Rate>,
    /// Replaces every curriculum track's tuition growth rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuition_growth_rate: Option<Rate>,
    /// Replaces the rent model's escalation rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_escalation_rate: Option<Rate>,
}

impl ScenarioDials {
    pub fn is_neutral(&self) -> bool {
        self.enrollment_factor.map_or(true, |f| f == Decimal::ONE)
            && self.cpi_rate.is_none()
            && self.tuition_growth_rate.is_none()
            && self.rent_escalation_rate.is_none()
    }

    pub fn validate(&self) -> LeaseProjectionResult<()> {
        check_bounds("dials.enrollment_factor", self.enrollment_factor, ENROLLMENT_BOUNDS)?;
        check_bounds("dials.cpi_rate", self.cpi_rate, CPI_BOUNDS)?;
        check_bounds("dials.tuition_growth_rate", self.tuition_growth_rate, TUITION_GROWTH_BOUNDS)?;
        check_bounds("dials.rent_escalation_rate", self.rent_escalation_rate, RENT_ESCALATION_BOUNDS)?;
        Ok(())
    }
}

/// Change in one aggregate metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub baseline: Money,
    pub scenario: Money,
    pub delta: Money,
    /// Relative change; zero when the baseline is zero
    pub delta_pct: Rate,
}

/// Year-by-year differences, scenario minus baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearDelta {
    pub year: i32,
    pub revenue_delta: Money,
    pub rent_delta: Money,
    pub net_income_delta: Money,
    pub cash_delta: Money,
    pub debt_delta: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub dials: ScenarioDials,
    pub metric_deltas: Vec<MetricDelta>,
    pub year_deltas: Vec<YearDelta>,
    pub baseline_valid: bool,
    pub scenario_valid: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Independent copy of `baseline` with the dials applied.
pub fn apply_scenario(baseline: &EngineInput, dials: &ScenarioDials) -> LeaseProjectionResult<EngineInput> {
    dials.validate()?;
    let mut scenario = baseline.clone();

    if let Some(factor) = dials.enrollment_factor {
        let ramp = scenario
            .dynamic
            .ramp_plan
            .take()
            .filter(|plan| !plan.is_empty())
            .unwrap_or_else(default_ramp_plan);
        // Occupancy is capped at full capacity when read
        scenario.dynamic.ramp_plan = Some(ramp.into_iter().map(|occ| occ * factor).collect());
        for period in &mut scenario.transition {
            if let Some(students) = period.student_count {
                period.student_count = Some(floor_units(students * factor));
            }
        }
    }
    if let Some(cpi) = dials.cpi_rate {
        scenario.dynamic.staff.cpi_rate = cpi;
    }
    if let Some(growth) = dials.tuition_growth_rate {
        for track in &mut scenario.dynamic.curriculum {
            track.growth_rate = Some(growth);
        }
    }
    if let Some(escalation) = dials.rent_escalation_rate {
        scenario.dynamic.rent_model = scenario.dynamic.rent_model.with_growth_rate(escalation);
    }
    Ok(scenario)
}

pub fn compare_outputs(
    dials: &ScenarioDials,
    baseline: &CalculationEngineOutput,
    scenario: &CalculationEngineOutput,
) -> ScenarioComparison {
    let b = &baseline.metrics;
    let s = &scenario.metrics;
    let metric_deltas = vec![
        metric_delta("total_rent", b.total_rent, s.total_rent),
        metric_delta("rent_npv", b.rent_npv, s.rent_npv),
        metric_delta("total_revenue", b.total_revenue, s.total_revenue),
        metric_delta("total_ebitda", b.total_ebitda, s.total_ebitda),
        metric_delta("total_net_income", b.total_net_income, s.total_net_income),
        metric_delta(
            "average_rent_to_revenue",
            b.average_rent_to_revenue,
            s.average_rent_to_revenue,
        ),
        metric_delta("peak_debt", b.peak_debt, s.peak_debt),
        metric_delta("terminal_cash", b.terminal_cash, s.terminal_cash),
    ];

    let year_deltas = baseline
        .periods
        .iter()
        .filter_map(|base| {
            scenario.period(base.year).map(|scen| YearDelta {
                year: base.year,
                revenue_delta: scen.profit_loss.total_revenue - base.profit_loss.total_revenue,
                rent_delta: scen.profit_loss.rent_expense - base.profit_loss.rent_expense,
                net_income_delta: scen.profit_loss.net_income - base.profit_loss.net_income,
                cash_delta: scen.balance_sheet.cash - base.balance_sheet.cash,
                debt_delta: scen.balance_sheet.debt - base.balance_sheet.debt,
            })
        })
        .collect();

    ScenarioComparison {
        dials: dials.clone(),
        metric_deltas,
        year_deltas,
        baseline_valid: baseline.validation.is_clean(),
        scenario_valid: scenario.validation.is_clean(),
    }
}

/// Run baseline and scenario through the cache and compare them.
pub fn run_scenario(
    cache: &FingerprintCache,
    baseline: &EngineInput,
    dials: &ScenarioDials,
    budget: Option<Duration>,
) -> LeaseProjectionResult<ComputationOutput<ScenarioComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let scenario = apply_scenario(baseline, dials)?;
    if dials.is_neutral() {
        warnings.push("No dials set; scenario equals baseline".into());
    }
    if let Some(factor) = dials.enrollment_factor.filter(|f| *f > Decimal::ONE) {
        let capped = saturated_years(&scenario);
        if !capped.is_empty() {
            warnings.push(format!(
                "Enrollment factor {factor} capped at full capacity in {}",
                year_ranges(&capped)
            ));
        }
    }

    let run = |input: &EngineInput| match budget {
        Some(b) => cache.run_with_deadline(input, b),
        None => cache.run(input),
    };
    let base_out = run(baseline)?;
    let scen_out = run(&scenario)?;

    let comparison = compare_outputs(dials, &base_out, &scen_out);
    if !comparison.scenario_valid {
        warnings.push("Scenario projection failed validation".into());
    }
    warnings.extend(scen_out.warnings.iter().cloned());

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Baseline vs. Scenario Lease Projection",
        dials,
        warnings,
        elapsed,
        comparison,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_bounds(field: &str, value: Option<Decimal>, (lo, hi): (Decimal, Decimal)) -> LeaseProjectionResult<()> {
    match value {
        Some(v) if v < lo || v > hi => Err(LeaseProjectionError::InvalidInput {
            field: field.into(),
            reason: format!("Must be between {lo} and {hi}, got {v}"),
        }),
        _ => Ok(()),
    }
}

/// Dynamic years whose scaled occupancy runs past full capacity.
fn saturated_years(scenario: &EngineInput) -> Vec<i32> {
    let ramp = scenario.dynamic.ramp_plan.as_deref().unwrap_or_default();
    let (Some(start), Some(last)) = (scenario.dynamic_start_year(), ramp.len().checked_sub(1)) else {
        return Vec::new();
    };
    (0..scenario.dynamic.years)
        .filter(|idx| ramp[(*idx as usize).min(last)] > Decimal::ONE)
        .map(|idx| start + idx as i32)
        .collect()
}

/// `[2030, 2031, 2032, 2040]` as `"2030-2032, 2040"`.
fn year_ranges(years: &[i32]) -> String {
    let mut ranges: Vec<(i32, i32)> = Vec::new();
    for &year in years {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == year => *end = year,
            _ => ranges.push((year, year)),
        }
    }
    ranges
        .iter()
        .map(|&(first, last)| {
            if first == last {
                first.to_string()
            } else {
                format!("{first}-{last}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn metric_delta(metric: &str, baseline: Money, scenario: Money) -> MetricDelta {
    let delta = scenario - baseline;
    MetricDelta {
        metric: metric.to_string(),
        baseline,
        scenario,
        delta,
        delta_pct: if baseline.is_zero() {
            Decimal::ZERO
        } else {
            delta / baseline.abs()
        },
    }
}
