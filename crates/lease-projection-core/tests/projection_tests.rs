mod common;

use common::campus_input;
use lease_projection_core::projection::engine::run_projection;
use lease_projection_core::projection::input::parse_engine_input;
use lease_projection_core::rent::model::{rent_schedule, RentModel, RentScheduleInput};
use lease_projection_core::revenue::transition::TransitionPeriod;
use lease_projection_core::{run_with_deadline, LeaseProjectionError, PeriodWindow};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

// ===========================================================================
// Reference projection
// ===========================================================================

#[test]
fn test_reference_projection_shape() {
    let out = run_projection(&campus_input()).unwrap();
    assert_eq!(out.periods.len(), 35);
    assert_eq!(out.periods.first().map(|p| p.year), Some(2022));
    assert_eq!(out.periods.last().map(|p| p.year), Some(2056));
    assert_eq!(out.window(PeriodWindow::Historical).count(), 2);
    assert_eq!(out.window(PeriodWindow::Transition).count(), 3);
    assert_eq!(out.window(PeriodWindow::Dynamic).count(), 30);
}

#[test]
fn test_reference_projection_balances_and_reconciles() {
    let out = run_projection(&campus_input()).unwrap();
    assert!(out.validation.all_periods_balanced, "{:?}", out.validation.imbalanced_periods);
    assert!(
        out.validation.all_cash_flows_reconciled,
        "{:?}",
        out.validation.unreconciled_periods
    );
    assert!(out.validation.all_periods_converged);
    for period in &out.periods {
        assert!(
            period.balance_sheet.balance_difference().abs() <= dec!(1),
            "Year {}: off by {}",
            period.year,
            period.balance_sheet.balance_difference()
        );
    }
}

#[test]
fn test_each_year_opens_from_prior_close() {
    let out = run_projection(&campus_input()).unwrap();
    for pair in out.periods.windows(2) {
        assert_eq!(pair[1].cash_flow.beginning_cash, pair[0].balance_sheet.cash);
        let retained = pair[0].balance_sheet.retained_earnings + pair[1].profit_loss.net_income;
        if pair[1].window != PeriodWindow::Historical {
            assert_eq!(pair[1].balance_sheet.retained_earnings, retained);
        }
    }
}

#[test]
fn test_cash_never_below_minimum_in_projected_years() {
    let input = campus_input();
    let out = run_projection(&input).unwrap();
    for period in out.periods.iter().filter(|p| p.window != PeriodWindow::Historical) {
        assert!(period.balance_sheet.cash >= input.system.min_cash_balance);
        assert!(period.balance_sheet.debt >= Decimal::ZERO);
    }
}

#[test]
fn test_historical_years_untouched() {
    let input = campus_input();
    let out = run_projection(&input).unwrap();
    for (actual, period) in input.historical.iter().zip(&out.periods) {
        assert!(period.immutable);
        assert_eq!(period.balance_sheet.cash, actual.balance_sheet.cash);
        assert_eq!(period.balance_sheet.debt, actual.balance_sheet.debt);
        assert_eq!(period.profit_loss.tuition_revenue, actual.profit_loss.tuition_revenue);
        assert_eq!(period.profit_loss.zakat, actual.profit_loss.zakat);
    }
}

#[test]
fn test_dynamic_rent_follows_fixed_escalation() {
    let out = run_projection(&campus_input()).unwrap();
    let rents: Vec<Decimal> = out
        .window(PeriodWindow::Dynamic)
        .map(|p| p.profit_loss.rent_expense)
        .collect();
    assert_eq!(rents[0], dec!(10_000_000));
    assert_eq!(rents[1], dec!(10_300_000));
    assert_eq!(rents[2], dec!(10_609_000));
    assert_eq!(out.metrics.total_rent, rents.iter().sum::<Decimal>());
}

#[test]
fn test_zakat_never_negative() {
    let out = run_projection(&campus_input()).unwrap();
    for period in &out.periods {
        assert!(period.profit_loss.zakat >= Decimal::ZERO);
        if period.profit_loss.ebt <= Decimal::ZERO {
            assert_eq!(period.profit_loss.zakat, Decimal::ZERO);
        }
    }
}

// ===========================================================================
// Idempotence
// ===========================================================================

#[test]
fn test_same_input_same_content() {
    let input = campus_input();
    let a = run_projection(&input).unwrap();
    let b = run_projection(&input).unwrap();
    assert_eq!(a.periods, b.periods);
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.validation, b.validation);
    assert_eq!(a.warnings, b.warnings);
}

#[test]
fn test_json_round_trip_projects_identically() {
    let input = campus_input();
    let json = serde_json::to_string(&input).unwrap();
    let parsed = parse_engine_input(&json).unwrap();
    let a = run_projection(&input).unwrap();
    let b = run_projection(&parsed).unwrap();
    assert!(a.same_content(&b));
}

// ===========================================================================
// Degenerate but valid business conditions
// ===========================================================================

#[test]
fn test_zero_enrollment_degrades_gracefully() {
    let mut input = campus_input();
    input.dynamic.ramp_plan = Some(vec![Decimal::ZERO]);
    let out = run_projection(&input).unwrap();
    assert_eq!(out.periods.len(), 35);
    for period in out.window(PeriodWindow::Dynamic) {
        assert_eq!(period.profit_loss.total_revenue, Decimal::ZERO);
        assert_eq!(period.students, Some(Decimal::ZERO));
        assert_eq!(period.balance_sheet.accounts_receivable, Decimal::ZERO, "Year {}", period.year);
    }
    assert!(out.validation.all_periods_balanced);
    assert!(out.validation.all_cash_flows_reconciled);
    assert!(out.metrics.peak_debt > Decimal::ZERO);
    assert_eq!(out.metrics.average_rent_to_revenue, Decimal::ZERO);
    assert!(out.warnings.iter().any(|w| w.contains("no revenue")));
}

#[test]
fn test_zero_enrollment_under_revenue_share_pays_no_rent() {
    let mut input = campus_input();
    input.dynamic.ramp_plan = Some(vec![Decimal::ZERO]);
    input.dynamic.rent_model = RentModel::RevenueShare { percent: dec!(0.15) };
    let out = run_projection(&input).unwrap();
    for period in out.window(PeriodWindow::Dynamic) {
        assert_eq!(period.profit_loss.rent_expense, Decimal::ZERO, "Year {}", period.year);
        assert_eq!(period.balance_sheet.accounts_receivable, Decimal::ZERO);
    }
    assert_eq!(out.metrics.total_rent, Decimal::ZERO);
    assert!(out.validation.all_periods_balanced);
    assert!(out.validation.all_cash_flows_reconciled);
}

#[test]
fn test_full_revenue_share_degrades_gracefully() {
    let mut input = campus_input();
    input.dynamic.rent_model = RentModel::RevenueShare { percent: dec!(1) };
    let out = run_projection(&input).unwrap();
    for period in out.window(PeriodWindow::Dynamic) {
        assert_eq!(period.profit_loss.rent_expense, period.profit_loss.total_revenue);
    }
    assert!(out.validation.all_periods_balanced);
    assert!(out.validation.all_cash_flows_reconciled);
    assert!(out.warnings.iter().any(|w| w.contains("rent is 100.0% of revenue")));
}

#[test]
fn test_partner_investment_rent() {
    let mut input = campus_input();
    input.dynamic.rent_model = RentModel::PartnerInvestment {
        land_size: dec!(20_000),
        land_price_per_sqm: dec!(1_500),
        bua_size: dec!(15_000),
        construction_cost_per_sqm: dec!(3_000),
        yield_rate: dec!(0.08),
        growth_rate: dec!(0.025),
        frequency: 5,
    };
    let out = run_projection(&input).unwrap();
    let dynamic: Vec<_> = out.window(PeriodWindow::Dynamic).collect();
    // 8% of (30M land + 45M construction)
    assert_eq!(dynamic[0].profit_loss.rent_expense, dec!(6_000_000));
    assert_eq!(dynamic[4].profit_loss.rent_expense, dec!(6_000_000));
    assert_eq!(dynamic[5].profit_loss.rent_expense, dec!(6_150_000));
    assert!(out.validation.all_periods_balanced);
}

#[test]
fn test_iteration_cap_flags_but_completes() {
    let mut input = campus_input();
    input.solver.max_iterations = 1;
    input.solver.convergence_tolerance = dec!(0.000001);
    let out = run_projection(&input).unwrap();
    assert_eq!(out.periods.len(), 35);
    assert!(!out.validation.all_periods_converged);
    assert!(!out.validation.unconverged_periods.is_empty());
    assert!(out.warnings.iter().any(|w| w.contains("did not converge")));
    // Closing balances still come from the funding identity
    assert!(out.validation.all_periods_balanced);
}

#[test]
fn test_no_transition_window() {
    let mut input = campus_input();
    input.transition.clear();
    let out = run_projection(&input).unwrap();
    assert_eq!(out.periods.len(), 32);
    assert_eq!(out.periods[2].year, 2024);
    assert_eq!(out.periods[2].window, PeriodWindow::Dynamic);
}

// ===========================================================================
// Configuration errors
// ===========================================================================

#[test]
fn test_unknown_rent_model_is_fatal() {
    let mut value = serde_json::to_value(campus_input()).unwrap();
    value["dynamic"]["rent_model"] = serde_json::json!({"model": "GroundLease", "base_rent": "1"});
    let err = parse_engine_input(&value.to_string()).unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_RENT_MODEL");
    assert!(err.is_configuration_error());
    assert!(!err.is_retryable());
}

#[test]
fn test_missing_working_capital_baseline() {
    let mut input = campus_input();
    input.working_capital = None;
    let err = run_projection(&input).unwrap_err();
    assert_eq!(err.code(), "MISSING_BASELINE");
}

#[test]
fn test_runaway_growth_rates_are_input_errors() {
    let mut rent = campus_input();
    rent.dynamic.rent_model = RentModel::FixedEscalation {
        base_rent: dec!(10_000_000),
        growth_rate: dec!(5),
        frequency: 1,
    };
    let mut tuition = campus_input();
    tuition.dynamic.curriculum[1].growth_rate = Some(dec!(5));
    let mut cpi = campus_input();
    cpi.dynamic.staff.cpi_rate = dec!(5);
    let mut capex = campus_input();
    if let Some(auto) = capex.dynamic.capex.auto_reinvestment.as_mut() {
        auto.escalation_rate = dec!(5);
    }

    let cases = [
        ("rent_model.growth_rate", rent),
        ("curriculum.International.growth_rate", tuition),
        ("dynamic.staff.cpi_rate", cpi),
        ("capex.auto_reinvestment.escalation_rate", capex),
    ];
    for (expected, input) in cases {
        match run_projection(&input).unwrap_err() {
            LeaseProjectionError::InvalidInput { field, .. } => assert_eq!(field, expected),
            e => panic!("Expected InvalidInput for {expected}, got {e:?}"),
        }
    }
}

#[test]
fn test_rent_schedule_overflow_is_an_error() {
    // Within the annual cap but compounded past the decimal range
    let err = rent_schedule(&RentScheduleInput {
        rent_model: RentModel::FixedEscalation {
            base_rent: dec!(1),
            growth_rate: dec!(1),
            frequency: 1,
        },
        years: 100,
        start_year: 2027,
        revenues: None,
    })
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn test_transition_must_follow_actuals() {
    let mut input = campus_input();
    input.transition.insert(0, TransitionPeriod::new(2023));
    match run_projection(&input).unwrap_err() {
        LeaseProjectionError::InvalidSequence(_) => {}
        e => panic!("Expected InvalidSequence, got {e:?}"),
    }
}

// ===========================================================================
// Supplementary entry points
// ===========================================================================

#[test]
fn test_deadline_run_matches_direct_run() {
    let input = campus_input();
    let direct = run_projection(&input).unwrap();
    let budgeted = run_with_deadline(&input, Duration::from_secs(30)).unwrap();
    assert!(direct.same_content(&budgeted));
}

#[test]
fn test_rent_schedule_matches_engine() {
    let input = campus_input();
    let out = run_projection(&input).unwrap();
    let schedule = rent_schedule(&RentScheduleInput {
        rent_model: input.dynamic.rent_model.clone(),
        years: 30,
        start_year: 2027,
        revenues: None,
    })
    .unwrap();
    assert_eq!(schedule.result.rows.len(), 30);
    assert_eq!(schedule.result.total_rent, out.metrics.total_rent);
    assert_eq!(schedule.result.rows[0].year, 2027);
}

#[test]
fn test_demo_input_matches_fixture() {
    let json = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/campus.json"));
    let parsed = parse_engine_input(json).unwrap();
    assert_eq!(parsed, campus_input());
}
