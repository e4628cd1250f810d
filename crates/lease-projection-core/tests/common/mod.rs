#![allow(dead_code)]

use lease_projection_core::capex::depreciation::{AutoReinvestment, CapexConfig};
use lease_projection_core::config::{CircularSolverConfig, SystemConfig, ValidationConfig};
use lease_projection_core::projection::input::{
    DynamicPeriodConfig, EngineInput, HistoricalBalanceSheet, HistoricalPeriod,
    HistoricalProfitLoss, StaffCostConfig,
};
use lease_projection_core::rent::model::RentModel;
use lease_projection_core::revenue::enrollment::CurriculumTrack;
use lease_projection_core::revenue::transition::{TransitionDefaults, TransitionPeriod};
use lease_projection_core::working_capital::balances::WorkingCapitalRatios;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// FY2022 actuals. Assets 38.8M = liabilities 11.9M + debt 12M + equity 14.9M.
pub fn actual_2022() -> HistoricalPeriod {
    HistoricalPeriod {
        year: 2022,
        immutable: true,
        student_count: Some(dec!(1_450)),
        average_tuition: None,
        profit_loss: HistoricalProfitLoss {
            tuition_revenue: dec!(38_000_000),
            other_revenue: dec!(4_000_000),
            rent_expense: dec!(9_000_000),
            staff_costs: dec!(17_000_000),
            other_operating_expenses: dec!(4_200_000),
            depreciation: dec!(1_400_000),
            interest_expense: dec!(600_000),
            interest_income: dec!(20_000),
            zakat: dec!(250_000),
        },
        balance_sheet: HistoricalBalanceSheet {
            cash: dec!(6_000_000),
            accounts_receivable: dec!(4_200_000),
            prepaid_expenses: dec!(600_000),
            gross_ppe: dec!(40_000_000),
            accumulated_depreciation: dec!(12_000_000),
            accounts_payable: dec!(2_400_000),
            accrued_expenses: dec!(1_500_000),
            deferred_revenue: dec!(8_000_000),
            debt: dec!(12_000_000),
            share_capital: dec!(10_000_000),
            retained_earnings: dec!(4_900_000),
        },
    }
}

/// FY2023 actuals: revenue 45M, rent 9M. Net income 11.18M, 5M distributed.
pub fn actual_2023() -> HistoricalPeriod {
    HistoricalPeriod {
        year: 2023,
        immutable: true,
        student_count: Some(dec!(1_500)),
        average_tuition: None,
        profit_loss: HistoricalProfitLoss {
            tuition_revenue: dec!(40_000_000),
            other_revenue: dec!(5_000_000),
            rent_expense: dec!(9_000_000),
            staff_costs: dec!(18_000_000),
            other_operating_expenses: dec!(4_500_000),
            depreciation: dec!(1_500_000),
            interest_expense: dec!(550_000),
            interest_income: dec!(30_000),
            zakat: dec!(300_000),
        },
        balance_sheet: HistoricalBalanceSheet {
            cash: dec!(10_545_000),
            accounts_receivable: dec!(4_500_000),
            prepaid_expenses: dec!(630_000),
            gross_ppe: dec!(42_000_000),
            accumulated_depreciation: dec!(13_500_000),
            accounts_payable: dec!(2_520_000),
            accrued_expenses: dec!(1_575_000),
            deferred_revenue: dec!(9_000_000),
            debt: dec!(10_000_000),
            share_capital: dec!(10_000_000),
            retained_earnings: dec!(11_080_000),
        },
    }
}

fn growth_year(year: i32, growth: Decimal) -> TransitionPeriod {
    let mut period = TransitionPeriod::new(year);
    period.revenue_growth_rate = Some(growth);
    period
}

/// Two actual years, 2024-2026 bridging at 10-15% growth, and a thirty-year
/// dynamic window under fixed 10M rent escalating 3% a year.
pub fn campus_input() -> EngineInput {
    let baseline = actual_2023();
    let ratios = WorkingCapitalRatios::from_baseline(&baseline.baseline_year())
        .unwrap()
        .lock();

    EngineInput {
        system: SystemConfig::default(),
        solver: CircularSolverConfig::default(),
        validation: ValidationConfig::default(),
        working_capital: Some(ratios),
        transition_defaults: TransitionDefaults::default(),
        historical: vec![actual_2022(), baseline],
        transition: vec![
            growth_year(2024, dec!(0.10)),
            growth_year(2025, dec!(0.12)),
            growth_year(2026, dec!(0.15)),
        ],
        dynamic: DynamicPeriodConfig {
            years: 30,
            ramp_plan: None,
            curriculum: vec![
                CurriculumTrack {
                    name: "National".into(),
                    capacity: dec!(1_400),
                    base_tuition: dec!(32_000),
                    growth_rate: Some(dec!(0.03)),
                    growth_frequency: 2,
                },
                CurriculumTrack {
                    name: "International".into(),
                    capacity: dec!(700),
                    base_tuition: dec!(55_000),
                    growth_rate: Some(dec!(0.04)),
                    growth_frequency: 1,
                },
            ],
            staff: StaffCostConfig {
                base_annual_cost: dec!(5_000_000),
                cost_per_student: dec!(7_500),
                cpi_rate: dec!(0.02),
            },
            other_opex_ratio: dec!(0.08),
            rent_model: RentModel::FixedEscalation {
                base_rent: dec!(10_000_000),
                growth_rate: dec!(0.03),
                frequency: 1,
            },
            capex: CapexConfig {
                existing_asset_remaining_life: 12,
                manual: Vec::new(),
                auto_reinvestment: Some(AutoReinvestment {
                    frequency_years: 5,
                    amount: dec!(2_500_000),
                    escalation_rate: dec!(0.02),
                    useful_life_years: 10,
                }),
            },
        },
    }
}
