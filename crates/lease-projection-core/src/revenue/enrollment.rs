//! Enrollment ramp-up and curriculum-mix tuition revenue.
//!
//! Occupancy follows the ramp plan (held at its last value once the plan
//! runs out) and is applied to each track's capacity. Tuition escalates per
//! track in bands of `growth_frequency` years, mirroring rent escalation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{floor_units, grow, is_valid_growth};
use crate::error::LeaseProjectionError;
use crate::types::{Money, Rate};
use crate::LeaseProjectionResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_RAMP: [Decimal; 5] = [dec!(0.20), dec!(0.40), dec!(0.60), dec!(0.80), dec!(1.00)];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A curriculum offered by the school, with its own capacity and fee scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumTrack {
    pub name: String,
    /// Seats available at full occupancy
    pub capacity: Decimal,
    /// Annual tuition per student in the first dynamic year
    pub base_tuition: Money,
    /// Tuition step-up per growth band (none = flat fees)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<Rate>,
    /// Years per tuition growth band
    #[serde(default = "default_growth_frequency")]
    pub growth_frequency: u32,
}

fn default_growth_frequency() -> u32 {
    1
}

/// Students and tuition for one track in one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRevenue {
    pub name: String,
    pub students: Decimal,
    pub tuition: Money,
    pub revenue: Money,
}

/// Revenue build-up for a dynamic period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    pub occupancy: Rate,
    pub students: Decimal,
    pub tracks: Vec<TrackRevenue>,
    pub tuition_revenue: Money,
    pub other_revenue: Money,
    pub total_revenue: Money,
}

impl RevenueBreakdown {
    /// Student-weighted tuition across tracks (zero with no students).
    pub fn average_tuition(&self) -> Money {
        if self.students.is_zero() {
            Decimal::ZERO
        } else {
            self.tuition_revenue / self.students
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn default_ramp_plan() -> Vec<Rate> {
    DEFAULT_RAMP.to_vec()
}

/// Occupancy fraction for a dynamic period, capped at full capacity.
pub fn occupancy(ramp_plan: &[Rate], period_index: u32) -> Rate {
    let plan: &[Rate] = if ramp_plan.is_empty() {
        &DEFAULT_RAMP
    } else {
        ramp_plan
    };
    let idx = (period_index as usize).min(plan.len() - 1);
    plan[idx].min(Decimal::ONE).max(Decimal::ZERO)
}

pub fn total_capacity(tracks: &[CurriculumTrack]) -> Decimal {
    tracks.iter().map(|t| t.capacity).sum()
}

/// Tuition for a track at a zero-based dynamic period index.
pub fn track_tuition(track: &CurriculumTrack, period_index: u32) -> LeaseProjectionResult<Money> {
    match track.growth_rate {
        None => Ok(track.base_tuition),
        Some(growth) => {
            if track.growth_frequency == 0 {
                return Err(LeaseProjectionError::InvalidInput {
                    field: format!("curriculum.{}.growth_frequency", track.name),
                    reason: "Growth frequency must be at least one year".into(),
                });
            }
            let band = period_index / track.growth_frequency;
            grow(
                track.base_tuition,
                growth,
                band,
                &format!("curriculum.{}.growth_rate", track.name),
            )
        }
    }
}

/// Σ(track students × track tuition) plus the other-revenue uplift.
pub fn compute_period_revenue(
    tracks: &[CurriculumTrack],
    ramp_plan: &[Rate],
    other_revenue_ratio: Rate,
    period_index: u32,
) -> LeaseProjectionResult<RevenueBreakdown> {
    let occ = occupancy(ramp_plan, period_index);
    let mut rows = Vec::with_capacity(tracks.len());
    let mut students = Decimal::ZERO;
    let mut tuition_revenue = Decimal::ZERO;

    for track in tracks {
        let track_students = floor_units(track.capacity * occ);
        let tuition = track_tuition(track, period_index)?;
        let revenue = track_students * tuition;
        students += track_students;
        tuition_revenue += revenue;
        rows.push(TrackRevenue {
            name: track.name.clone(),
            students: track_students,
            tuition,
            revenue,
        });
    }

    let other_revenue = tuition_revenue * other_revenue_ratio;
    Ok(RevenueBreakdown {
        occupancy: occ,
        students,
        tracks: rows,
        tuition_revenue,
        other_revenue,
        total_revenue: tuition_revenue + other_revenue,
    })
}

pub fn validate_curriculum(tracks: &[CurriculumTrack], ramp_plan: &[Rate]) -> LeaseProjectionResult<()> {
    if tracks.is_empty() {
        return Err(LeaseProjectionError::InvalidInput {
            field: "dynamic.curriculum".into(),
            reason: "At least one curriculum track is required".into(),
        });
    }
    for track in tracks {
        if track.capacity < Decimal::ZERO {
            return Err(LeaseProjectionError::InvalidInput {
                field: format!("curriculum.{}.capacity", track.name),
                reason: format!("Capacity must be non-negative, got {}", track.capacity),
            });
        }
        if track.base_tuition < Decimal::ZERO {
            return Err(LeaseProjectionError::InvalidInput {
                field: format!("curriculum.{}.base_tuition", track.name),
                reason: format!("Tuition must be non-negative, got {}", track.base_tuition),
            });
        }
        if track.growth_rate.is_some() && track.growth_frequency == 0 {
            return Err(LeaseProjectionError::InvalidInput {
                field: format!("curriculum.{}.growth_frequency", track.name),
                reason: "Growth frequency must be at least one year".into(),
            });
        }
        if let Some(growth) = track.growth_rate.filter(|g| !is_valid_growth(*g)) {
            return Err(LeaseProjectionError::InvalidInput {
                field: format!("curriculum.{}.growth_rate", track.name),
                reason: format!("Growth must be greater than -100% and at most 100%, got {growth}"),
            });
        }
    }
    for (idx, fraction) in ramp_plan.iter().enumerate() {
        if *fraction < Decimal::ZERO {
            return Err(LeaseProjectionError::InvalidInput {
                field: format!("dynamic.ramp_plan[{idx}]"),
                reason: format!("Occupancy must be non-negative, got {fraction}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_tracks() -> Vec<CurriculumTrack> {
        vec![
            CurriculumTrack {
                name: "National".into(),
                capacity: dec!(1000),
                base_tuition: dec!(30_000),
                growth_rate: Some(dec!(0.05)),
                growth_frequency: 2,
            },
            CurriculumTrack {
                name: "International".into(),
                capacity: dec!(500),
                base_tuition: dec!(60_000),
                growth_rate: None,
                growth_frequency: 1,
            },
        ]
    }

    #[test]
    fn test_default_ramp_steps() {
        let plan = default_ramp_plan();
        assert_eq!(occupancy(&plan, 0), dec!(0.20));
        assert_eq!(occupancy(&plan, 3), dec!(0.80));
        assert_eq!(occupancy(&plan, 4), dec!(1.00));
        // Held at the last value
        assert_eq!(occupancy(&plan, 20), dec!(1.00));
    }

    #[test]
    fn test_empty_ramp_uses_default() {
        assert_eq!(occupancy(&[], 1), dec!(0.40));
    }

    #[test]
    fn test_occupancy_capped_at_full() {
        assert_eq!(occupancy(&[dec!(1.3)], 0), Decimal::ONE);
    }

    #[test]
    fn test_total_capacity() {
        assert_eq!(total_capacity(&sample_tracks()), dec!(1500));
    }

    #[test]
    fn test_tuition_growth_bands() {
        let tracks = sample_tracks();
        assert_eq!(track_tuition(&tracks[0], 0).unwrap(), dec!(30_000));
        assert_eq!(track_tuition(&tracks[0], 1).unwrap(), dec!(30_000));
        assert_eq!(track_tuition(&tracks[0], 2).unwrap(), dec!(31_500));
        assert_eq!(track_tuition(&tracks[1], 9).unwrap(), dec!(60_000));
    }

    #[test]
    fn test_first_year_revenue() {
        // 20% occupancy: 200 national at 30k + 100 international at 60k = 12M
        let rev = compute_period_revenue(&sample_tracks(), &[], dec!(0.05), 0).unwrap();
        assert_eq!(rev.students, dec!(300));
        assert_eq!(rev.tuition_revenue, dec!(12_000_000));
        assert_eq!(rev.other_revenue, dec!(600_000));
        assert_eq!(rev.total_revenue, dec!(12_600_000));
        assert_eq!(rev.average_tuition(), dec!(40_000));
    }

    #[test]
    fn test_students_floor_to_whole_units() {
        let tracks = vec![CurriculumTrack {
            name: "KG".into(),
            capacity: dec!(333),
            base_tuition: dec!(10_000),
            growth_rate: None,
            growth_frequency: 1,
        }];
        let rev = compute_period_revenue(&tracks, &[dec!(0.5)], Decimal::ZERO, 0).unwrap();
        assert_eq!(rev.students, dec!(166));
    }

    #[test]
    fn test_zero_enrollment_yields_zero_revenue() {
        let rev = compute_period_revenue(&sample_tracks(), &[Decimal::ZERO], dec!(0.05), 3).unwrap();
        assert_eq!(rev.students, Decimal::ZERO);
        assert_eq!(rev.total_revenue, Decimal::ZERO);
        assert_eq!(rev.average_tuition(), Decimal::ZERO);
    }

    #[test]
    fn test_validation_rejects_empty_curriculum() {
        assert!(validate_curriculum(&[], &[]).is_err());
        assert!(validate_curriculum(&sample_tracks(), &[dec!(-0.1)]).is_err());
        assert!(validate_curriculum(&sample_tracks(), &default_ramp_plan()).is_ok());
    }
}
