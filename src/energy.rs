//! Mixing-box mass balance and energy penalty arithmetic shared by the
//! economizer diagnostics.

use crate::utils::{mean, round_significant};

/// Sensible heat factor for standard air (Btu/h per cfm per °F).
const SENSIBLE_HEAT_FACTOR: f64 = 1.08;

/// Lower bound of plausible outdoor-air fraction (%).
pub const MIN_PLAUSIBLE_OAF: f64 = 0.0;
/// Upper bound of plausible outdoor-air fraction (%).
pub const MAX_PLAUSIBLE_OAF: f64 = 125.0;

/// Fraction of supply air that is outdoor air for one sample.
///
/// None when OAT and RAT coincide and the mixing balance is undefined.
pub fn sample_oaf(oat: f64, rat: f64, mat: f64) -> Option<f64> {
    let denominator = oat - rat;
    if denominator.abs() < f64::EPSILON {
        return None;
    }
    Some((mat - rat) / denominator)
}

/// Mean outdoor-air fraction in percent over `(oat, rat, mat)` triples.
pub fn average_oaf_percent<I>(samples: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64, f64)>,
{
    let fractions: Vec<f64> = samples
        .into_iter()
        .filter_map(|(oat, rat, mat)| sample_oaf(oat, rat, mat))
        .collect();
    mean(&fractions).map(|oaf| oaf * 100.0)
}

pub fn oaf_is_plausible(oaf_percent: f64) -> bool {
    (MIN_PLAUSIBLE_OAF..=MAX_PLAUSIBLE_OAF).contains(&oaf_percent)
}

/// Mixed-air temperature expected at the desired outdoor-air fraction.
pub fn blended_setpoint(oat: f64, rat: f64, desired_oaf_fraction: f64) -> f64 {
    oat * desired_oaf_fraction + rat * (1.0 - desired_oaf_fraction)
}

/// Cooling energy rate (kWh) attributable to a temperature excess at one sample.
pub fn cooling_penalty(fan_fraction: f64, rated_cfm: f64, delta_t: f64, eer: f64) -> f64 {
    SENSIBLE_HEAT_FACTOR * fan_fraction * rated_cfm * delta_t / (1000.0 * eer)
}

/// Convert per-sample penalties into kWh/h, rounded to two significant figures.
pub fn energy_impact(penalties: &[f64], average_step_minutes: f64) -> f64 {
    if penalties.is_empty() {
        return 0.0;
    }
    let count = penalties.len() as f64;
    let dx_time = if penalties.len() > 1 {
        (count - 1.0) * average_step_minutes
    } else {
        1.0
    };
    let impact = penalties.iter().sum::<f64>() * 60.0 / (count * dx_time);
    round_significant(impact, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn oaf_from_mixing_balance() {
        assert_relative_eq!(sample_oaf(50.0, 75.0, 72.5).unwrap(), 0.1);
        assert_eq!(sample_oaf(70.0, 70.0, 70.0), None);
        let avg = average_oaf_percent(vec![(50.0, 75.0, 50.0), (50.0, 75.0, 75.0)]).unwrap();
        assert_relative_eq!(avg, 50.0);
        assert_eq!(average_oaf_percent(Vec::new()), None);
    }

    #[test]
    fn plausibility_bounds_are_inclusive() {
        assert!(oaf_is_plausible(0.0));
        assert!(oaf_is_plausible(125.0));
        assert!(!oaf_is_plausible(-0.1));
        assert!(!oaf_is_plausible(125.5));
    }

    #[test]
    fn blended_setpoint_weights_outdoor_air() {
        assert_relative_eq!(blended_setpoint(50.0, 75.0, 0.1), 72.5);
    }

    #[test]
    fn single_penalty_uses_unit_time() {
        // 1.08 * 1000 * 10 / 10000 = 1.08 kWh, * 60 / 1 = 64.8 -> 65
        let penalty = cooling_penalty(1.0, 1000.0, 10.0, 10.0);
        assert_relative_eq!(penalty, 1.08);
        assert_relative_eq!(energy_impact(&[penalty], 1.0), 65.0);
    }

    #[test]
    fn penalties_are_spread_over_the_window() {
        // three samples one minute apart: 3.24 * 60 / (3 * 2) = 32.4 -> 32
        let penalties = [1.08, 1.08, 1.08];
        assert_relative_eq!(energy_impact(&penalties, 1.0), 32.0);
        assert_eq!(energy_impact(&[], 1.0), 0.0);
    }
}
