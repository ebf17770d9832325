/// Detects over-ventilation while the unit is not economizing
use log::Level;
use time::OffsetDateTime;

use crate::config::RcxConfig;
use crate::diagnostics::{trace_sample, AirSample, Diagnostic, SampleStatus};
use crate::energy::{
    average_oaf_percent, blended_setpoint, cooling_penalty, energy_impact, oaf_is_plausible,
};
use crate::models::{DiagnosticCode, DiagnosticInput, DiagnosticName, DiagnosticResult, Verdict};
use crate::utils::{format_datetime, mean};
use crate::window::SampleWindow;

const EXCESS_DAMPER_MESSAGE: &str =
    "The damper should be at the minimum position for ventilation but is significantly higher than this value.";
const EXCESS_OAF_MESSAGE: &str =
    "Excess outdoor-air is being provided, this could increase heating and cooling energy consumption.";

#[derive(Debug, Clone)]
pub struct ExcessOutdoorAir {
    data_window: f64,
    no_required_data: usize,
    excess_oaf_threshold: f64,
    minimum_damper_setpoint: f64,
    excess_damper_threshold: f64,
    desired_oaf: f64,
    rated_cfm: f64,
    eer: f64,
    max_dx_time: f64,
    window: SampleWindow<AirSample>,
}

impl ExcessOutdoorAir {
    pub fn new(config: &RcxConfig) -> Self {
        Self {
            data_window: config.data_window,
            no_required_data: config.no_required_data,
            excess_oaf_threshold: config.excess_oaf_threshold,
            minimum_damper_setpoint: config.minimum_damper_setpoint,
            excess_damper_threshold: config.excess_damper_threshold,
            desired_oaf: config.desired_oaf,
            rated_cfm: config.rated_cfm,
            eer: config.eer,
            max_dx_time: config.max_dx_time,
            window: SampleWindow::new(),
        }
    }

    fn excess_air_impact(&self) -> f64 {
        let desired = self.desired_oaf / 100.0;
        let penalties: Vec<f64> = self
            .window
            .values()
            .iter()
            .filter_map(|s| {
                let excess = s.mat - blended_setpoint(s.oat, s.rat, desired);
                (excess > 0.0)
                    .then(|| cooling_penalty(s.fan_fraction, self.rated_cfm, excess, self.eer))
            })
            .collect();
        energy_impact(&penalties, self.window.average_step_minutes())
    }

    fn analyze(&mut self, now: OffsetDateTime, result: &mut DiagnosticResult) -> Verdict {
        let samples = self.window.values();
        let dampers: Vec<f64> = samples.iter().map(|s| s.damper).collect();
        let avg_damper = mean(&dampers).unwrap_or(0.0);
        let avg_oaf = average_oaf_percent(samples.iter().map(AirSample::temperatures))
            .filter(|oaf| oaf_is_plausible(*oaf));

        let verdict = match avg_oaf {
            None => Verdict::new(
                self.name(),
                DiagnosticCode::ExcessOutdoorAirUnexpectedFraction,
                "Inconclusive result, the OAF calculation led to an unexpected value.",
                0.0,
                now,
            ),
            Some(avg_oaf) => {
                let damper_fault =
                    avg_damper - self.minimum_damper_setpoint > self.excess_damper_threshold;
                let oaf_fault = avg_oaf - self.desired_oaf > self.excess_oaf_threshold;
                result.log(
                    Level::Debug,
                    format!(
                        "{}: average OAF {:.1}%, average damper {:.1}%",
                        self.name(),
                        avg_oaf,
                        avg_damper
                    ),
                );

                let mut message = String::new();
                let mut code = DiagnosticCode::OutdoorAirWithinLimits;
                let mut impact = 0.0;
                if damper_fault {
                    message.push_str(EXCESS_DAMPER_MESSAGE);
                    code = DiagnosticCode::ExcessDamperPosition;
                    impact = self.excess_air_impact();
                }
                if oaf_fault {
                    code = if damper_fault {
                        message.push(' ');
                        DiagnosticCode::ExcessDamperAndOutdoorAir
                    } else {
                        DiagnosticCode::ExcessOutdoorAirFraction
                    };
                    message.push_str(EXCESS_OAF_MESSAGE);
                    // recomputed, not accumulated, when both checks fire
                    impact = self.excess_air_impact();
                }
                if message.is_empty() {
                    message
                        .push_str("The calculated outdoor-air fraction is within configured limits.");
                }
                Verdict::new(self.name(), code, message, impact, now)
            }
        };

        result.insert_verdict(verdict.clone());
        self.clear();
        verdict
    }
}

impl Diagnostic for ExcessOutdoorAir {
    fn name(&self) -> DiagnosticName {
        DiagnosticName::ExcessOutdoorAir
    }

    fn evaluate(
        &mut self,
        input: &DiagnosticInput,
        result: &mut DiagnosticResult,
    ) -> Option<Verdict> {
        let now = input.sample.timestamp;
        if input.economizing {
            result.log(
                Level::Debug,
                format!(
                    "{}: the unit may be economizing, data corresponding to {} will not be used.",
                    self.name(),
                    format_datetime(&now)
                ),
            );
            return None;
        }

        self.window.append(now, AirSample::from_input(input));
        if !self.window.ready(self.data_window, self.no_required_data) {
            trace_sample(result, self.name(), input, SampleStatus::Collecting);
            return None;
        }

        if self.window.elapsed_minutes() > self.max_dx_time {
            let verdict = Verdict::new(
                self.name(),
                DiagnosticCode::ExcessOutdoorAirInconclusive,
                "Data window spans too long a period, the diagnostic was inconclusive.",
                0.0,
                now,
            );
            result.insert_verdict(verdict.clone());
            self.clear();
            trace_sample(result, self.name(), input, SampleStatus::TooSparse);
            return Some(verdict);
        }

        let verdict = self.analyze(now, result);
        trace_sample(result, self.name(), input, SampleStatus::Analyzed);
        Some(verdict)
    }

    fn clear(&mut self) {
        self.window.clear();
    }

    fn buffered(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::test_support::input_at;
    use crate::models::Color;
    use approx::assert_relative_eq;

    fn feed(dx: &mut ExcessOutdoorAir, oat: f64, mat: f64, damper: f64) -> Verdict {
        let mut result = DiagnosticResult::new();
        let mut verdict = None;
        for minute in 0..31 {
            verdict = dx.evaluate(&input_at(minute, oat, 75.0, mat, damper), &mut result);
        }
        verdict.expect("window should close after 30 minutes")
    }

    #[test]
    fn both_checks_fire_and_combine() {
        let mut dx = ExcessOutdoorAir::new(&RcxConfig::default());
        // OAF = (85 - 75) / (95 - 75) = 50%
        let verdict = feed(&mut dx, 95.0, 85.0, 60.0);
        assert_eq!(verdict.code, DiagnosticCode::ExcessDamperAndOutdoorAir);
        assert!(verdict.message.contains("minimum position"));
        assert!(verdict.message.contains("Excess outdoor-air"));
        // blended target 77, MAT 8 above it at every sample
        assert_relative_eq!(verdict.energy_impact, 1.7);
        assert_eq!(dx.buffered(), 0);
    }

    #[test]
    fn damper_only_fault() {
        let mut dx = ExcessOutdoorAir::new(&RcxConfig::default());
        // OAF = 10%, damper well above minimum
        let verdict = feed(&mut dx, 95.0, 77.0, 60.0);
        assert_eq!(verdict.code, DiagnosticCode::ExcessDamperPosition);
    }

    #[test]
    fn oaf_only_fault() {
        let mut dx = ExcessOutdoorAir::new(&RcxConfig::default());
        let verdict = feed(&mut dx, 95.0, 85.0, 20.0);
        assert_eq!(verdict.code, DiagnosticCode::ExcessOutdoorAirFraction);
        assert_eq!(verdict.color, Color::Red);
    }

    #[test]
    fn within_limits_is_green() {
        let mut dx = ExcessOutdoorAir::new(&RcxConfig::default());
        let verdict = feed(&mut dx, 95.0, 77.0, 20.0);
        assert_eq!(verdict.code, DiagnosticCode::OutdoorAirWithinLimits);
        assert_eq!(verdict.energy_impact, 0.0);
    }

    #[test]
    fn implausible_oaf_is_inconclusive() {
        let mut dx = ExcessOutdoorAir::new(&RcxConfig::default());
        // MAT below both OAT and RAT gives a negative fraction
        let verdict = feed(&mut dx, 95.0, 70.0, 60.0);
        assert_eq!(verdict.code, DiagnosticCode::ExcessOutdoorAirUnexpectedFraction);
        assert_eq!(verdict.color, Color::Grey);
        assert_eq!(verdict.energy_impact, 0.0);
        assert_eq!(dx.buffered(), 0);
    }
}
