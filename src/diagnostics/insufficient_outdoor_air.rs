/// Detects under-ventilation; uses every sample regardless of economizer state
use time::OffsetDateTime;

use crate::config::RcxConfig;
use crate::diagnostics::{trace_sample, AirSample, Diagnostic, SampleStatus};
use crate::energy::{average_oaf_percent, oaf_is_plausible};
use crate::models::{DiagnosticCode, DiagnosticInput, DiagnosticName, DiagnosticResult, Verdict};
use crate::utils::mean;
use crate::window::SampleWindow;

#[derive(Debug, Clone)]
pub struct InsufficientOutdoorAir {
    data_window: f64,
    no_required_data: usize,
    ventilation_oaf_threshold: f64,
    minimum_damper_setpoint: f64,
    insufficient_damper_threshold: f64,
    desired_oaf: f64,
    max_dx_time: f64,
    window: SampleWindow<AirSample>,
}

impl InsufficientOutdoorAir {
    pub fn new(config: &RcxConfig) -> Self {
        Self {
            data_window: config.data_window,
            no_required_data: config.no_required_data,
            ventilation_oaf_threshold: config.ventilation_oaf_threshold,
            minimum_damper_setpoint: config.minimum_damper_setpoint,
            insufficient_damper_threshold: config.insufficient_damper_threshold,
            desired_oaf: config.desired_oaf,
            max_dx_time: config.max_dx_time,
            window: SampleWindow::new(),
        }
    }

    fn analyze(&mut self, now: OffsetDateTime, result: &mut DiagnosticResult) -> Verdict {
        let samples = self.window.values();
        let dampers: Vec<f64> = samples.iter().map(|s| s.damper).collect();
        let avg_damper = mean(&dampers).unwrap_or(0.0);
        let avg_oaf = average_oaf_percent(samples.iter().map(AirSample::temperatures))
            .filter(|oaf| oaf_is_plausible(*oaf));

        // Ventilation shortfall carries no energy penalty
        let (code, message) = match avg_oaf {
            None => (
                DiagnosticCode::InsufficientOutdoorAirUnexpectedFraction,
                "Inconclusive result, the OAF calculation led to an unexpected value.",
            ),
            Some(_) if self.minimum_damper_setpoint - avg_damper
                > self.insufficient_damper_threshold =>
            {
                (
                    DiagnosticCode::DamperBelowMinimum,
                    "Outdoor-air damper is significantly below the minimum configured damper position.",
                )
            }
            Some(oaf) if self.desired_oaf - oaf > self.ventilation_oaf_threshold => (
                DiagnosticCode::InsufficientOutdoorAirFraction,
                "Insufficient outdoor-air is being provided for ventilation.",
            ),
            Some(_) => (
                DiagnosticCode::VentilationAdequate,
                "The calculated outdoor-air fraction was within acceptable limits.",
            ),
        };

        let verdict = Verdict::new(self.name(), code, message, 0.0, now);
        result.insert_verdict(verdict.clone());
        self.clear();
        verdict
    }
}

impl Diagnostic for InsufficientOutdoorAir {
    fn name(&self) -> DiagnosticName {
        DiagnosticName::InsufficientOutdoorAir
    }

    fn evaluate(
        &mut self,
        input: &DiagnosticInput,
        result: &mut DiagnosticResult,
    ) -> Option<Verdict> {
        let now = input.sample.timestamp;
        self.window.append(now, AirSample::from_input(input));
        if !self.window.ready(self.data_window, self.no_required_data) {
            trace_sample(result, self.name(), input, SampleStatus::Collecting);
            return None;
        }

        if self.window.elapsed_minutes() > self.max_dx_time {
            let verdict = Verdict::new(
                self.name(),
                DiagnosticCode::InsufficientOutdoorAirInconclusive,
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

    fn feed(dx: &mut InsufficientOutdoorAir, mat: f64, damper: f64, economizing: bool) -> Verdict {
        let mut result = DiagnosticResult::new();
        let mut verdict = None;
        for minute in 0..31 {
            let mut input = input_at(minute, 95.0, 75.0, mat, damper);
            input.economizing = economizing;
            verdict = dx.evaluate(&input, &mut result);
        }
        verdict.expect("window should close after 30 minutes")
    }

    #[test]
    fn low_fraction_is_reported() {
        let mut dx = InsufficientOutdoorAir::new(&RcxConfig::default());
        // OAF = 0.6 / 20 = 3%
        let verdict = feed(&mut dx, 75.6, 15.0, false);
        assert_eq!(verdict.code, DiagnosticCode::InsufficientOutdoorAirFraction);
        assert_eq!(verdict.color, Color::Red);
        assert_eq!(verdict.energy_impact, 0.0);
    }

    #[test]
    fn damper_below_minimum_wins() {
        let mut dx = InsufficientOutdoorAir::new(&RcxConfig {
            minimum_damper_setpoint: 20.0,
            insufficient_damper_threshold: 10.0,
            ..RcxConfig::default()
        });
        let verdict = feed(&mut dx, 75.6, 5.0, true);
        assert_eq!(verdict.code, DiagnosticCode::DamperBelowMinimum);
    }

    #[test]
    fn adequate_ventilation_is_green() {
        let mut dx = InsufficientOutdoorAir::new(&RcxConfig::default());
        let verdict = feed(&mut dx, 77.0, 15.0, true);
        assert_eq!(verdict.code, DiagnosticCode::VentilationAdequate);
        assert_eq!(dx.buffered(), 0);
    }

    #[test]
    fn implausible_fraction_is_grey() {
        let mut dx = InsufficientOutdoorAir::new(&RcxConfig::default());
        // MAT far above OAT: fraction of 150%
        let verdict = feed(&mut dx, 105.0, 15.0, false);
        assert_eq!(verdict.code, DiagnosticCode::InsufficientOutdoorAirUnexpectedFraction);
        assert_eq!(verdict.color, Color::Grey);
    }
}
