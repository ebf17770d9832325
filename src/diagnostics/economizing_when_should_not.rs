/// Detects an outdoor-air damper held open while conditions do not favor economizing
use log::Level;
use time::OffsetDateTime;

use crate::config::RcxConfig;
use crate::diagnostics::{trace_sample, AirSample, Diagnostic, SampleStatus};
use crate::energy::{blended_setpoint, cooling_penalty, energy_impact};
use crate::models::{DiagnosticCode, DiagnosticInput, DiagnosticName, DiagnosticResult, Verdict};
use crate::utils::{format_datetime, mean};
use crate::window::SampleWindow;

#[derive(Debug, Clone)]
pub struct EconomizingWhenShouldNot {
    data_window: f64,
    no_required_data: usize,
    minimum_damper_setpoint: f64,
    excess_damper_threshold: f64,
    desired_oaf: f64,
    rated_cfm: f64,
    eer: f64,
    max_dx_time: f64,
    window: SampleWindow<AirSample>,
}

impl EconomizingWhenShouldNot {
    pub fn new(config: &RcxConfig) -> Self {
        Self {
            data_window: config.data_window,
            no_required_data: config.no_required_data,
            minimum_damper_setpoint: config.minimum_damper_setpoint,
            excess_damper_threshold: config.excess_damper_threshold,
            desired_oaf: config.desired_oaf,
            rated_cfm: config.rated_cfm,
            eer: config.eer,
            max_dx_time: config.max_dx_time,
            window: SampleWindow::new(),
        }
    }

    fn analyze(&mut self, now: OffsetDateTime, result: &mut DiagnosticResult) -> Verdict {
        let samples = self.window.values();
        let dampers: Vec<f64> = samples.iter().map(|s| s.damper).collect();
        let avg_damper = mean(&dampers).unwrap_or(0.0);

        let verdict = if avg_damper - self.minimum_damper_setpoint > self.excess_damper_threshold {
            let desired = self.desired_oaf / 100.0;
            let penalties: Vec<f64> = samples
                .iter()
                .filter_map(|s| {
                    let excess = s.mat - blended_setpoint(s.oat, s.rat, desired);
                    (excess > 0.0)
                        .then(|| cooling_penalty(s.fan_fraction, self.rated_cfm, excess, self.eer))
                })
                .collect();
            Verdict::new(
                self.name(),
                DiagnosticCode::DamperAboveMinimumWhenNotEconomizing,
                "The outdoor-air damper should be at the minimum position but is significantly above that value.",
                energy_impact(&penalties, self.window.average_step_minutes()),
                now,
            )
        } else {
            Verdict::new(
                self.name(),
                DiagnosticCode::NotEconomizingCorrectly,
                "No problems detected.",
                0.0,
                now,
            )
        };

        result.insert_verdict(verdict.clone());
        self.clear();
        verdict
    }
}

impl Diagnostic for EconomizingWhenShouldNot {
    fn name(&self) -> DiagnosticName {
        DiagnosticName::EconomizingWhenShouldNot
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
                DiagnosticCode::NotEconomizingInconclusive,
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
