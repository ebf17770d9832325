/// Detects a unit that fails to economize while conditions favor free cooling
use log::Level;
use time::OffsetDateTime;

use crate::config::RcxConfig;
use crate::diagnostics::{trace_sample, AirSample, Diagnostic, SampleStatus};
use crate::energy::{average_oaf_percent, cooling_penalty, energy_impact};
use crate::models::{
    Color, DiagnosticCode, DiagnosticInput, DiagnosticName, DiagnosticResult, Verdict,
};
use crate::utils::{format_datetime, mean, minutes_between};
use crate::window::SampleWindow;

#[derive(Debug, Clone)]
pub struct EconomizingWhenShould {
    data_window: f64,
    no_required_data: usize,
    open_damper_threshold: f64,
    oaf_economizing_threshold: f64,
    rated_cfm: f64,
    eer: f64,
    max_dx_time: f64,
    window: SampleWindow<AirSample>,
    /// Timestamps of samples skipped because the unit was not cooling or
    /// conditions did not favor economizing.
    no_run: Vec<OffsetDateTime>,
}

impl EconomizingWhenShould {
    pub fn new(config: &RcxConfig) -> Self {
        Self {
            data_window: config.data_window,
            no_required_data: config.no_required_data,
            open_damper_threshold: config.open_damper_threshold,
            oaf_economizing_threshold: config.oaf_economizing_threshold,
            rated_cfm: config.rated_cfm,
            eer: config.eer,
            max_dx_time: config.max_dx_time,
            window: SampleWindow::new(),
            no_run: Vec::new(),
        }
    }

    fn skip(&mut self, reason: &str, now: OffsetDateTime, result: &mut DiagnosticResult) {
        result.log(
            Level::Debug,
            format!(
                "{}: {}, data corresponding to {} will not be used.",
                self.name(),
                reason,
                format_datetime(&now)
            ),
        );
        self.no_run.push(now);
        if let Some(first) = self.no_run.first() {
            if minutes_between(*first, now) >= self.data_window {
                result.log(
                    Level::Debug,
                    format!(
                        "{}: the unit is not cooling or economizing, keep collecting data.",
                        self.name()
                    ),
                );
                self.no_run.clear();
            }
        }
    }

    fn analyze(&mut self, now: OffsetDateTime, result: &mut DiagnosticResult) -> Verdict {
        let samples = self.window.values();
        let dampers: Vec<f64> = samples.iter().map(|s| s.damper).collect();
        let avg_damper = mean(&dampers).unwrap_or(0.0);
        let avg_oaf = average_oaf_percent(samples.iter().map(AirSample::temperatures));

        let (code, message) = if avg_damper < self.open_damper_threshold {
            (
                DiagnosticCode::DamperNotFullyOpen,
                "Conditions are favorable for economizing but the damper is frequently below 100% open.",
            )
        } else {
            match avg_oaf {
                Some(oaf) if (100.0 - oaf) <= self.oaf_economizing_threshold => {
                    (DiagnosticCode::EconomizingCorrectly, "No problems detected.")
                }
                _ => (
                    DiagnosticCode::OutdoorAirFractionTooLow,
                    "Conditions are favorable for economizing and the damper is 100% open but the OAF indicates the unit is not bringing in near 100% OA.",
                ),
            }
        };

        let impact = if code.color() == Color::Red {
            let penalties: Vec<f64> = samples
                .iter()
                .filter(|s| s.mat - s.oat > 0.0)
                .map(|s| cooling_penalty(s.fan_fraction, self.rated_cfm, s.mat - s.oat, self.eer))
                .collect();
            energy_impact(&penalties, self.window.average_step_minutes())
        } else {
            0.0
        };

        let verdict = Verdict::new(self.name(), code, message, impact, now);
        result.insert_verdict(verdict.clone());
        self.clear();
        verdict
    }
}

impl Diagnostic for EconomizingWhenShould {
    fn name(&self) -> DiagnosticName {
        DiagnosticName::EconomizingWhenShould
    }

    fn evaluate(
        &mut self,
        input: &DiagnosticInput,
        result: &mut DiagnosticResult,
    ) -> Option<Verdict> {
        let now = input.sample.timestamp;
        if !input.cooling_call {
            self.skip("the unit is not cooling", now, result);
            return None;
        }
        if !input.economizing {
            self.skip("conditions are not favorable for economizing", now, result);
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
                DiagnosticCode::EconomizingInconclusive,
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
