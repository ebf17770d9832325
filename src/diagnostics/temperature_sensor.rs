/// Outdoor, return and mixed-air temperature sensor consistency check
use log::Level;
use time::OffsetDateTime;

use crate::config::RcxConfig;
use crate::diagnostics::{trace_sample, SampleStatus};
use crate::models::{
    DiagnosticCode, DiagnosticInput, DiagnosticName, DiagnosticResult, FaultState, Verdict,
};
use crate::utils::{mean, minutes_between};
use crate::window::SampleWindow;

/// Gap between samples (minutes) that breaks a steady-state open-damper run.
const MAX_SAMPLE_GAP_MINUTES: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Temperatures {
    oat: f64,
    rat: f64,
    mat: f64,
}

#[derive(Debug, Clone)]
pub struct TemperatureSensor {
    data_window: f64,
    no_required_data: usize,
    temp_difference_threshold: f64,
    oat_mat_check: f64,
    temp_damper_threshold: f64,
    /// Minutes the damper must stay open before pairs are collected.
    open_damper_delay: f64,
    max_dx_time: f64,
    window: SampleWindow<Temperatures>,
    /// (OAT, MAT) pairs taken while the damper was steadily near fully open.
    open_damper: Vec<(f64, f64)>,
    steady_state_start: Option<OffsetDateTime>,
}

impl TemperatureSensor {
    pub fn new(config: &RcxConfig) -> Self {
        Self {
            data_window: config.data_window,
            no_required_data: config.no_required_data,
            temp_difference_threshold: config.temp_difference_threshold,
            oat_mat_check: config.oat_mat_check,
            temp_damper_threshold: config.temp_damper_threshold,
            open_damper_delay: config.open_damper_time - 1.0,
            max_dx_time: config.max_dx_time,
            window: SampleWindow::new(),
            open_damper: Vec::new(),
            steady_state_start: None,
        }
    }

    pub fn name(&self) -> DiagnosticName {
        DiagnosticName::TemperatureSensor
    }

    /// Feed one sample.
    ///
    /// Returns the updated sensor fault state when a window was analyzed, None
    /// while data is still being collected or when the window was too sparse
    /// to analyze.
    pub fn evaluate(
        &mut self,
        input: &DiagnosticInput,
        fault: FaultState,
        result: &mut DiagnosticResult,
    ) -> Option<FaultState> {
        let sample = &input.sample;
        let now = sample.timestamp;

        if let Some(last) = self.window.last_timestamp() {
            if minutes_between(last, now) > MAX_SAMPLE_GAP_MINUTES {
                self.steady_state_start = None;
            }
        }

        if sample.damper_signal > self.temp_damper_threshold {
            let start = *self.steady_state_start.get_or_insert(now);
            if minutes_between(start, now) >= self.open_damper_delay {
                self.open_damper
                    .push((sample.outdoor_air_temp, sample.mixed_air_temp));
            }
        } else {
            self.steady_state_start = None;
        }

        self.window.append(
            now,
            Temperatures {
                oat: sample.outdoor_air_temp,
                rat: sample.return_air_temp,
                mat: sample.mixed_air_temp,
            },
        );

        if !self.window.ready(self.data_window, self.no_required_data) {
            trace_sample(result, self.name(), input, SampleStatus::Collecting);
            return None;
        }

        if self.window.elapsed_minutes() > self.max_dx_time {
            result.insert_verdict(Verdict::new(
                self.name(),
                DiagnosticCode::SensorInconclusive,
                "Data window spans too long a period, the diagnostic was inconclusive.",
                0.0,
                now,
            ));
            self.clear();
            trace_sample(result, self.name(), input, SampleStatus::TooSparse);
            return None;
        }

        let state = self.analyze(fault, now, result);
        trace_sample(result, self.name(), input, SampleStatus::Analyzed);
        Some(state)
    }

    fn analyze(
        &mut self,
        fault: FaultState,
        now: OffsetDateTime,
        result: &mut DiagnosticResult,
    ) -> FaultState {
        let values = self.window.values();
        let oa_minus_ma: Vec<f64> = values.iter().map(|t| t.oat - t.mat).collect();
        let ra_minus_ma: Vec<f64> = values.iter().map(|t| t.rat - t.mat).collect();
        let avg_oa_ma = mean(&oa_minus_ma).unwrap_or(0.0);
        let avg_ra_ma = mean(&ra_minus_ma).unwrap_or(0.0);
        let (avg_ma_oa, avg_ma_ra) = (-avg_oa_ma, -avg_ra_ma);
        let threshold = self.temp_difference_threshold;
        let mut state = fault;

        if self.open_damper.len() > self.no_required_data {
            let diffs: Vec<f64> = self
                .open_damper
                .iter()
                .map(|(oat, mat)| (oat - mat).abs())
                .collect();
            let open_damper_check = mean(&diffs).unwrap_or(0.0);
            if open_damper_check > self.oat_mat_check {
                state = FaultState::Faulted;
                result.insert_verdict(Verdict::new(
                    self.name(),
                    DiagnosticCode::OpenDamperOatMatInconsistent,
                    "The OAT and MAT sensor readings are not consistent when the outdoor-air damper is fully open.",
                    0.0,
                    now,
                ));
            }
            self.open_damper.clear();
        }

        let (code, message, next) = if avg_oa_ma > threshold && avg_ra_ma > threshold {
            (
                DiagnosticCode::MixedAirBelowOutdoorAndReturn,
                "Temperature sensor problem detected. Mixed-air temperature is less than outdoor-air and return-air temperature.",
                FaultState::Faulted,
            )
        } else if avg_ma_oa > threshold && avg_ma_ra > threshold {
            (
                DiagnosticCode::MixedAirAboveOutdoorAndReturn,
                "Temperature sensor problem detected. Mixed-air temperature is greater than outdoor-air and return-air temperature.",
                FaultState::Faulted,
            )
        } else if state != FaultState::Faulted {
            (
                DiagnosticCode::SensorsConsistent,
                "No problems were detected.",
                FaultState::Clear,
            )
        } else {
            (
                DiagnosticCode::SensorInconclusive,
                "Diagnostic was inconclusive.",
                FaultState::Clear,
            )
        };

        result.log(
            Level::Debug,
            format!(
                "{}: mean OAT-MAT {:.2}, RAT-MAT {:.2} over {} samples",
                self.name(),
                avg_oa_ma,
                avg_ra_ma,
                self.window.len()
            ),
        );
        result.insert_verdict(Verdict::new(self.name(), code, message, 0.0, now));
        self.window.clear();
        next
    }

    /// Drop the main window. The open-damper pairs survive until the next analysis.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn buffered(&self) -> usize {
        self.window.len()
    }

    pub fn open_damper_pairs(&self) -> usize {
        self.open_damper.len()
    }
}
