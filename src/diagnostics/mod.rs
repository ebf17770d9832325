//! The five economizer retro-commissioning diagnostics.
//!
//! The temperature sensor check runs on every sample and decides whether the
//! remaining four may consume the data; those four share the [`Diagnostic`]
//! interface so the orchestrator can feed or clear them uniformly.

pub mod economizing_when_should;
pub mod economizing_when_should_not;
pub mod excess_outdoor_air;
pub mod insufficient_outdoor_air;
pub mod temperature_sensor;

pub use economizing_when_should::EconomizingWhenShould;
pub use economizing_when_should_not::EconomizingWhenShouldNot;
pub use excess_outdoor_air::ExcessOutdoorAir;
pub use insufficient_outdoor_air::InsufficientOutdoorAir;
pub use temperature_sensor::TemperatureSensor;

use log::Level;

use crate::models::{DiagnosticInput, DiagnosticName, DiagnosticResult, Verdict};

pub trait Diagnostic {
    fn name(&self) -> DiagnosticName;

    /// Buffer the sample if it qualifies and, once the window is ready,
    /// append and return a verdict. Buffers are empty afterwards.
    fn evaluate(&mut self, input: &DiagnosticInput, result: &mut DiagnosticResult)
        -> Option<Verdict>;

    /// Drop all buffered samples without producing a verdict.
    fn clear(&mut self);

    fn buffered(&self) -> usize;
}

/// What a diagnostic did with a buffered sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStatus {
    Collecting,
    Analyzed,
    /// The window closed but spanned more than `max_dx_time`.
    TooSparse,
}

impl SampleStatus {
    pub fn code(&self) -> u8 {
        match self {
            SampleStatus::Collecting => 0,
            SampleStatus::Analyzed => 1,
            SampleStatus::TooSparse => 2,
        }
    }
}

/// Log the raw values a diagnostic consumed together with its window status.
pub(crate) fn trace_sample(
    result: &mut DiagnosticResult,
    name: DiagnosticName,
    input: &DiagnosticInput,
    status: SampleStatus,
) {
    let sample = &input.sample;
    result.log(
        Level::Debug,
        format!(
            "{} data: OAT {:.1}, MAT {:.1}, RAT {:.1}, damper {:.1}, cooling {}, fan speed {}, status {}",
            name,
            sample.outdoor_air_temp,
            sample.mixed_air_temp,
            sample.return_air_temp,
            sample.damper_signal,
            input.cooling_call,
            sample
                .supply_fan_speed
                .map(|speed| format!("{:.1}", speed))
                .unwrap_or_else(|| "n/a".to_string()),
            status.code()
        ),
    );
}

/// Samples projected for the outdoor-air fraction based diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AirSample {
    pub oat: f64,
    pub rat: f64,
    pub mat: f64,
    pub damper: f64,
    pub fan_fraction: f64,
}

impl AirSample {
    pub fn from_input(input: &DiagnosticInput) -> Self {
        let sample = &input.sample;
        AirSample {
            oat: sample.outdoor_air_temp,
            rat: sample.return_air_temp,
            mat: sample.mixed_air_temp,
            damper: sample.damper_signal,
            fan_fraction: sample.fan_speed_fraction(),
        }
    }

    pub fn temperatures(&self) -> (f64, f64, f64) {
        (self.oat, self.rat, self.mat)
    }
}
