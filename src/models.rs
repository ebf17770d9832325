use log::Level;
use std::fmt;
use time::OffsetDateTime;

/// One aggregated reading of the air-side HVAC points for a single timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub outdoor_air_temp: f64,
    pub return_air_temp: f64,
    pub mixed_air_temp: f64,
    pub damper_signal: f64,
    /// Supply fan speed command in percent, when the unit reports one.
    pub supply_fan_speed: Option<f64>,
    pub timestamp: OffsetDateTime,
}

impl SensorSample {
    /// Supply fan speed as a fraction of full speed; 1.0 for constant-volume units.
    pub fn fan_speed_fraction(&self) -> f64 {
        self.supply_fan_speed.map(|speed| speed / 100.0).unwrap_or(1.0)
    }
}

/// Everything a diagnostic needs for one timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosticInput {
    pub sample: SensorSample,
    pub cooling_call: bool,
    pub economizing: bool,
}

/// The five economizer diagnostics, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticName {
    TemperatureSensor,
    EconomizingWhenShould,
    EconomizingWhenShouldNot,
    ExcessOutdoorAir,
    InsufficientOutdoorAir,
}

impl DiagnosticName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticName::TemperatureSensor => "Temperature Sensor Dx",
            DiagnosticName::EconomizingWhenShould => "Economizing When Unit Should Dx",
            DiagnosticName::EconomizingWhenShouldNot => "Economizing When Unit Should Not Dx",
            DiagnosticName::ExcessOutdoorAir => "Excess Outdoor-air Intake Dx",
            DiagnosticName::InsufficientOutdoorAir => "Insufficient Outdoor-air Intake Dx",
        }
    }
}

impl fmt::Display for DiagnosticName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display color attached to every verdict row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Green,
    Red,
    Grey,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Green => "GREEN",
            Color::Red => "RED",
            Color::Grey => "GREY",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric diagnostic codes.
///
/// The integer part identifies the diagnostic family, the first decimal the
/// outcome: `.0` no fault, `.1` fault, `.2` inconclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Temperature sensor
    SensorsConsistent,
    OpenDamperOatMatInconsistent,
    MixedAirBelowOutdoorAndReturn,
    MixedAirAboveOutdoorAndReturn,
    SensorInconclusive,
    // Economizing when the unit should
    EconomizingCorrectly,
    DamperNotFullyOpen,
    OutdoorAirFractionTooLow,
    EconomizingInconclusive,
    // Economizing when the unit should not
    NotEconomizingCorrectly,
    DamperAboveMinimumWhenNotEconomizing,
    NotEconomizingInconclusive,
    // Excess outdoor air
    OutdoorAirWithinLimits,
    ExcessOutdoorAirUnexpectedFraction,
    ExcessDamperPosition,
    ExcessOutdoorAirFraction,
    ExcessDamperAndOutdoorAir,
    ExcessOutdoorAirInconclusive,
    // Insufficient outdoor air
    VentilationAdequate,
    InsufficientOutdoorAirUnexpectedFraction,
    DamperBelowMinimum,
    InsufficientOutdoorAirFraction,
    InsufficientOutdoorAirInconclusive,
}

impl DiagnosticCode {
    pub fn value(&self) -> f64 {
        match self {
            DiagnosticCode::SensorsConsistent => 0.0,
            DiagnosticCode::OpenDamperOatMatInconsistent => 0.1,
            DiagnosticCode::MixedAirBelowOutdoorAndReturn => 1.1,
            DiagnosticCode::MixedAirAboveOutdoorAndReturn => 2.1,
            DiagnosticCode::SensorInconclusive => 3.2,
            DiagnosticCode::EconomizingCorrectly => 10.0,
            DiagnosticCode::DamperNotFullyOpen => 11.1,
            DiagnosticCode::OutdoorAirFractionTooLow => 12.1,
            DiagnosticCode::EconomizingInconclusive => 13.2,
            DiagnosticCode::NotEconomizingCorrectly => 20.0,
            DiagnosticCode::DamperAboveMinimumWhenNotEconomizing => 21.1,
            DiagnosticCode::NotEconomizingInconclusive => 23.2,
            DiagnosticCode::OutdoorAirWithinLimits => 30.0,
            DiagnosticCode::ExcessOutdoorAirUnexpectedFraction => 31.2,
            DiagnosticCode::ExcessDamperPosition => 32.1,
            DiagnosticCode::ExcessOutdoorAirFraction => 33.1,
            DiagnosticCode::ExcessDamperAndOutdoorAir => 34.1,
            DiagnosticCode::ExcessOutdoorAirInconclusive => 35.2,
            DiagnosticCode::VentilationAdequate => 40.0,
            DiagnosticCode::InsufficientOutdoorAirUnexpectedFraction => 41.2,
            DiagnosticCode::DamperBelowMinimum => 42.1,
            DiagnosticCode::InsufficientOutdoorAirFraction => 43.1,
            DiagnosticCode::InsufficientOutdoorAirInconclusive => 44.2,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            DiagnosticCode::SensorsConsistent
            | DiagnosticCode::EconomizingCorrectly
            | DiagnosticCode::NotEconomizingCorrectly
            | DiagnosticCode::OutdoorAirWithinLimits
            | DiagnosticCode::VentilationAdequate => Color::Green,
            DiagnosticCode::SensorInconclusive
            | DiagnosticCode::EconomizingInconclusive
            | DiagnosticCode::NotEconomizingInconclusive
            | DiagnosticCode::ExcessOutdoorAirUnexpectedFraction
            | DiagnosticCode::ExcessOutdoorAirInconclusive
            | DiagnosticCode::InsufficientOutdoorAirUnexpectedFraction
            | DiagnosticCode::InsufficientOutdoorAirInconclusive => Color::Grey,
            _ => Color::Red,
        }
    }
}

/// A diagnostic result row, immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub diagnostic: DiagnosticName,
    pub code: DiagnosticCode,
    pub message: String,
    pub color: Color,
    /// Estimated energy penalty in kWh per hour of operation.
    pub energy_impact: f64,
    pub timestamp: OffsetDateTime,
}

impl Verdict {
    pub fn new(
        diagnostic: DiagnosticName,
        code: DiagnosticCode,
        message: impl Into<String>,
        energy_impact: f64,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            diagnostic,
            code,
            message: message.into(),
            color: code.color(),
            energy_impact,
            timestamp,
        }
    }
}

/// Sensor fault status shared between the temperature sensor diagnostic and
/// the orchestrator for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultState {
    #[default]
    Unknown,
    Faulted,
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Output of one orchestrator call: verdict rows plus log lines.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    pub verdicts: Vec<Verdict>,
    pub messages: Vec<LogEntry>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a log line and forward it to the logging facade.
    pub fn log(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        log::log!(level, "{}", message);
        self.messages.push(LogEntry { level, message });
    }

    /// Append a verdict row, logging its message at INFO.
    pub fn insert_verdict(&mut self, verdict: Verdict) {
        self.log(
            Level::Info,
            format!("{}: {}", verdict.diagnostic, verdict.message),
        );
        self.verdicts.push(verdict);
    }

    pub fn verdicts_for(&self, diagnostic: DiagnosticName) -> impl Iterator<Item = &Verdict> {
        self.verdicts
            .iter()
            .filter(move |verdict| verdict.diagnostic == diagnostic)
    }

    pub fn has_message(&self, needle: &str) -> bool {
        self.messages.iter().any(|entry| entry.message.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn code_suffix_determines_color() {
        assert_eq!(DiagnosticCode::SensorsConsistent.color(), Color::Green);
        assert_eq!(DiagnosticCode::MixedAirAboveOutdoorAndReturn.color(), Color::Red);
        assert_eq!(DiagnosticCode::ExcessDamperAndOutdoorAir.color(), Color::Red);
        assert_eq!(DiagnosticCode::InsufficientOutdoorAirUnexpectedFraction.color(), Color::Grey);
        assert_eq!(DiagnosticCode::SensorInconclusive.value(), 3.2);
    }

    #[test]
    fn fan_speed_defaults_to_full() {
        let mut sample = SensorSample {
            outdoor_air_temp: 50.0,
            return_air_temp: 75.0,
            mixed_air_temp: 60.0,
            damper_signal: 40.0,
            supply_fan_speed: None,
            timestamp: datetime!(2024-06-01 12:00 UTC),
        };
        assert_eq!(sample.fan_speed_fraction(), 1.0);
        sample.supply_fan_speed = Some(60.0);
        assert_eq!(sample.fan_speed_fraction(), 0.6);
    }

    #[test]
    fn result_records_log_lines() {
        let mut result = DiagnosticResult::new();
        result.log(Level::Debug, "OAT and RAT are too close");
        assert!(result.has_message("too close"));
        assert!(result.verdicts.is_empty());
    }
}
