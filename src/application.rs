//! Per-device orchestration of the economizer diagnostics.
//!
//! One [`Application`] owns every piece of mutable state for a single air
//! handler: the five diagnostic windows, the sensor fault flag and the
//! pre-requisite tracker. Diagnose several units with several instances.

use log::Level;
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::config::{DeviceType, EconomizerType, PointNames, RcxConfig};
use crate::diagnostics::{
    Diagnostic, EconomizingWhenShould, EconomizingWhenShouldNot, ExcessOutdoorAir,
    InsufficientOutdoorAir, TemperatureSensor,
};
use crate::models::{
    DiagnosticInput, DiagnosticName, DiagnosticResult, FaultState, SensorSample,
};
use crate::points::{PointReadings, PointRole};
use crate::prerequisites::{PrerequisiteIssue, PrerequisiteTracker};
use crate::utils::format_datetime;

pub struct Application {
    config: RcxConfig,
    points: PointNames,
    temperature_sensor: TemperatureSensor,
    /// Diagnostics gated by the temperature sensor check, in dispatch order.
    diagnostics: Vec<Box<dyn Diagnostic + Send>>,
    fault: FaultState,
    prerequisites: PrerequisiteTracker,
}

impl Application {
    pub fn new(config: RcxConfig, points: PointNames) -> Self {
        let diagnostics: Vec<Box<dyn Diagnostic + Send>> = vec![
            Box::new(EconomizingWhenShould::new(&config)),
            Box::new(EconomizingWhenShouldNot::new(&config)),
            Box::new(ExcessOutdoorAir::new(&config)),
            Box::new(InsufficientOutdoorAir::new(&config)),
        ];
        Self {
            temperature_sensor: TemperatureSensor::new(&config),
            diagnostics,
            config,
            points,
            fault: FaultState::Unknown,
            prerequisites: PrerequisiteTracker::new(),
        }
    }

    pub fn config(&self) -> &RcxConfig {
        &self.config
    }

    pub fn fault_state(&self) -> FaultState {
        self.fault
    }

    /// Samples currently buffered by a diagnostic.
    pub fn buffered(&self, name: DiagnosticName) -> usize {
        if name == DiagnosticName::TemperatureSensor {
            return self.temperature_sensor.buffered();
        }
        self.diagnostics
            .iter()
            .find(|dx| dx.name() == name)
            .map(|dx| dx.buffered())
            .unwrap_or(0)
    }

    pub fn pending_prerequisite_calls(&self) -> usize {
        self.prerequisites.pending_calls()
    }

    /// Whether outdoor conditions favor free cooling under the configured strategy.
    pub fn economizing_condition(&self, oat: f64, rat: f64) -> bool {
        match self.config.economizer_type {
            EconomizerType::DifferentialDryBulb => oat < rat - self.config.temp_deadband,
            EconomizerType::HighLimit => oat < self.config.econ_hl_temp - self.config.temp_deadband,
        }
    }

    /// Run all diagnostics on one device scrape.
    pub fn run(
        &mut self,
        now: OffsetDateTime,
        points: &HashMap<String, Option<f64>>,
    ) -> DiagnosticResult {
        let readings = PointReadings::from_points(points, &self.points);
        self.run_readings(now, &readings)
    }

    pub fn run_readings(&mut self, now: OffsetDateTime, readings: &PointReadings) -> DiagnosticResult {
        let mut result = DiagnosticResult::new();

        let Some(sample) = self.check_prerequisites(now, readings, &mut result) else {
            return result;
        };

        if (sample.outdoor_air_temp - sample.return_air_temp).abs()
            < self.config.oaf_temperature_threshold
        {
            result.log(
                Level::Debug,
                format!(
                    "OAT and RAT are too close, economizer diagnostic will not use data corresponding to: {}",
                    format_datetime(&now)
                ),
            );
            return result;
        }

        let cooling_call = match &self.config.device_type {
            DeviceType::Ahu => readings
                .average(PointRole::CoolingCall)
                .map(|valve| valve > self.config.cooling_enabled_threshold)
                .unwrap_or(false),
            DeviceType::Rtu => readings
                .max(PointRole::CoolingCall)
                .map(|call| call.trunc() != 0.0)
                .unwrap_or(false),
            DeviceType::Unsupported(name) => {
                result.log(
                    Level::Info,
                    format!(
                        "device_type must be specified as \"AHU\" or \"RTU\", got \"{}\". Check configuration input.",
                        name
                    ),
                );
                return result;
            }
        };

        let input = DiagnosticInput {
            sample,
            cooling_call,
            economizing: self
                .economizing_condition(sample.outdoor_air_temp, sample.return_air_temp),
        };
        self.dispatch(&input, &mut result);
        result
    }

    fn dispatch(&mut self, input: &DiagnosticInput, result: &mut DiagnosticResult) {
        if let Some(state) = self.temperature_sensor.evaluate(input, self.fault, result) {
            self.fault = state;
            // A completed sensor analysis makes earlier pre-requisite issues stale
            self.prerequisites.reset();
        }

        if self.fault == FaultState::Clear {
            for dx in self.diagnostics.iter_mut() {
                dx.evaluate(input, result);
            }
        } else {
            for dx in self.diagnostics.iter_mut() {
                dx.clear();
            }
            self.fault = FaultState::Unknown;
        }
    }

    /// Resolve the fan state and the aggregated sample, or record why the
    /// current data cannot be used.
    fn check_prerequisites(
        &mut self,
        now: OffsetDateTime,
        readings: &PointReadings,
        result: &mut DiagnosticResult,
    ) -> Option<SensorSample> {
        let statuses = readings.values(PointRole::FanStatus);
        if statuses.iter().any(|status| status.trunc() == 0.0) {
            return self.skip(&[PrerequisiteIssue::SupplyFanOff], now, result);
        }
        let mut fan_known = !statuses.is_empty();

        let fan_speed = readings.average(PointRole::FanSpeed);
        if !fan_known && self.points.fan_speed.is_some() {
            if let Some(speed) = fan_speed {
                if speed < self.config.low_supply_fan_threshold {
                    return self.skip(&[PrerequisiteIssue::SupplyFanOff], now, result);
                }
                fan_known = true;
            }
        }
        if !fan_known {
            return self.skip(&[PrerequisiteIssue::FanStatusMissing], now, result);
        }

        let oat = readings.average(PointRole::OutdoorAirTemp);
        let rat = readings.average(PointRole::ReturnAirTemp);
        let mat = readings.average(PointRole::MixedAirTemp);
        let damper = readings.average(PointRole::DamperSignal);
        let cooling = readings.average(PointRole::CoolingCall);

        let mut missing = Vec::new();
        if oat.is_none() {
            missing.push(PrerequisiteIssue::OutdoorAirTempMissing);
        }
        if rat.is_none() {
            missing.push(PrerequisiteIssue::ReturnAirTempMissing);
        }
        if mat.is_none() {
            missing.push(PrerequisiteIssue::MixedAirTempMissing);
        }
        if damper.is_none() {
            missing.push(PrerequisiteIssue::DamperSignalMissing);
        }
        if cooling.is_none() {
            missing.push(PrerequisiteIssue::CoolingCallMissing);
        }
        let (Some(oat), Some(rat), Some(mat), Some(damper), Some(_)) = (oat, rat, mat, damper, cooling)
        else {
            return self.skip(&missing, now, result);
        };

        let c = &self.config;
        let mut out_of_range = Vec::new();
        if oat < c.oat_low_threshold || oat > c.oat_high_threshold {
            out_of_range.push(PrerequisiteIssue::OutdoorAirTempOutOfRange);
        }
        if rat < c.rat_low_threshold || rat > c.rat_high_threshold {
            out_of_range.push(PrerequisiteIssue::ReturnAirTempOutOfRange);
        }
        if mat < c.mat_low_threshold || mat > c.mat_high_threshold {
            out_of_range.push(PrerequisiteIssue::MixedAirTempOutOfRange);
        }
        if !out_of_range.is_empty() {
            return self.skip(&out_of_range, now, result);
        }

        Some(SensorSample {
            outdoor_air_temp: oat,
            return_air_temp: rat,
            mixed_air_temp: mat,
            damper_signal: damper,
            supply_fan_speed: fan_speed,
            timestamp: now,
        })
    }

    fn skip(
        &mut self,
        issues: &[PrerequisiteIssue],
        now: OffsetDateTime,
        result: &mut DiagnosticResult,
    ) -> Option<SensorSample> {
        for issue in issues {
            self.prerequisites.record(*issue);
        }
        self.prerequisites
            .flush_if_due(now, self.config.data_window, result);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    const START: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    fn readings(oat: f64, rat: f64, mat: f64, damper: f64, cooling: f64) -> PointReadings {
        PointReadings::new()
            .with(PointRole::FanStatus, 1.0)
            .with(PointRole::OutdoorAirTemp, oat)
            .with(PointRole::ReturnAirTemp, rat)
            .with(PointRole::MixedAirTemp, mat)
            .with(PointRole::DamperSignal, damper)
            .with(PointRole::CoolingCall, cooling)
    }

    fn app() -> Application {
        Application::new(RcxConfig::default(), PointNames::default())
    }

    #[test]
    fn fan_off_short_circuits() {
        let mut app = app();
        let off = PointReadings::new()
            .with(PointRole::FanStatus, 0.0)
            .with(PointRole::OutdoorAirTemp, 50.0);
        let result = app.run_readings(START, &off);
        assert!(result.verdicts.is_empty());
        assert_eq!(app.pending_prerequisite_calls(), 1);
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 0);
    }

    #[test]
    fn low_fan_speed_counts_as_off() {
        let mut app = app();
        let slow = PointReadings::new()
            .with(PointRole::FanSpeed, 10.0)
            .with(PointRole::OutdoorAirTemp, 50.0);
        app.run_readings(START, &slow);
        assert_eq!(app.pending_prerequisite_calls(), 1);
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 0);
    }

    #[test]
    fn fan_speed_substitutes_for_status() {
        let mut app = app();
        let mut running = PointReadings::new().with(PointRole::FanSpeed, 80.0);
        for (role, value) in [
            (PointRole::OutdoorAirTemp, 50.0),
            (PointRole::ReturnAirTemp, 75.0),
            (PointRole::MixedAirTemp, 70.0),
            (PointRole::DamperSignal, 20.0),
            (PointRole::CoolingCall, 0.0),
        ] {
            running.push(role, Some(value));
        }
        app.run_readings(START, &running);
        assert_eq!(app.pending_prerequisite_calls(), 0);
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 1);
    }

    #[test]
    fn missing_points_are_reported_after_a_window() {
        let mut app = app();
        let partial = PointReadings::new()
            .with(PointRole::FanStatus, 1.0)
            .with(PointRole::OutdoorAirTemp, 50.0);
        let mut messages = Vec::new();
        for minute in 0..=30 {
            let result = app.run_readings(START + Duration::minutes(minute), &partial);
            messages.extend(result.messages);
        }
        assert!(messages
            .iter()
            .any(|entry| entry.message.contains("mixed-air temperature")));
        assert_eq!(app.pending_prerequisite_calls(), 0);
    }

    #[test]
    fn out_of_range_sensor_short_circuits() {
        let mut app = app();
        app.run_readings(START, &readings(50.0, 75.0, 95.0, 20.0, 0.0));
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 0);
        assert_eq!(app.pending_prerequisite_calls(), 1);
    }

    #[test]
    fn close_oat_and_rat_are_not_used() {
        let mut app = app();
        let result = app.run_readings(START, &readings(73.0, 75.0, 74.0, 20.0, 0.0));
        assert!(result.has_message("OAT and RAT are too close"));
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 0);
        assert_eq!(app.pending_prerequisite_calls(), 0);
    }

    #[test]
    fn unsupported_device_type_short_circuits() {
        let mut app = Application::new(
            RcxConfig {
                device_type: DeviceType::from("vav"),
                ..RcxConfig::default()
            },
            PointNames::default(),
        );
        let result = app.run_readings(START, &readings(50.0, 75.0, 70.0, 20.0, 0.0));
        assert!(result.has_message("device_type must be specified"));
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 0);
    }

    #[test]
    fn infinite_open_damper_time_does_not_panic() {
        let mut app = Application::new(
            RcxConfig {
                open_damper_time: f64::INFINITY,
                ..RcxConfig::default()
            },
            PointNames::default(),
        );
        app.run_readings(START, &readings(50.0, 75.0, 52.0, 95.0, 0.0));
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 1);
    }

    #[test]
    fn economizing_condition_follows_strategy() {
        let ddb = app();
        assert!(ddb.economizing_condition(60.0, 75.0));
        assert!(!ddb.economizing_condition(74.5, 75.0));

        let hl = Application::new(
            RcxConfig {
                economizer_type: EconomizerType::HighLimit,
                econ_hl_temp: 65.0,
                ..RcxConfig::default()
            },
            PointNames::default(),
        );
        assert!(hl.economizing_condition(60.0, 55.0));
        assert!(hl.economizing_condition(60.0, 90.0));
        assert!(!hl.economizing_condition(64.5, 90.0));
    }

    #[test]
    fn unknown_sensor_state_keeps_other_windows_empty() {
        let mut app = app();
        for minute in 0..10 {
            app.run_readings(
                START + Duration::minutes(minute),
                &readings(50.0, 75.0, 70.0, 20.0, 0.0),
            );
        }
        assert_eq!(app.fault_state(), FaultState::Unknown);
        assert_eq!(app.buffered(DiagnosticName::TemperatureSensor), 10);
        assert_eq!(app.buffered(DiagnosticName::InsufficientOutdoorAir), 0);
    }
}
