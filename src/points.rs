//! Mapping of raw device points onto the roles the diagnostics understand.

use std::collections::HashMap;

use crate::config::PointNames;
use crate::utils::mean;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointRole {
    FanStatus,
    FanSpeed,
    OutdoorAirTemp,
    ReturnAirTemp,
    MixedAirTemp,
    DamperSignal,
    CoolingCall,
}

impl PointNames {
    /// Role of a lower-cased point name, first matching prefix wins.
    ///
    /// The order matches the way overlapping prefixes were resolved in the
    /// deployed agents: damper, OAT, MAT, RAT, cooling, then fan speed.
    pub fn classify(&self, name: &str) -> Option<PointRole> {
        if name.starts_with(&self.fan_status) {
            return Some(PointRole::FanStatus);
        }
        let ordered = [
            (Some(&self.damper_signal), PointRole::DamperSignal),
            (Some(&self.outdoor_air_temp), PointRole::OutdoorAirTemp),
            (Some(&self.mixed_air_temp), PointRole::MixedAirTemp),
            (Some(&self.return_air_temp), PointRole::ReturnAirTemp),
            (Some(&self.cooling_call), PointRole::CoolingCall),
            (self.fan_speed.as_ref(), PointRole::FanSpeed),
        ];
        ordered
            .into_iter()
            .find_map(|(prefix, role)| prefix.filter(|p| name.starts_with(p.as_str())).map(|_| role))
    }
}

/// Raw readings grouped by role. Null readings are kept so the fan status
/// logic can tell "present but null" from "absent".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointReadings {
    readings: HashMap<PointRole, Vec<Option<f64>>>,
}

impl PointReadings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a device scrape by role; names are matched case-insensitively.
    pub fn from_points(points: &HashMap<String, Option<f64>>, names: &PointNames) -> Self {
        let mut readings = PointReadings::new();
        for (name, value) in points {
            if let Some(role) = names.classify(&name.to_lowercase()) {
                readings.push(role, *value);
            }
        }
        readings
    }

    pub fn push(&mut self, role: PointRole, value: Option<f64>) {
        self.readings.entry(role).or_default().push(value);
    }

    pub fn with(mut self, role: PointRole, value: f64) -> Self {
        self.push(role, Some(value));
        self
    }

    /// Non-null readings for a role.
    pub fn values(&self, role: PointRole) -> Vec<f64> {
        self.readings
            .get(&role)
            .map(|values| values.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    pub fn average(&self, role: PointRole) -> Option<f64> {
        mean(&self.values(role))
    }

    pub fn max(&self, role: PointRole) -> Option<f64> {
        self.values(role).into_iter().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_group_and_average() {
        let names = PointNames::default();
        let points: HashMap<String, Option<f64>> = [
            ("OutdoorAirTemperature1", Some(50.0)),
            ("outdoorairtemperature2", Some(54.0)),
            ("ReturnAirTemperature", Some(75.0)),
            ("MixedAirTemperature", None),
            ("ZoneTemperature", Some(72.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let readings = PointReadings::from_points(&points, &names);
        assert_eq!(readings.average(PointRole::OutdoorAirTemp), Some(52.0));
        assert_eq!(readings.average(PointRole::ReturnAirTemp), Some(75.0));
        assert_eq!(readings.average(PointRole::MixedAirTemp), None);
        assert_eq!(readings.average(PointRole::DamperSignal), None);
    }

    #[test]
    fn classify_respects_precedence() {
        let names = PointNames {
            damper_signal: "oa".to_string(),
            outdoor_air_temp: "oat".to_string(),
            ..PointNames::default()
        };
        // "oat" also starts with the damper prefix "oa"; damper wins
        assert_eq!(names.classify("oat"), Some(PointRole::DamperSignal));
        assert_eq!(names.classify("supplyfanstatus"), Some(PointRole::FanStatus));
        assert_eq!(names.classify("supplyfanspeed"), Some(PointRole::FanSpeed));
        assert_eq!(names.classify("discharge"), None);
    }

    #[test]
    fn max_ignores_nulls() {
        let mut readings = PointReadings::new()
            .with(PointRole::CoolingCall, 0.0)
            .with(PointRole::CoolingCall, 1.0);
        readings.push(PointRole::CoolingCall, None);
        assert_eq!(readings.max(PointRole::CoolingCall), Some(1.0));
        assert_eq!(readings.max(PointRole::FanSpeed), None);
    }
}
