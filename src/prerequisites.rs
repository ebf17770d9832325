//! Tracking of conditions that prevent the diagnostics from using a sample.
//!
//! Every short-circuited orchestrator call records why it was skipped. Once the
//! recorded calls span a full data window, issues seen in more than a quarter
//! of those calls are reported and the tracker starts over.

use log::Level;
use time::OffsetDateTime;

use crate::models::DiagnosticResult;
use crate::utils::minutes_between;

/// Share of skipped calls an issue must exceed to be reported.
const REPORT_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrerequisiteIssue {
    SupplyFanOff,
    FanStatusMissing,
    OutdoorAirTempMissing,
    ReturnAirTempMissing,
    MixedAirTempMissing,
    DamperSignalMissing,
    CoolingCallMissing,
    OutdoorAirTempOutOfRange,
    ReturnAirTempOutOfRange,
    MixedAirTempOutOfRange,
}

impl PrerequisiteIssue {
    pub const ALL: [PrerequisiteIssue; 10] = [
        PrerequisiteIssue::SupplyFanOff,
        PrerequisiteIssue::FanStatusMissing,
        PrerequisiteIssue::OutdoorAirTempMissing,
        PrerequisiteIssue::ReturnAirTempMissing,
        PrerequisiteIssue::MixedAirTempMissing,
        PrerequisiteIssue::DamperSignalMissing,
        PrerequisiteIssue::CoolingCallMissing,
        PrerequisiteIssue::OutdoorAirTempOutOfRange,
        PrerequisiteIssue::ReturnAirTempOutOfRange,
        PrerequisiteIssue::MixedAirTempOutOfRange,
    ];

    pub fn message(&self) -> &'static str {
        match self {
            PrerequisiteIssue::SupplyFanOff => {
                "Supply fan is off, current data will not be used for diagnostics."
            }
            PrerequisiteIssue::FanStatusMissing => {
                "Supply fan status data is missing from input (device or trend file), could not verify system was ON."
            }
            PrerequisiteIssue::OutdoorAirTempMissing => {
                "Missing required data for diagnostic: check point configuration for outdoor-air temperature."
            }
            PrerequisiteIssue::ReturnAirTempMissing => {
                "Missing required data for diagnostic: check point configuration for return-air temperature."
            }
            PrerequisiteIssue::MixedAirTempMissing => {
                "Missing required data for diagnostic: check point configuration for mixed-air temperature."
            }
            PrerequisiteIssue::DamperSignalMissing => {
                "Missing required data for diagnostic: check point configuration for damper signal."
            }
            PrerequisiteIssue::CoolingCallMissing => {
                "Missing required data for diagnostic: check point configuration for cooling call (AHU cooling coil, RTU cooling call or compressor command)."
            }
            PrerequisiteIssue::OutdoorAirTempOutOfRange => {
                "Outdoor-air temperature is outside high/low operating limits, check the functionality of the temperature sensor."
            }
            PrerequisiteIssue::ReturnAirTempOutOfRange => {
                "Return-air temperature is outside high/low operating limits, check the functionality of the temperature sensor."
            }
            PrerequisiteIssue::MixedAirTempOutOfRange => {
                "Mixed-air temperature is outside high/low operating limits, check the functionality of the temperature sensor."
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrerequisiteTracker {
    issues: Vec<PrerequisiteIssue>,
    call_times: Vec<OffsetDateTime>,
}

impl PrerequisiteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: PrerequisiteIssue) {
        self.issues.push(issue);
    }

    /// Close out a skipped call, reporting frequent issues once a window has passed.
    pub fn flush_if_due(
        &mut self,
        now: OffsetDateTime,
        data_window: f64,
        result: &mut DiagnosticResult,
    ) {
        self.call_times.push(now);
        let span = match self.call_times.first() {
            Some(first) => minutes_between(*first, now),
            None => 0.0,
        };
        let span = if span > 0.0 { span } else { 1.0 };
        if span < data_window {
            return;
        }

        let threshold = REPORT_FRACTION * self.call_times.len() as f64;
        for issue in PrerequisiteIssue::ALL {
            let count = self.issues.iter().filter(|seen| **seen == issue).count();
            if count as f64 > threshold {
                result.log(Level::Debug, issue.message());
            }
        }
        self.reset();
    }

    pub fn reset(&mut self) {
        self.issues.clear();
        self.call_times.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.call_times.is_empty()
    }

    pub fn pending_calls(&self) -> usize {
        self.call_times.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    #[test]
    fn reports_frequent_issues_after_window() {
        let start = datetime!(2024-06-01 12:00 UTC);
        let mut tracker = PrerequisiteTracker::new();
        let mut result = DiagnosticResult::new();

        for minute in 0..=30 {
            if minute % 10 == 0 {
                tracker.record(PrerequisiteIssue::MixedAirTempOutOfRange);
            } else {
                tracker.record(PrerequisiteIssue::SupplyFanOff);
            }
            tracker.flush_if_due(start + Duration::minutes(minute), 30.0, &mut result);
        }

        assert!(result.has_message("Supply fan is off"));
        // 4 of 31 calls is below a quarter
        assert!(!result.has_message("Mixed-air temperature is outside"));
        assert!(tracker.is_empty());
    }

    #[test]
    fn keeps_accumulating_inside_window() {
        let start = datetime!(2024-06-01 12:00 UTC);
        let mut tracker = PrerequisiteTracker::new();
        let mut result = DiagnosticResult::new();
        for minute in 0..10 {
            tracker.record(PrerequisiteIssue::FanStatusMissing);
            tracker.flush_if_due(start + Duration::minutes(minute), 30.0, &mut result);
        }
        assert_eq!(tracker.pending_calls(), 10);
        assert!(result.messages.is_empty());
    }
}
