//! Batch accumulation of synchronized samples for one diagnostic.
//!
//! A window collects projections of the aggregated sensor sample together with
//! their timestamps until it covers the configured span and sample count. The
//! owning diagnostic then computes its verdict and clears the window, so
//! consecutive batches never overlap.

use time::OffsetDateTime;

use crate::utils::minutes_between;

#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    values: Vec<T>,
    timestamps: Vec<OffsetDateTime>,
}

impl<T> Default for SampleWindow<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            timestamps: Vec::new(),
        }
    }
}

impl<T> SampleWindow<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, timestamp: OffsetDateTime, value: T) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn last_timestamp(&self) -> Option<OffsetDateTime> {
        self.timestamps.last().copied()
    }

    /// Minutes between the first and last buffered sample.
    ///
    /// Non-positive spans (a single sample, duplicate or out-of-order
    /// timestamps) are clamped to one minute.
    pub fn elapsed_minutes(&self) -> f64 {
        let elapsed = match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => minutes_between(*first, *last),
            _ => 0.0,
        };
        if elapsed > 0.0 {
            elapsed
        } else {
            1.0
        }
    }

    pub fn ready(&self, data_window_minutes: f64, min_required_samples: usize) -> bool {
        !self.is_empty()
            && self.elapsed_minutes() >= data_window_minutes
            && self.len() >= min_required_samples
    }

    /// Average spacing between consecutive samples in minutes.
    pub fn average_step_minutes(&self) -> f64 {
        if self.len() > 1 {
            self.elapsed_minutes() / (self.len() - 1) as f64
        } else {
            1.0
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.timestamps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use time::macros::datetime;
    use time::Duration;

    fn filled(count: i64, step_minutes: i64) -> SampleWindow<f64> {
        let start = datetime!(2024-06-01 12:00 UTC);
        let mut window = SampleWindow::new();
        for i in 0..count {
            window.append(start + Duration::minutes(i * step_minutes), i as f64);
        }
        window
    }

    #[test]
    fn not_ready_until_count_reached() {
        // 10 samples spread over 90 minutes: span is fine, count is not
        let window = filled(10, 10);
        assert!(window.elapsed_minutes() >= 30.0);
        assert!(!window.ready(30.0, 20));
    }

    #[test]
    fn not_ready_until_span_reached() {
        let window = filled(25, 1);
        assert_relative_eq!(window.elapsed_minutes(), 24.0);
        assert!(!window.ready(30.0, 20));
        assert!(filled(31, 1).ready(30.0, 20));
    }

    #[test]
    fn duplicate_timestamps_clamp_to_one_minute() {
        let ts = datetime!(2024-06-01 12:00 UTC);
        let mut window = SampleWindow::new();
        for _ in 0..5 {
            window.append(ts, 1.0);
        }
        assert_relative_eq!(window.elapsed_minutes(), 1.0);
        assert!(window.ready(1.0, 5));
        assert!(!window.ready(2.0, 5));
    }

    #[test]
    fn average_step_and_clear() {
        let mut window = filled(7, 5);
        assert_relative_eq!(window.average_step_minutes(), 5.0);
        assert_eq!(window.values().len(), window.len());
        window.clear();
        assert!(window.is_empty());
        assert!(window.values().is_empty());
        assert_relative_eq!(window.average_step_minutes(), 1.0);
    }
}
