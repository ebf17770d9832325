/// Utility functions for time spans, averaging and formatting
use time::{format_description, OffsetDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Signed span between two timestamps in fractional minutes
pub fn minutes_between(start: OffsetDateTime, end: OffsetDateTime) -> f64 {
    (end - start).as_seconds_f64() / 60.0
}

/// Arithmetic mean of a slice, None when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Round a value to the given number of significant figures
///
/// Matches printf-style `%.2g`: the exact binary value is rounded, ties to even.
pub fn round_significant(value: f64, digits: usize) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    format!("{:.*e}", digits.saturating_sub(1), value)
        .parse()
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use time::macros::datetime;

    #[test]
    fn minutes_between_is_signed() {
        let a = datetime!(2024-06-01 12:00 UTC);
        let b = datetime!(2024-06-01 12:30 UTC);
        assert_relative_eq!(minutes_between(a, b), 30.0);
        assert_relative_eq!(minutes_between(b, a), -30.0);
    }

    #[test]
    fn mean_of_empty_slice_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn rounds_to_two_significant_figures() {
        assert_relative_eq!(round_significant(1.2345, 2), 1.2);
        assert_relative_eq!(round_significant(0.04567, 2), 0.046);
        assert_relative_eq!(round_significant(1234.0, 2), 1200.0);
        assert_relative_eq!(round_significant(-0.0867, 2), -0.087);
        assert_eq!(round_significant(0.0, 2), 0.0);
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_relative_eq!(round_significant(345.0, 2), 340.0);
        assert_relative_eq!(round_significant(2.25, 2), 2.2);
        assert_relative_eq!(round_significant(0.125, 2), 0.12);
        assert_relative_eq!(round_significant(2.35, 2), 2.4);
    }

    #[test]
    fn formats_datetime_for_logs() {
        let dt = datetime!(2024-06-01 08:05:09 UTC);
        assert_eq!(format_datetime(&dt), "01.06.2024 - 08:05:09");
    }
}
