//! Shared utility functions for RDA crates.

/// Date and timestamp utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    /// Naive layouts accepted for hourly timestamps, interpreted as UTC.
    const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Parse an hourly timestamp into UTC.
    ///
    /// Accepts epoch milliseconds (the layout of Earth Engine `getRegion`
    /// rows), RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as UTC.
    pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(millis) = s.parse::<i64>() {
            return DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| DateError(format!("epoch milliseconds out of range: {s}")).into());
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        for format in NAIVE_TIMESTAMP_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(naive.and_utc());
            }
        }
        Err(DateError(format!("unrecognised timestamp: {s:?}")).into())
    }

    /// Format a UTC instant as RFC 3339 with a `Z` suffix.
    pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
        dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Returns true if `date` lies in `[start, end]`.
    pub fn in_period(date: &NaiveDate, start: &NaiveDate, end: &NaiveDate) -> bool {
        date >= start && date <= end
    }

}

/// Numeric helpers shared by the aggregation and index code
pub mod numbers {
    /// Round half away from zero to `decimals` places.
    ///
    /// Applying it twice gives the same value as applying it once.
    pub fn round_to(value: f64, decimals: u32) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let scale = 10f64.powi(decimals as i32);
        let rounded = (value * scale).round() / scale;
        // keep -0.0 out of the output
        if rounded == 0.0 {
            0.0
        } else {
            rounded
        }
    }

    /// Arithmetic mean, or None for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Lengths of each consecutive run of `true` in `mask`.
    pub fn run_lengths(mask: &[bool]) -> Vec<usize> {
        let mut runs = Vec::new();
        let mut count = 0usize;
        for &flag in mask {
            if flag {
                count += 1;
            } else if count > 0 {
                runs.push(count);
                count = 0;
            }
        }
        if count > 0 {
            runs.push(count);
        }
        runs
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_round_to() {
            assert_eq!(round_to(1.234, 2), 1.23);
            assert_eq!(round_to(1.236, 2), 1.24);
            assert_eq!(round_to(-0.004, 2), 0.0);
            assert!(round_to(-0.004, 2).is_sign_positive());
            assert_eq!(round_to(12.3456, 4), 12.3456);
            assert!(round_to(f64::NAN, 2).is_nan());
        }

        #[test]
        fn test_round_to_is_idempotent() {
            for raw in [0.005, 1.0 / 3.0, 99.994999, -12.345678, 1234.5678, 0.1 + 0.2] {
                let once = round_to(raw, 2);
                assert_eq!(round_to(once, 2), once);
            }
        }

        #[test]
        fn test_mean() {
            assert_eq!(mean(&[]), None);
            assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        }

        #[test]
        fn test_run_lengths() {
            let mask = [true, true, false, true, false, false, true, true, true];
            assert_eq!(run_lengths(&mask), vec![2, 1, 3]);
            assert!(run_lengths(&[false, false]).is_empty());
            assert!(run_lengths(&[]).is_empty());
        }
    }
}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
