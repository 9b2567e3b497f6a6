//! Recover per-hour increments from ERA5-Land running totals.
//!
//! Accumulated bands restart at 00 UTC, but the value stamped 00 UTC is the
//! total of the previous 24 hours, not zero. The value stamped 01 UTC is the
//! first hour's accumulation on its own. So 01 UTC keeps its raw value, and
//! every other hour is differenced against the hour before it.

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use rda_era5::hourly::HourlyObservation;
use rda_era5::variable::VariableSet;
use std::collections::BTreeSet;

/// UTC hour whose raw value is already a single hour's increment.
pub const RESET_HOUR: u32 = 1;

/// How one hour's increment is recovered from the running total.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum IncrementRule {
    /// First record of the series; no predecessor, raw value kept.
    SeriesStart,
    /// First hour after the 00 UTC reset; raw value kept.
    ResetBoundary,
    /// Predecessor is the previous hour; first difference.
    Difference,
    /// Predecessor is more than an hour back; increment unknown.
    AcrossGap,
}

impl IncrementRule {
    pub fn for_hour(previous: Option<DateTime<Utc>>, current: DateTime<Utc>) -> Self {
        match previous {
            None => IncrementRule::SeriesStart,
            Some(_) if current.hour() == RESET_HOUR => IncrementRule::ResetBoundary,
            Some(prev) if current - prev == TimeDelta::hours(1) => IncrementRule::Difference,
            Some(_) => IncrementRule::AcrossGap,
        }
    }
}

/// Hours whose increments could not be recovered because the series skips
/// one or more hours right before them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GapReport {
    pub tainted: BTreeSet<DateTime<Utc>>,
}

impl GapReport {
    pub fn is_tainted(&self, time: &DateTime<Utc>) -> bool {
        self.tainted.contains(time)
    }

    pub fn is_empty(&self) -> bool {
        self.tainted.is_empty()
    }
}

/// Replace every accumulated variable's running total with its hourly
/// increment, in place. The series must be sorted by time.
///
/// A missing raw value yields a missing increment for that variable alone.
/// An hour reached across a gap yields missing increments for every
/// accumulated variable and is recorded in the returned report.
pub fn deaccumulate(series: &mut [HourlyObservation], variables: &VariableSet) -> GapReport {
    let names: Vec<&str> = variables.accumulated().map(|spec| spec.name.as_str()).collect();
    let mut report = GapReport::default();
    if names.is_empty() {
        return report;
    }

    // raw totals of the previous hour; the series is overwritten as we go
    let mut previous: Option<(DateTime<Utc>, Vec<Option<f64>>)> = None;
    for observation in series.iter_mut() {
        let raw: Vec<Option<f64>> = names.iter().map(|name| observation.get(name)).collect();
        let rule = IncrementRule::for_hour(previous.as_ref().map(|(t, _)| *t), observation.time);
        if rule == IncrementRule::AcrossGap {
            report.tainted.insert(observation.time);
        }
        for (i, name) in names.iter().enumerate() {
            let increment = match rule {
                IncrementRule::SeriesStart | IncrementRule::ResetBoundary => raw[i],
                IncrementRule::Difference => {
                    let before = previous.as_ref().and_then(|(_, totals)| totals[i]);
                    match (raw[i], before) {
                        (Some(now), Some(before)) => Some(now - before),
                        _ => None,
                    }
                }
                IncrementRule::AcrossGap => None,
            };
            observation.set(name, increment);
        }
        previous = Some((observation.time, raw));
    }

    if !report.is_empty() {
        log::warn!(
            "{} hour(s) follow a gap in the hourly series; their increments are unknown",
            report.tainted.len()
        );
    }
    log::debug!(
        "deaccumulated {} hours of {} accumulated variables",
        series.len(),
        names.len()
    );
    report
}
