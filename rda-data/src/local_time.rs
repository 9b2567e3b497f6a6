//! Binning of a converted hourly UTC series into local days.
//!
//! The series is shifted by one fixed offset and cut into days running from
//! 01:00 local to 00:00 local the next day. Hourly stamps mark the end of the
//! hour they describe, so those 24 stamps cover exactly one local calendar day.

use crate::deaccumulate::GapReport;
use chrono::{FixedOffset, NaiveDateTime, TimeDelta, Timelike};
use rda_era5::daily::{DailyRecord, MissingReason, HOURS_PER_DAY};
use rda_era5::hour_range::HourRange;
use rda_era5::hourly::HourlyObservation;
use rda_era5::variable::{Reduction, VariableSet, VariableSpec};
use rda_utils::numbers::mean;
use std::collections::BTreeMap;

/// Local clock hour of the first sample of every local day.
pub const DAY_START_HOUR: u32 = 1;

/// Index the series by local wall-clock time. The first observation wins if
/// two share a timestamp.
pub fn shift_to_local(
    series: &[HourlyObservation],
    offset: FixedOffset,
) -> BTreeMap<NaiveDateTime, &HourlyObservation> {
    let mut local = BTreeMap::new();
    for observation in series {
        local
            .entry(observation.time.with_timezone(&offset).naive_local())
            .or_insert(observation);
    }
    local
}

/// First local hour-1 sample and last local hour-0 sample, if at least one
/// whole day fits between them.
pub fn whole_day_window<'a, I>(local_times: I) -> Option<(NaiveDateTime, NaiveDateTime)>
where
    I: IntoIterator<Item = &'a NaiveDateTime>,
{
    let mut first = None;
    let mut last = None;
    for time in local_times {
        if first.is_none() && time.hour() == DAY_START_HOUR {
            first = Some(*time);
        }
        if time.hour() == 0 {
            last = Some(*time);
        }
    }
    let (first, last) = (first?, last?);
    if first + TimeDelta::hours(HOURS_PER_DAY as i64 - 1) <= last {
        Some((first, last))
    } else {
        None
    }
}

/// Reduce a converted, de-accumulated hourly series to local daily records.
///
/// Partial days at either end of the series are dropped. Every day inside
/// the window is emitted, in date order; a day lacking any of its 24 hours
/// or holding an increment that was differenced across a gap is emitted as
/// missing with every column `None`.
pub fn aggregate_daily(
    series: &[HourlyObservation],
    offset: FixedOffset,
    variables: &VariableSet,
    gaps: &GapReport,
) -> Vec<DailyRecord> {
    let local = shift_to_local(series, offset);
    let Some((first, last)) = whole_day_window(local.keys()) else {
        log::warn!(
            "{} hourly samples do not cover a whole local day at offset {}",
            series.len(),
            offset
        );
        return Vec::new();
    };

    let columns = variables.output_columns();
    let mut records = Vec::new();
    let mut start = first;
    while start + TimeDelta::hours(HOURS_PER_DAY as i64 - 1) <= last {
        let date = start.date();
        let hours: Vec<&HourlyObservation> = HourRange::day_starting(start)
            .filter_map(|hour| local.get(&hour).copied())
            .collect();

        let record = if hours.len() < HOURS_PER_DAY {
            DailyRecord::missing(
                date,
                MissingReason::AbsentHours { found: hours.len() },
                &columns,
            )
        } else if hours.iter().any(|o| gaps.is_tainted(&o.time)) {
            DailyRecord::missing(date, MissingReason::GapSpanned, &columns)
        } else {
            let mut record = DailyRecord::complete(date);
            for spec in &variables.variables {
                reduce_variable(&mut record, spec, &hours);
            }
            record
        };
        records.push(record);
        start += TimeDelta::hours(HOURS_PER_DAY as i64);
    }

    let missing = records.iter().filter(|r| r.is_missing()).count();
    if missing > 0 {
        log::warn!("{missing} of {} local days are missing hours", records.len());
    }
    log::debug!(
        "aggregated {} local days from {} to {} at offset {}",
        records.len(),
        first.date(),
        last.date(),
        offset
    );
    records
}

/// Write one variable's daily columns. A single missing hour leaves every
/// column of the variable `None`.
fn reduce_variable(record: &mut DailyRecord, spec: &VariableSpec, hours: &[&HourlyObservation]) {
    let columns = spec.output_columns();
    let values: Option<Vec<f64>> = hours.iter().map(|o| o.get(&spec.name)).collect();
    let Some(values) = values else {
        for column in &columns {
            record.set(column, None);
        }
        return;
    };
    match spec.reduction {
        Reduction::Stats => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            record.set(&columns[0], mean(&values));
            record.set(&columns[1], Some(min));
            record.set(&columns[2], Some(max));
        }
        Reduction::Sum => record.set(&columns[0], Some(values.iter().sum())),
    }
}
