use crate::daily::HOURS_PER_DAY;
use chrono::{NaiveDateTime, TimeDelta};
use std::mem::replace;

/// An hour range iterator that yields each hour from the start
/// through the end (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct HourRange(pub NaiveDateTime, pub NaiveDateTime);

impl HourRange {
    /// The 24 hours binned into the local day that starts at `first_hour`.
    pub fn day_starting(first_hour: NaiveDateTime) -> Self {
        HourRange(first_hour, first_hour + TimeDelta::hours(HOURS_PER_DAY as i64 - 1))
    }
}

impl Iterator for HourRange {
    type Item = NaiveDateTime;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0 + TimeDelta::hours(1);
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}
