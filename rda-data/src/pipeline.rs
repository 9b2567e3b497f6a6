//! The per-location transformation from raw hourly values to rounded
//! local daily records.

use crate::deaccumulate::deaccumulate;
use crate::local_time::aggregate_daily;
use crate::pet::estimate_pet;
use crate::rounding::round_record;
use crate::sign::normalize_signs;
use crate::units::convert_units;
use chrono::{Datelike, FixedOffset};
use rda_era5::daily::DailyRecord;
use rda_era5::hourly::HourlyObservation;
use rda_era5::location::{LocationContext, ZoneResolver};
use rda_era5::variable::VariableSet;

/// Decimal places of every published daily value.
pub const OUTPUT_DECIMALS: u32 = 2;

/// Runs the stages in order: sign normalisation, de-accumulation, unit
/// conversion, local-day aggregation, PET estimation, rounding.
///
/// Holds no state between calls, so one pipeline can serve many locations
/// from many threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub variables: VariableSet,
    pub decimals: u32,
}

impl Pipeline {
    pub fn new(variables: VariableSet) -> Self {
        Pipeline {
            variables,
            decimals: OUTPUT_DECIMALS,
        }
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    /// Transform one location's hourly series with a known fixed offset.
    pub fn run(&self, hourly: Vec<HourlyObservation>, offset: FixedOffset) -> Vec<DailyRecord> {
        let mut series = prepare_series(hourly);
        normalize_signs(&mut series, &self.variables);
        let gaps = deaccumulate(&mut series, &self.variables);
        convert_units(&mut series, &self.variables);

        let mut days = aggregate_daily(&series, offset, &self.variables, &gaps);
        if let Some(pet) = &self.variables.pet {
            for day in days.iter_mut() {
                estimate_pet(day, pet);
            }
        }
        for day in days.iter_mut() {
            round_record(day, self.decimals);
        }
        days
    }

    /// Resolve the location's fixed offset from the year of its first
    /// observation, then run the pipeline.
    pub fn process_location(
        &self,
        location: &LocationContext,
        resolver: &dyn ZoneResolver,
        hourly: Vec<HourlyObservation>,
    ) -> rda_era5::Result<Vec<DailyRecord>> {
        let Some(first) = hourly.iter().map(|o| o.time).min() else {
            log::warn!(
                "no hourly observations for ({}, {})",
                location.latitude,
                location.longitude
            );
            return Ok(Vec::new());
        };
        let offset = location.fixed_offset(resolver, first.year())?;
        log::info!(
            "processing {} hours at ({}, {}) with fixed offset {}",
            hourly.len(),
            location.latitude,
            location.longitude,
            offset
        );
        Ok(self.run(hourly, offset))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(VariableSet::era5_land())
    }
}

/// Sort by time and keep the first observation of any repeated timestamp.
pub fn prepare_series(mut hourly: Vec<HourlyObservation>) -> Vec<HourlyObservation> {
    hourly.sort_by_key(|o| o.time);
    let before = hourly.len();
    hourly.dedup_by_key(|o| o.time);
    let dropped = before - hourly.len();
    if dropped > 0 {
        log::warn!("dropped {dropped} hourly rows with repeated timestamps");
    }
    hourly
}
