use crate::error::{Era5Error, Result};
use crate::variable::VariableSet;
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Name of the timestamp column in hourly CSV extracts.
pub const TIME_COLUMN: &str = "time";

/// Cell spellings read as an explicit missing value.
const MISSING_MARKERS: [&str; 5] = ["", "nan", "none", "null", "na"];

/// One UTC hour at one location: raw band values keyed by variable name.
///
/// `None` is an explicit missing value; a variable absent from the map is
/// treated the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyObservation {
    pub time: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl HourlyObservation {
    pub fn new(time: DateTime<Utc>) -> Self {
        HourlyObservation {
            time,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: &str, value: Option<f64>) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn set(&mut self, name: &str, value: Option<f64>) {
        self.values.insert(name.to_string(), value);
    }

    /// Parse an hourly CSV extract.
    ///
    /// Expected format (with headers): `time,<variable>,<variable>,...`.
    /// Only columns naming a configured variable are kept, so Earth Engine
    /// `getRegion` dumps (`id,longitude,latitude,time,...`) load unchanged.
    ///
    /// # Example CSV
    /// ```text
    /// time,temperature_2m,total_precipitation
    /// 2020-01-01T00:00:00Z,291.2,0.0021
    /// 2020-01-01T01:00:00Z,290.8,
    /// ```
    pub fn parse_csv<R: Read>(reader: R, variables: &VariableSet) -> Result<Vec<HourlyObservation>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let time_index = headers
            .iter()
            .position(|h| h == TIME_COLUMN)
            .ok_or_else(|| Era5Error::InvalidFormat(format!("missing {TIME_COLUMN} column")))?;
        let columns: Vec<(usize, &str)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| variables.get(h).map(|spec| (i, spec.name.as_str())))
            .collect();

        let mut observations = Vec::new();
        for row in rdr.records() {
            let record = row?;
            let raw_time = record.get(time_index).unwrap_or("");
            let time = rda_utils::dates::parse_timestamp(raw_time)
                .map_err(|e| Era5Error::InvalidTimestamp(e.to_string()))?;
            let mut observation = HourlyObservation::new(time);
            for (index, name) in &columns {
                let value = parse_value(record.get(*index).unwrap_or(""))?;
                observation.set(name, value);
            }
            observations.push(observation);
        }
        log::debug!(
            "parsed {} hourly rows with {} tracked columns",
            observations.len(),
            columns.len()
        );
        Ok(observations)
    }

    /// Parse a JSON array of observations, as written by `serde_json`.
    pub fn parse_json<R: Read>(reader: R) -> Result<Vec<HourlyObservation>> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Parse one numeric cell; missing markers and non-finite numbers become `None`.
fn parse_value(cell: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if MISSING_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(_) => Err(Era5Error::InvalidFormat(format!("not a number: {cell:?}"))),
    }
}
