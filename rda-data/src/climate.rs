//! Caravan climate indices derived from a gauge's daily forcing.
//!
//! Moisture index and seasonality follow Knoben et al. (2018); the
//! precipitation frequency and duration indices follow the CAMELS
//! definitions used by Caravan.

use chrono::{Datelike, NaiveDate};
use rda_era5::daily::DailyRecord;
use rda_utils::dates::in_period;
use rda_utils::numbers::{mean, round_to, run_lengths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decimal places every index is reported to.
pub const INDEX_DECIMALS: u32 = 4;

/// Days with at least this multiple of mean precipitation are "high".
pub const HIGH_PRECIP_FACTOR: f64 = 5.0;

/// Days with less than this many millimetres are "low".
pub const LOW_PRECIP_MM: f64 = 1.0;

/// Inclusive date range the indices are computed over.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct ClimatePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ClimatePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        ClimatePeriod { start, end }
    }

    /// 1981-01-01 through 2020-12-31.
    pub fn caravan() -> Self {
        ClimatePeriod {
            start: NaiveDate::from_ymd_opt(1981, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or_default(),
        }
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        in_period(date, &self.start, &self.end)
    }
}

impl Default for ClimatePeriod {
    fn default() -> Self {
        ClimatePeriod::caravan()
    }
}

/// Daily columns the indices read.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ClimateColumns {
    pub precipitation: String,
    pub temperature_mean: String,
    pub pet_era5_land: String,
    pub pet_fao_pm: String,
}

impl Default for ClimateColumns {
    fn default() -> Self {
        ClimateColumns {
            precipitation: "total_precipitation_sum".to_string(),
            temperature_mean: "temperature_2m_mean".to_string(),
            pet_era5_land: "potential_evaporation_sum_ERA5_LAND".to_string(),
            pet_fao_pm: "potential_evaporation_sum_FAO_PENMAN_MONTEITH".to_string(),
        }
    }
}

/// One row of the climate attribute table.
///
/// Ratios are `None` when undefined, such as aridity with no precipitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateIndices {
    pub gauge_id: String,
    pub p_mean: f64,
    #[serde(rename = "pet_mean_ERA5_LAND")]
    pub pet_mean_era5_land: f64,
    #[serde(rename = "pet_mean_FAO_PM")]
    pub pet_mean_fao_pm: f64,
    #[serde(rename = "aridity_ERA5_LAND")]
    pub aridity_era5_land: Option<f64>,
    #[serde(rename = "aridity_FAO_PM")]
    pub aridity_fao_pm: Option<f64>,
    pub frac_snow: f64,
    #[serde(rename = "moisture_index_ERA5_LAND")]
    pub moisture_index_era5_land: Option<f64>,
    #[serde(rename = "seasonality_ERA5_LAND")]
    pub seasonality_era5_land: Option<f64>,
    #[serde(rename = "moisture_index_FAO_PM")]
    pub moisture_index_fao_pm: Option<f64>,
    #[serde(rename = "seasonality_FAO_PM")]
    pub seasonality_fao_pm: Option<f64>,
    pub high_prec_freq: f64,
    pub high_prec_dur: f64,
    pub low_prec_freq: f64,
    pub low_prec_dur: f64,
}

type DailySeries = Vec<(NaiveDate, f64)>;

/// Present values of one column inside the period, in date order.
fn column_series(records: &[DailyRecord], column: &str, period: &ClimatePeriod) -> DailySeries {
    records
        .iter()
        .filter(|r| period.contains(&r.date))
        .filter_map(|r| r.get(column).map(|v| (r.date, v)))
        .collect()
}

fn series_mean(series: &[(NaiveDate, f64)]) -> Option<f64> {
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    mean(&values)
}

/// Mean value per calendar month (1..=12) over every year in the series.
pub fn monthly_means(series: &[(NaiveDate, f64)]) -> BTreeMap<u32, f64> {
    let mut totals: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (date, value) in series {
        let entry = totals.entry(date.month()).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    totals
        .into_iter()
        .map(|(month, (sum, n))| (month, sum / n as f64))
        .collect()
}

/// Knoben moisture index and its seasonality from monthly mean
/// precipitation and PET. Months without PET are skipped.
///
/// Returns `(index, seasonality)`, each `None` when no month has both.
pub fn moisture_and_seasonality(
    precipitation: &BTreeMap<u32, f64>,
    pet: &BTreeMap<u32, f64>,
) -> (Option<f64>, Option<f64>) {
    let monthly: Vec<f64> = precipitation
        .iter()
        .filter_map(|(month, &p)| {
            let &e = pet.get(month)?;
            Some(if p > e {
                1.0 - e / p
            } else if p < e {
                p / e - 1.0
            } else {
                0.0
            })
        })
        .collect();
    let Some(index) = mean(&monthly) else {
        return (None, None);
    };
    let max = monthly.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = monthly.iter().copied().fold(f64::INFINITY, f64::min);
    (Some(index), Some(max - min))
}

/// Share of monthly mean precipitation falling in months colder than 0 °C.
pub fn snow_fraction(precipitation: &BTreeMap<u32, f64>, temperature: &BTreeMap<u32, f64>) -> f64 {
    let total: f64 = precipitation.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let snow: f64 = precipitation
        .iter()
        .filter(|(month, _)| temperature.get(*month).is_some_and(|&t| t < 0.0))
        .map(|(_, p)| p)
        .sum();
    snow / total
}

/// Frequency of flagged days and mean length of their runs.
fn frequency_and_duration(mask: &[bool]) -> (f64, f64) {
    if mask.is_empty() {
        return (0.0, 0.0);
    }
    let hits = mask.iter().filter(|&&flag| flag).count();
    let runs: Vec<f64> = run_lengths(mask).into_iter().map(|n| n as f64).collect();
    (hits as f64 / mask.len() as f64, mean(&runs).unwrap_or(0.0))
}

/// Compute every index for one gauge. `None` when the period holds no
/// precipitation, temperature or PET values.
pub fn climate_indices(
    gauge_id: &str,
    records: &[DailyRecord],
    columns: &ClimateColumns,
    period: &ClimatePeriod,
) -> Option<ClimateIndices> {
    let precip = column_series(records, &columns.precipitation, period);
    let temperature = column_series(records, &columns.temperature_mean, period);
    let pet_era5 = column_series(records, &columns.pet_era5_land, period);
    let pet_fao = column_series(records, &columns.pet_fao_pm, period);

    let p_mean = series_mean(&precip)?;
    let pet_mean_era5 = series_mean(&pet_era5)?;
    let pet_mean_fao = series_mean(&pet_fao)?;
    if temperature.is_empty() {
        return None;
    }
    if pet_mean_era5 < 0.0 {
        log::warn!(
            "{gauge_id}: mean ERA5-Land PET is negative ({pet_mean_era5:.3} mm/d); \
             potential_evaporation probably needs its sign flipped"
        );
    }

    let aridity = |pet_mean: f64| (p_mean > 0.0).then(|| pet_mean / p_mean);

    let monthly_precip = monthly_means(&precip);
    let (mi_era5, seasonality_era5) =
        moisture_and_seasonality(&monthly_precip, &monthly_means(&pet_era5));
    let (mi_fao, seasonality_fao) =
        moisture_and_seasonality(&monthly_precip, &monthly_means(&pet_fao));
    let frac_snow = snow_fraction(&monthly_precip, &monthly_means(&temperature));

    let high: Vec<bool> = precip
        .iter()
        .map(|(_, p)| *p >= HIGH_PRECIP_FACTOR * p_mean)
        .collect();
    let low: Vec<bool> = precip.iter().map(|(_, p)| *p < LOW_PRECIP_MM).collect();
    let (high_prec_freq, high_prec_dur) = frequency_and_duration(&high);
    let (low_prec_freq, low_prec_dur) = frequency_and_duration(&low);

    let r = |v: f64| round_to(v, INDEX_DECIMALS);
    let ro = |v: Option<f64>| v.map(r);
    Some(ClimateIndices {
        gauge_id: gauge_id.to_string(),
        p_mean: r(p_mean),
        pet_mean_era5_land: r(pet_mean_era5),
        pet_mean_fao_pm: r(pet_mean_fao),
        aridity_era5_land: ro(aridity(pet_mean_era5)),
        aridity_fao_pm: ro(aridity(pet_mean_fao)),
        frac_snow: r(frac_snow),
        moisture_index_era5_land: ro(mi_era5),
        seasonality_era5_land: ro(seasonality_era5),
        moisture_index_fao_pm: ro(mi_fao),
        seasonality_fao_pm: ro(seasonality_fao),
        high_prec_freq: r(high_prec_freq),
        high_prec_dur: r(high_prec_dur),
        low_prec_freq: r(low_prec_freq),
        low_prec_dur: r(low_prec_dur),
    })
}
