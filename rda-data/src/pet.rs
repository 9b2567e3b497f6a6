//! FAO-56 Penman-Monteith reference evapotranspiration from daily means.
//!
//! Allen, R. G., Pereira, L. S., Raes, D., & Smith, M. (1998). Crop
//! evapotranspiration. FAO Irrigation and Drainage Paper 56, equation 6.

use rda_era5::daily::DailyRecord;
use rda_era5::variable::PetColumns;

/// Height of the reanalysis wind components in metres.
pub const WIND_HEIGHT_M: f64 = 10.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Daily aggregates the estimate is computed from.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct PenmanMonteithInputs {
    /// kPa
    pub surface_pressure: f64,
    /// °C
    pub temperature_mean: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub dewpoint_mean: f64,
    /// m/s at 10 m
    pub u_wind: f64,
    pub v_wind: f64,
    /// W/m²
    pub net_solar: f64,
    pub net_thermal: f64,
}

impl PenmanMonteithInputs {
    /// Pull every input from a daily record; `None` if any is missing.
    pub fn from_record(record: &DailyRecord, columns: &PetColumns) -> Option<Self> {
        Some(PenmanMonteithInputs {
            surface_pressure: record.get(&columns.surface_pressure)?,
            temperature_mean: record.get(&columns.temperature_mean)?,
            temperature_min: record.get(&columns.temperature_min)?,
            temperature_max: record.get(&columns.temperature_max)?,
            dewpoint_mean: record.get(&columns.dewpoint_mean)?,
            u_wind: record.get(&columns.u_wind_mean)?,
            v_wind: record.get(&columns.v_wind_mean)?,
            net_solar: record.get(&columns.net_solar_mean)?,
            net_thermal: record.get(&columns.net_thermal_mean)?,
        })
    }

    /// Wind speed at 2 m from the 10 m vector magnitude (FAO-56 eq. 47).
    pub fn wind_speed_2m(&self) -> f64 {
        let speed = self.u_wind.hypot(self.v_wind);
        speed * 4.87 / (67.8 * WIND_HEIGHT_M - 5.42).ln()
    }

    /// Net radiation in MJ m⁻² day⁻¹.
    pub fn net_radiation(&self) -> f64 {
        (self.net_solar + self.net_thermal) * SECONDS_PER_DAY / 1e6
    }
}

/// Saturation vapour pressure in kPa at `temperature` °C (FAO-56 eq. 11).
pub fn saturation_vapour_pressure(temperature: f64) -> f64 {
    0.6108 * (17.27 * temperature / (temperature + 237.3)).exp()
}

/// Slope of the saturation vapour pressure curve in kPa/°C (FAO-56 eq. 13).
pub fn vapour_pressure_slope(temperature: f64) -> f64 {
    4098.0 * saturation_vapour_pressure(temperature) / (temperature + 237.3).powi(2)
}

/// Psychrometric constant in kPa/°C for a pressure in kPa (FAO-56 eq. 8).
pub fn psychrometric_constant(pressure: f64) -> f64 {
    0.000665 * pressure
}

/// Reference evapotranspiration in mm/day, never negative.
/// Soil heat flux is taken as zero at the daily step.
pub fn fao56_penman_monteith(inputs: &PenmanMonteithInputs) -> f64 {
    let t_mean = inputs.temperature_mean;
    let u2 = inputs.wind_speed_2m();
    let net_radiation = inputs.net_radiation();
    let soil_heat_flux = 0.0;

    let es = (saturation_vapour_pressure(inputs.temperature_max)
        + saturation_vapour_pressure(inputs.temperature_min))
        / 2.0;
    let ea = saturation_vapour_pressure(inputs.dewpoint_mean);
    let delta = vapour_pressure_slope(t_mean);
    let gamma = psychrometric_constant(inputs.surface_pressure);

    let numerator = 0.408 * delta * (net_radiation - soil_heat_flux)
        + gamma * 900.0 / (t_mean + 273.0) * u2 * (es - ea);
    let denominator = delta + gamma * (1.0 + 0.34 * u2);
    (numerator / denominator).max(0.0)
}

/// Write the PET column of one daily record. Missing days and days lacking
/// any input get `None`.
pub fn estimate_pet(record: &mut DailyRecord, columns: &PetColumns) {
    let pet = if record.is_missing() {
        None
    } else {
        PenmanMonteithInputs::from_record(record, columns).map(|i| fao56_penman_monteith(&i))
    };
    record.set(&columns.column, pet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rda_era5::daily::MissingReason;

    fn temperate_day() -> PenmanMonteithInputs {
        PenmanMonteithInputs {
            surface_pressure: 99.0,
            temperature_mean: 15.0,
            temperature_min: 10.0,
            temperature_max: 20.0,
            dewpoint_mean: 9.0,
            u_wind: 2.0,
            v_wind: 1.0,
            net_solar: 150.0,
            net_thermal: -40.0,
        }
    }

    fn record_for(inputs: &PenmanMonteithInputs, columns: &PetColumns) -> DailyRecord {
        let mut record = DailyRecord::complete(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        record.set(&columns.surface_pressure, Some(inputs.surface_pressure));
        record.set(&columns.temperature_mean, Some(inputs.temperature_mean));
        record.set(&columns.temperature_min, Some(inputs.temperature_min));
        record.set(&columns.temperature_max, Some(inputs.temperature_max));
        record.set(&columns.dewpoint_mean, Some(inputs.dewpoint_mean));
        record.set(&columns.u_wind_mean, Some(inputs.u_wind));
        record.set(&columns.v_wind_mean, Some(inputs.v_wind));
        record.set(&columns.net_solar_mean, Some(inputs.net_solar));
        record.set(&columns.net_thermal_mean, Some(inputs.net_thermal));
        record
    }

    #[test]
    fn test_saturation_vapour_pressure_table_values() {
        // FAO-56 Annex 2, table 2.3
        assert!((saturation_vapour_pressure(20.0) - 2.338).abs() < 1e-3);
        assert!((saturation_vapour_pressure(0.0) - 0.6108).abs() < 1e-9);
        assert!((vapour_pressure_slope(20.0) - 0.145).abs() < 1e-3);
        assert!((psychrometric_constant(101.3) - 0.0674).abs() < 1e-4);
    }

    #[test]
    fn test_intermediate_terms() {
        let inputs = temperate_day();
        assert!((inputs.wind_speed_2m() - 1.67247).abs() < 1e-4);
        assert!((inputs.net_radiation() - 9.504).abs() < 1e-9);
    }

    #[test]
    fn test_temperate_day() {
        let pet = fao56_penman_monteith(&temperate_day());
        assert!(pet > 0.0 && pet < 10.0);
        assert!((pet - 3.0237).abs() < 1e-3, "got {pet}");
    }

    #[test]
    fn test_clipped_at_zero() {
        let saturated = PenmanMonteithInputs {
            temperature_mean: 5.0,
            temperature_min: 5.0,
            temperature_max: 5.0,
            dewpoint_mean: 5.0,
            net_solar: 20.0,
            net_thermal: -60.0,
            ..temperate_day()
        };
        assert_eq!(fao56_penman_monteith(&saturated), 0.0);
    }

    #[test]
    fn test_estimate_pet_writes_column() {
        let columns = PetColumns::default();
        let mut record = record_for(&temperate_day(), &columns);
        estimate_pet(&mut record, &columns);
        let pet = record.get("potential_evaporation_sum_FAO_PENMAN_MONTEITH").unwrap();
        assert!((pet - 3.0237).abs() < 1e-3);
    }

    #[test]
    fn test_missing_input_gives_missing_pet() {
        let columns = PetColumns::default();
        let mut record = record_for(&temperate_day(), &columns);
        record.set(&columns.dewpoint_mean, None);
        estimate_pet(&mut record, &columns);
        assert_eq!(record.get(&columns.column), None);
        assert!(record.values.contains_key(&columns.column));
        // other columns untouched
        assert_eq!(record.get(&columns.temperature_mean), Some(15.0));
    }

    #[test]
    fn test_missing_day_gives_missing_pet() {
        let columns = PetColumns::default();
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let mut record = DailyRecord::missing(date, MissingReason::GapSpanned, &[]);
        estimate_pet(&mut record, &columns);
        assert_eq!(record.get(&columns.column), None);
    }
}
