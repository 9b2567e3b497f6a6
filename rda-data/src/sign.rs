//! Sign normalisation for upward-positive fluxes.
//!
//! ERA5-Land reports evaporation-type accumulations as negative numbers when
//! water leaves the surface. Negating them makes every accumulated quantity a
//! non-negative gain, like precipitation.

use rda_era5::hourly::HourlyObservation;
use rda_era5::variable::VariableSet;

/// Negate every present value of each variable flagged `flip_sign`.
/// Missing values stay missing.
pub fn normalize_signs(series: &mut [HourlyObservation], variables: &VariableSet) {
    let flipped: Vec<&str> = variables
        .variables
        .iter()
        .filter(|spec| spec.flip_sign)
        .map(|spec| spec.name.as_str())
        .collect();
    if flipped.is_empty() {
        return;
    }
    for observation in series.iter_mut() {
        for name in &flipped {
            if let Some(Some(value)) = observation.values.get_mut(*name) {
                *value = -*value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_flips_only_flagged_variables() {
        let time = Utc.with_ymd_and_hms(2020, 1, 1, 5, 0, 0).unwrap();
        let mut series = vec![HourlyObservation::new(time)
            .with_value("potential_evaporation", Some(-0.0012))
            .with_value("total_precipitation", Some(0.0004))];
        normalize_signs(&mut series, &VariableSet::era5_land());
        assert_eq!(series[0].get("potential_evaporation"), Some(0.0012));
        assert_eq!(series[0].get("total_precipitation"), Some(0.0004));
    }

    #[test]
    fn test_missing_stays_missing() {
        let time = Utc.with_ymd_and_hms(2020, 1, 1, 5, 0, 0).unwrap();
        let mut series = vec![
            HourlyObservation::new(time).with_value("potential_evaporation", None),
            HourlyObservation::new(time + chrono::TimeDelta::hours(1)),
        ];
        normalize_signs(&mut series, &VariableSet::era5_land());
        assert_eq!(series[0].values.get("potential_evaporation"), Some(&None));
        assert!(!series[1].values.contains_key("potential_evaporation"));
    }
}
