//! Per-hour unit conversion from native reanalysis units.

use rda_era5::hourly::HourlyObservation;
use rda_era5::variable::VariableSet;
use std::collections::BTreeMap;

/// How many hourly values were raised to zero, per variable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClipReport {
    pub clipped: BTreeMap<String, usize>,
}

impl ClipReport {
    pub fn total(&self) -> usize {
        self.clipped.values().sum()
    }

    pub fn count(&self, name: &str) -> usize {
        self.clipped.get(name).copied().unwrap_or(0)
    }
}

/// Convert every present value to its reporting unit, then clip the
/// variables flagged `clip_negative` at zero.
///
/// Each hour and each variable is independent. Clipping is silent apart
/// from the returned counts.
pub fn convert_units(series: &mut [HourlyObservation], variables: &VariableSet) -> ClipReport {
    let mut report = ClipReport::default();
    for observation in series.iter_mut() {
        for spec in &variables.variables {
            let Some(Some(value)) = observation.values.get_mut(spec.name.as_str()) else {
                continue;
            };
            let mut converted = spec.conversion.apply(*value);
            if spec.clip_negative && converted < 0.0 {
                converted = 0.0;
                *report.clipped.entry(spec.name.clone()).or_insert(0) += 1;
            }
            *value = converted;
        }
    }
    if report.total() > 0 {
        log::debug!("clipped {} negative hourly values to zero", report.total());
    }
    report
}
