use crate::error::{Era5Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kelvin offset of the Celsius scale.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Seconds in the hour an accumulated radiation value spans.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Whether a variable is a state sampled at the hour or a running total.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Directly comparable across hours (temperature, pressure, wind, soil water).
    Instantaneous,
    /// Running total since the last UTC-midnight reset; must be differenced.
    Accumulated,
}

/// Native reanalysis unit to reporting unit.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    /// K -> °C
    KelvinToCelsius,
    /// Pa -> kPa
    PascalToKilopascal,
    /// m -> mm
    MetresToMillimetres,
    /// J/m² accumulated over one hour -> W/m²
    JoulesPerHourToWatts,
    #[default]
    Unchanged,
}

impl Conversion {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Conversion::KelvinToCelsius => value - KELVIN_OFFSET,
            Conversion::PascalToKilopascal => value / 1000.0,
            Conversion::MetresToMillimetres => value * 1000.0,
            Conversion::JoulesPerHourToWatts => value / SECONDS_PER_HOUR,
            Conversion::Unchanged => value,
        }
    }
}

/// How the 24 hourly values of a local day collapse into daily columns.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// `<base>_mean`, `<base>_min`, `<base>_max`
    #[default]
    Stats,
    /// A single daily total
    Sum,
}

/// One tracked reanalysis variable.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Band name in the hourly extract (e.g. `total_precipitation`)
    pub name: String,
    pub kind: VariableKind,
    #[serde(default)]
    pub conversion: Conversion,
    #[serde(default)]
    pub reduction: Reduction,
    /// Clip converted hourly values at zero.
    #[serde(default)]
    pub clip_negative: bool,
    /// Upward-positive flux that must be negated before de-accumulation.
    #[serde(default)]
    pub flip_sign: bool,
    /// Output naming override. For `stats` this replaces the column prefix,
    /// for `sum` it is the full column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl VariableSpec {
    pub fn instantaneous(name: &str, conversion: Conversion) -> Self {
        VariableSpec {
            name: name.to_string(),
            kind: VariableKind::Instantaneous,
            conversion,
            reduction: Reduction::Stats,
            clip_negative: false,
            flip_sign: false,
            column: None,
        }
    }

    pub fn accumulated(name: &str, conversion: Conversion, reduction: Reduction) -> Self {
        VariableSpec {
            name: name.to_string(),
            kind: VariableKind::Accumulated,
            conversion,
            reduction,
            clip_negative: false,
            flip_sign: false,
            column: None,
        }
    }

    pub fn clipped(mut self) -> Self {
        self.clip_negative = true;
        self
    }

    pub fn sign_flipped(mut self) -> Self {
        self.flip_sign = true;
        self
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    pub fn is_accumulated(&self) -> bool {
        self.kind == VariableKind::Accumulated
    }

    /// Daily column names this variable produces, in output order.
    pub fn output_columns(&self) -> Vec<String> {
        match self.reduction {
            Reduction::Stats => {
                let base = self.column.as_deref().unwrap_or(self.name.as_str());
                vec![
                    format!("{base}_mean"),
                    format!("{base}_min"),
                    format!("{base}_max"),
                ]
            }
            Reduction::Sum => vec![self
                .column
                .clone()
                .unwrap_or_else(|| format!("{}_sum", self.name))],
        }
    }
}

fn default_pet_column() -> String {
    "potential_evaporation_sum_FAO_PENMAN_MONTEITH".to_string()
}
fn default_surface_pressure() -> String {
    "surface_pressure_mean".to_string()
}
fn default_temperature_mean() -> String {
    "temperature_2m_mean".to_string()
}
fn default_temperature_min() -> String {
    "temperature_2m_min".to_string()
}
fn default_temperature_max() -> String {
    "temperature_2m_max".to_string()
}
fn default_dewpoint_mean() -> String {
    "dewpoint_temperature_2m_mean".to_string()
}
fn default_u_wind_mean() -> String {
    "u_component_of_wind_10m_mean".to_string()
}
fn default_v_wind_mean() -> String {
    "v_component_of_wind_10m_mean".to_string()
}
fn default_net_solar_mean() -> String {
    "surface_net_solar_radiation_mean".to_string()
}
fn default_net_thermal_mean() -> String {
    "surface_net_thermal_radiation_mean".to_string()
}

/// Daily columns feeding the FAO-56 estimate, and the column it writes.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PetColumns {
    #[serde(default = "default_pet_column")]
    pub column: String,
    /// kPa
    #[serde(default = "default_surface_pressure")]
    pub surface_pressure: String,
    /// °C
    #[serde(default = "default_temperature_mean")]
    pub temperature_mean: String,
    #[serde(default = "default_temperature_min")]
    pub temperature_min: String,
    #[serde(default = "default_temperature_max")]
    pub temperature_max: String,
    #[serde(default = "default_dewpoint_mean")]
    pub dewpoint_mean: String,
    /// m/s at 10 m
    #[serde(default = "default_u_wind_mean")]
    pub u_wind_mean: String,
    #[serde(default = "default_v_wind_mean")]
    pub v_wind_mean: String,
    /// W/m²
    #[serde(default = "default_net_solar_mean")]
    pub net_solar_mean: String,
    #[serde(default = "default_net_thermal_mean")]
    pub net_thermal_mean: String,
}

impl Default for PetColumns {
    fn default() -> Self {
        PetColumns {
            column: default_pet_column(),
            surface_pressure: default_surface_pressure(),
            temperature_mean: default_temperature_mean(),
            temperature_min: default_temperature_min(),
            temperature_max: default_temperature_max(),
            dewpoint_mean: default_dewpoint_mean(),
            u_wind_mean: default_u_wind_mean(),
            v_wind_mean: default_v_wind_mean(),
            net_solar_mean: default_net_solar_mean(),
            net_thermal_mean: default_net_thermal_mean(),
        }
    }
}

impl PetColumns {
    /// Every input column the estimate reads.
    pub fn inputs(&self) -> [&str; 9] {
        [
            self.surface_pressure.as_str(),
            self.temperature_mean.as_str(),
            self.temperature_min.as_str(),
            self.temperature_max.as_str(),
            self.dewpoint_mean.as_str(),
            self.u_wind_mean.as_str(),
            self.v_wind_mean.as_str(),
            self.net_solar_mean.as_str(),
            self.net_thermal_mean.as_str(),
        ]
    }
}

/// The variable configuration passed through the pipeline: which bands are
/// instantaneous or accumulated, how each converts and reduces, and which
/// daily columns feed the PET estimate.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct VariableSet {
    pub variables: Vec<VariableSpec>,
    /// Absent means no PET column is derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet: Option<PetColumns>,
}

impl VariableSet {
    /// The ERA5-Land hourly bands published in Caravan daily forcing.
    pub fn era5_land() -> Self {
        use Conversion::*;
        let mut variables = vec![
            VariableSpec::instantaneous("temperature_2m", KelvinToCelsius),
            VariableSpec::instantaneous("dewpoint_temperature_2m", KelvinToCelsius),
            VariableSpec::instantaneous("surface_pressure", PascalToKilopascal),
            VariableSpec::instantaneous("u_component_of_wind_10m", Unchanged),
            VariableSpec::instantaneous("v_component_of_wind_10m", Unchanged),
            VariableSpec::instantaneous("snow_depth_water_equivalent", MetresToMillimetres)
                .clipped(),
        ];
        for layer in 1..=4 {
            variables.push(VariableSpec::instantaneous(
                &format!("volumetric_soil_water_layer_{layer}"),
                Unchanged,
            ));
        }
        variables.extend([
            VariableSpec::accumulated(
                "surface_net_solar_radiation",
                JoulesPerHourToWatts,
                Reduction::Stats,
            ),
            VariableSpec::accumulated(
                "surface_net_thermal_radiation",
                JoulesPerHourToWatts,
                Reduction::Stats,
            ),
            VariableSpec::accumulated("total_precipitation", MetresToMillimetres, Reduction::Sum)
                .clipped(),
            VariableSpec::accumulated("potential_evaporation", MetresToMillimetres, Reduction::Sum)
                .sign_flipped()
                .with_column("potential_evaporation_sum_ERA5_LAND"),
        ]);
        VariableSet {
            variables,
            pet: Some(PetColumns::default()),
        }
    }

    /// Parse and validate a TOML variable configuration.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let set: VariableSet = toml::from_str(s)?;
        set.validate()?;
        Ok(set)
    }

    /// Check names are unique and every PET input is produced by some variable.
    pub fn validate(&self) -> Result<()> {
        if self.variables.is_empty() {
            return Err(Era5Error::InvalidConfig("no variables configured".to_string()));
        }
        let mut names = HashSet::new();
        for spec in &self.variables {
            if !names.insert(spec.name.as_str()) {
                return Err(Era5Error::InvalidConfig(format!(
                    "variable {} listed twice",
                    spec.name
                )));
            }
        }
        let columns = self.output_columns();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(Era5Error::InvalidConfig(format!(
                    "column {column} produced twice"
                )));
            }
        }
        if let Some(pet) = &self.pet {
            for input in pet.inputs() {
                if !columns.iter().any(|c| c == input) {
                    return Err(Era5Error::InvalidConfig(format!(
                        "PET input column {input} is not produced by any variable"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|spec| spec.name == name)
    }

    pub fn accumulated(&self) -> impl Iterator<Item = &VariableSpec> {
        self.variables.iter().filter(|spec| spec.is_accumulated())
    }

    /// All daily columns in configuration order, PET last.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .variables
            .iter()
            .flat_map(|spec| spec.output_columns())
            .collect();
        if let Some(pet) = &self.pet {
            columns.push(pet.column.clone());
        }
        columns
    }
}

impl Default for VariableSet {
    fn default() -> Self {
        VariableSet::era5_land()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert!((Conversion::KelvinToCelsius.apply(273.15)).abs() < 1e-12);
        assert!((Conversion::KelvinToCelsius.apply(300.0) - 26.85).abs() < 1e-9);
        assert!((Conversion::PascalToKilopascal.apply(101325.0) - 101.325).abs() < 1e-9);
        assert!((Conversion::MetresToMillimetres.apply(0.05) - 50.0).abs() < 1e-9);
        assert!((Conversion::JoulesPerHourToWatts.apply(7200.0) - 2.0).abs() < 1e-12);
        assert_eq!(Conversion::Unchanged.apply(-3.2), -3.2);
    }

    #[test]
    fn test_era5_land_partition() {
        let set = VariableSet::era5_land();
        set.validate().unwrap();
        let accumulated: Vec<&str> = set.accumulated().map(|v| v.name.as_str()).collect();
        assert_eq!(
            accumulated,
            vec![
                "surface_net_solar_radiation",
                "surface_net_thermal_radiation",
                "total_precipitation",
                "potential_evaporation",
            ]
        );
        assert_eq!(set.variables.len() - accumulated.len(), 10);
        assert!(set.get("potential_evaporation").unwrap().flip_sign);
        assert!(set.get("total_precipitation").unwrap().clip_negative);
        assert!(set.get("snow_depth_water_equivalent").unwrap().clip_negative);
        assert!(!set.get("temperature_2m").unwrap().clip_negative);
    }

    #[test]
    fn test_era5_land_columns() {
        let columns = VariableSet::era5_land().output_columns();
        // 10 instantaneous x 3 + 2 radiation x 3 + 2 sums + PET
        assert_eq!(columns.len(), 39);
        assert_eq!(columns[0], "temperature_2m_mean");
        assert!(columns.contains(&"total_precipitation_sum".to_string()));
        assert!(columns.contains(&"potential_evaporation_sum_ERA5_LAND".to_string()));
        assert!(columns.contains(&"surface_net_thermal_radiation_max".to_string()));
        assert_eq!(
            columns.last().unwrap(),
            "potential_evaporation_sum_FAO_PENMAN_MONTEITH"
        );
    }

    #[test]
    fn test_from_toml_str() {
        let config = r#"
[[variables]]
name = "temperature_2m"
kind = "instantaneous"
conversion = "kelvin_to_celsius"

[[variables]]
name = "total_precipitation"
kind = "accumulated"
conversion = "metres_to_millimetres"
reduction = "sum"
clip_negative = true
"#;
        let set = VariableSet::from_toml_str(config).unwrap();
        assert_eq!(set.variables.len(), 2);
        assert!(set.pet.is_none());
        assert_eq!(set.variables[0].reduction, Reduction::Stats);
        assert_eq!(
            set.output_columns(),
            vec![
                "temperature_2m_mean",
                "temperature_2m_min",
                "temperature_2m_max",
                "total_precipitation_sum",
            ]
        );
    }

    #[test]
    fn test_from_toml_rejects_unproduced_pet_input() {
        let config = r#"
[[variables]]
name = "temperature_2m"
kind = "instantaneous"

[pet]
"#;
        let err = VariableSet::from_toml_str(config).unwrap_err();
        assert!(matches!(err, Era5Error::InvalidConfig(_)));
    }

    #[test]
    fn test_from_toml_rejects_duplicates() {
        let config = r#"
[[variables]]
name = "temperature_2m"
kind = "instantaneous"

[[variables]]
name = "temperature_2m"
kind = "accumulated"
"#;
        assert!(VariableSet::from_toml_str(config).is_err());
        assert!(VariableSet::from_toml_str("variables = []").is_err());
        assert!(matches!(
            VariableSet::from_toml_str("variables = 3"),
            Err(Era5Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_era5_land_round_trips_through_toml() {
        let set = VariableSet::era5_land();
        let text = toml::to_string(&set).unwrap();
        assert_eq!(VariableSet::from_toml_str(&text).unwrap(), set);
    }
}
