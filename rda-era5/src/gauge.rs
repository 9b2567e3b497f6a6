use crate::error::{Era5Error, Result};
use crate::location::LocationContext;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// A streamflow gauge whose catchment point is processed as one location.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Gauge {
    /// Caravan identifier (e.g., "ausvic_230200")
    pub gauge_id: String,
    /// Human-readable name of the gauge
    pub name: String,
    /// Latitude in decimal degrees; `None` when the registry leaves it blank
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
}

impl Gauge {
    /// The extraction point, if both coordinates are set.
    pub fn location(&self) -> Option<LocationContext> {
        Some(LocationContext::new(self.latitude?, self.longitude?))
    }

    /// Parse a CSV string of gauges into a vector of Gauges.
    ///
    /// Expected CSV columns (with headers): gauge_id, name, lat, lon.
    /// Blank coordinates are kept as `None`; malformed ones are an error.
    pub fn parse_gauge_csv(csv_object: &str) -> Result<Vec<Gauge>> {
        let mut gauge_list: Vec<Gauge> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_object.as_bytes());
        for row in rdr.records() {
            let record = row?;
            let gauge_id = record.get(0).unwrap_or("").to_string();
            if gauge_id.is_empty() {
                return Err(Era5Error::InvalidFormat(format!(
                    "gauge row without id: {:?}",
                    record
                )));
            }
            let name = record.get(1).unwrap_or("").to_string();
            let latitude = parse_coordinate(&gauge_id, "lat", record.get(2))?;
            let longitude = parse_coordinate(&gauge_id, "lon", record.get(3))?;
            gauge_list.push(Gauge {
                gauge_id,
                name,
                latitude,
                longitude,
            });
        }
        Ok(gauge_list)
    }
}

fn parse_coordinate(gauge_id: &str, field: &str, cell: Option<&str>) -> Result<Option<f64>> {
    let cell = cell.unwrap_or("");
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| Era5Error::InvalidFormat(format!("gauge {gauge_id}: bad {field} {cell:?}")))
}
