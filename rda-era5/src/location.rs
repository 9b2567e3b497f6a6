use crate::error::{Era5Error, Result};
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tzf_rs::DefaultFinder;

/// Which half of the globe a point lies in. The equator counts as northern.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    Northern,
    Southern,
}

/// The point a gauge's hourly series was extracted at.
///
/// Used only to pick the fixed UTC offset of the local day; it owns no
/// observation data.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct LocationContext {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl LocationContext {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        LocationContext {
            latitude,
            longitude,
        }
    }

    pub fn hemisphere(&self) -> Hemisphere {
        if self.latitude < 0.0 {
            Hemisphere::Southern
        } else {
            Hemisphere::Northern
        }
    }

    /// Midday UTC on a date in the local summer of `year`: 15 January in the
    /// south, 15 August in the north.
    pub fn summer_reference(&self, year: i32) -> Option<NaiveDateTime> {
        let month = match self.hemisphere() {
            Hemisphere::Southern => 1,
            Hemisphere::Northern => 8,
        };
        NaiveDate::from_ymd_opt(year, month, 15)?.and_hms_opt(12, 0, 0)
    }

    /// The single UTC offset used for every hour of this location's series.
    ///
    /// Daylight saving is not followed through the year: the offset in force
    /// on the local summer reference date applies all year round.
    pub fn fixed_offset(&self, resolver: &dyn ZoneResolver, year: i32) -> Result<FixedOffset> {
        let zone = resolver.resolve(self)?;
        let reference = self
            .summer_reference(year)
            .ok_or_else(|| Era5Error::InvalidFormat(format!("year {year} out of range")))?;
        Ok(offset_at(zone, &reference))
    }
}

/// Maps a coordinate to the IANA zone whose offset it follows.
pub trait ZoneResolver {
    fn resolve(&self, location: &LocationContext) -> Result<Tz>;
}

/// Point-in-polygon lookup against the bundled timezone boundaries.
pub struct TzfResolver {
    finder: DefaultFinder,
}

impl TzfResolver {
    pub fn new() -> Self {
        TzfResolver {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for TzfResolver {
    fn default() -> Self {
        TzfResolver::new()
    }
}

impl ZoneResolver for TzfResolver {
    fn resolve(&self, location: &LocationContext) -> Result<Tz> {
        let name = self
            .finder
            .get_tz_name(location.longitude, location.latitude);
        if name.is_empty() {
            return Err(Era5Error::TimezoneLookup {
                latitude: location.latitude,
                longitude: location.longitude,
            });
        }
        log::debug!(
            "resolved ({}, {}) to {}",
            location.latitude,
            location.longitude,
            name
        );
        parse_zone(name)
    }
}

/// A zone chosen by the caller, ignoring the coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedZone(pub Tz);

impl NamedZone {
    pub fn parse(name: &str) -> Result<Self> {
        parse_zone(name).map(NamedZone)
    }
}

impl ZoneResolver for NamedZone {
    fn resolve(&self, _location: &LocationContext) -> Result<Tz> {
        Ok(self.0)
    }
}

/// Parse an IANA zone name such as `Australia/Melbourne`.
pub fn parse_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| Era5Error::UnknownTimezone(name.to_string()))
}

/// The zone's UTC offset at a UTC instant, frozen into a fixed offset.
pub fn offset_at(zone: Tz, utc: &NaiveDateTime) -> FixedOffset {
    zone.offset_from_utc_datetime(utc).fix()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i32 = 3600;

    #[test]
    fn test_hemisphere() {
        assert_eq!(LocationContext::new(-37.8, 144.9).hemisphere(), Hemisphere::Southern);
        assert_eq!(LocationContext::new(51.5, -0.1).hemisphere(), Hemisphere::Northern);
        assert_eq!(LocationContext::new(0.0, 30.0).hemisphere(), Hemisphere::Northern);
    }

    #[test]
    fn test_summer_reference_dates() {
        let south = LocationContext::new(-37.8, 144.9).summer_reference(2020).unwrap();
        assert_eq!(south.date(), NaiveDate::from_ymd_opt(2020, 1, 15).unwrap());
        let north = LocationContext::new(40.0, -105.0).summer_reference(2020).unwrap();
        assert_eq!(north.date(), NaiveDate::from_ymd_opt(2020, 8, 15).unwrap());
    }

    #[test]
    fn test_southern_point_uses_january_daylight_offset() {
        let melbourne = LocationContext::new(-37.8, 144.9);
        let zone = NamedZone::parse("Australia/Melbourne").unwrap();
        // AEDT in January, even for series that run through the winter
        let offset = melbourne.fixed_offset(&zone, 2020).unwrap();
        assert_eq!(offset.local_minus_utc(), 11 * HOUR);
    }

    #[test]
    fn test_northern_point_uses_august_daylight_offset() {
        let london = LocationContext::new(51.5, -0.12);
        let zone = NamedZone::parse("Europe/London").unwrap();
        assert_eq!(london.fixed_offset(&zone, 2020).unwrap().local_minus_utc(), HOUR);
    }

    #[test]
    fn test_zone_without_daylight_saving() {
        let brisbane = LocationContext::new(-27.47, 153.03);
        let zone = NamedZone::parse("Australia/Brisbane").unwrap();
        assert_eq!(brisbane.fixed_offset(&zone, 2020).unwrap().local_minus_utc(), 10 * HOUR);
    }

    #[test]
    fn test_unknown_zone_name() {
        assert!(matches!(
            NamedZone::parse("Mars/Olympus_Mons"),
            Err(Era5Error::UnknownTimezone(_))
        ));
    }

    #[test]
    fn test_tzf_resolver_finds_melbourne() {
        let resolver = TzfResolver::new();
        let keilor = LocationContext::new(-37.727706, 144.836476);
        let zone = resolver.resolve(&keilor).unwrap();
        assert_eq!(zone, chrono_tz::Australia::Melbourne);
        assert_eq!(keilor.fixed_offset(&resolver, 1995).unwrap().local_minus_utc(), 11 * HOUR);
    }
}
