//! Reading hourly extracts and writing daily records.

use anyhow::{bail, Context};
use clap::ValueEnum;
use flate2::read::GzDecoder;
use rda_era5::daily::DailyRecord;
use rda_era5::hourly::HourlyObservation;
use rda_era5::variable::VariableSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// File suffixes tried, in order, when looking up a gauge's hourly input.
pub const HOURLY_SUFFIXES: [&str; 4] = [".csv", ".csv.gz", ".json", ".json.gz"];

/// Layout of an hourly input file.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HourlyFormat {
    Csv,
    Json,
}

impl HourlyFormat {
    /// Pick the layout from a file name, ignoring a trailing `.gz`.
    pub fn from_file_name(name: &str) -> anyhow::Result<(Self, bool)> {
        let name = name.to_ascii_lowercase();
        let (base, gzipped) = match name.strip_suffix(".gz") {
            Some(base) => (base, true),
            None => (name.as_str(), false),
        };
        let format = if base.ends_with(".csv") {
            HourlyFormat::Csv
        } else if base.ends_with(".json") {
            HourlyFormat::Json
        } else {
            bail!("unsupported hourly input {name:?}; expected .csv, .json or either with .gz");
        };
        Ok((format, gzipped))
    }
}

/// Layout of the daily output.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Load a variable configuration file, or the built-in ERA5-Land set.
pub fn load_variables(path: Option<&str>) -> anyhow::Result<VariableSet> {
    let Some(path) = path else {
        return Ok(VariableSet::era5_land());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading variable configuration {path}"))?;
    let set = VariableSet::from_toml_str(&text)
        .with_context(|| format!("loading variable configuration {path}"))?;
    Ok(set)
}

pub fn read_hourly_from<R: Read>(
    reader: R,
    format: HourlyFormat,
    variables: &VariableSet,
) -> anyhow::Result<Vec<HourlyObservation>> {
    let rows = match format {
        HourlyFormat::Csv => HourlyObservation::parse_csv(reader, variables)?,
        HourlyFormat::Json => HourlyObservation::parse_json(reader)?,
    };
    Ok(rows)
}

/// Read an hourly extract, decompressing `.gz` files on the fly.
pub fn read_hourly(path: &Path, variables: &VariableSet) -> anyhow::Result<Vec<HourlyObservation>> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let (format, gzipped) = HourlyFormat::from_file_name(name)?;
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    read_hourly_from(reader, format, variables)
        .with_context(|| format!("parsing hourly input {}", path.display()))
}

/// First existing `<dir>/<gauge_id><suffix>` among [`HOURLY_SUFFIXES`].
pub fn find_hourly_input(dir: &Path, gauge_id: &str) -> Option<PathBuf> {
    HOURLY_SUFFIXES
        .iter()
        .map(|suffix| dir.join(format!("{gauge_id}{suffix}")))
        .find(|path| path.is_file())
}

pub fn write_daily_to<W: Write>(
    writer: W,
    records: &[DailyRecord],
    columns: &[String],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv => DailyRecord::write_csv(records, columns, writer)?,
        OutputFormat::Json => DailyRecord::write_json(records, writer)?,
    }
    Ok(())
}

pub fn write_daily(
    path: &Path,
    records: &[DailyRecord],
    columns: &[String],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_daily_to(&mut writer, records, columns, format)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    const HOURLY_CSV: &str = "\
time,temperature_2m,total_precipitation
2020-01-01T00:00:00Z,290.15,0.001
2020-01-01T01:00:00Z,289.15,
";

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(HourlyFormat::from_file_name("g1.csv").unwrap(), (HourlyFormat::Csv, false));
        assert_eq!(HourlyFormat::from_file_name("G1.CSV.GZ").unwrap(), (HourlyFormat::Csv, true));
        assert_eq!(HourlyFormat::from_file_name("g1.json.gz").unwrap(), (HourlyFormat::Json, true));
        assert!(HourlyFormat::from_file_name("g1.nc").is_err());
        assert!(HourlyFormat::from_file_name("g1.gz").is_err());
    }

    #[test]
    fn test_read_hourly_from_csv() {
        let rows = read_hourly_from(HOURLY_CSV.as_bytes(), HourlyFormat::Csv, &VariableSet::era5_land())
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("total_precipitation"), None);
    }

    #[test]
    fn test_read_gzipped_csv() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(HOURLY_CSV.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        let rows = read_hourly_from(
            GzDecoder::new(compressed.as_slice()),
            HourlyFormat::Csv,
            &VariableSet::era5_land(),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("temperature_2m"), Some(290.15));
    }

    #[test]
    fn test_write_daily_json() {
        let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let mut record = DailyRecord::complete(date);
        record.set("total_precipitation_sum", Some(1.25));
        let mut buf = Vec::new();
        write_daily_to(&mut buf, &[record], &[], OutputFormat::Json).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"date\": \"2020-01-02\""));
        assert!(text.contains("\"total_precipitation_sum\": 1.25"));
        let back: Vec<DailyRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(back[0].get("total_precipitation_sum"), Some(1.25));
    }

    #[test]
    fn test_load_default_variables() {
        assert_eq!(load_variables(None).unwrap(), VariableSet::era5_land());
        assert!(load_variables(Some("/nonexistent/variables.toml")).is_err());
    }
}
