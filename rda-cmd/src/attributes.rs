//! Climate attribute table built from per-gauge daily files.

use anyhow::Context;
use log::{info, warn};
use rda_data::climate::{climate_indices, ClimateColumns, ClimateIndices, ClimatePeriod};
use rda_era5::daily::DailyRecord;
use rda_era5::gauge::Gauge;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

pub fn write_attributes<W: Write>(rows: &[ClimateIndices], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Resolve the optional period bounds, defaulting to 1981-2020.
pub fn period_from(start: Option<&str>, end: Option<&str>) -> anyhow::Result<ClimatePeriod> {
    let mut period = ClimatePeriod::caravan();
    if let Some(start) = start {
        period.start = rda_utils::dates::parse_date(start).context("parsing --start")?;
    }
    if let Some(end) = end {
        period.end = rda_utils::dates::parse_date(end).context("parsing --end")?;
    }
    if period.start > period.end {
        anyhow::bail!("period starts {} after it ends {}", period.start, period.end);
    }
    Ok(period)
}

/// Compute climate indices for every gauge with a daily file in `daily_dir`.
///
/// Gauges without a file, or without data in the period, are logged and
/// left out of the table.
pub async fn run_attributes(
    gauges_csv: &str,
    daily_dir: &str,
    output: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> anyhow::Result<()> {
    let registry = std::fs::read_to_string(gauges_csv)
        .with_context(|| format!("reading gauge registry {gauges_csv}"))?;
    let gauges = Gauge::parse_gauge_csv(&registry)?;
    let period = period_from(start, end)?;
    let columns = ClimateColumns::default();

    info!(
        "Computing climate indices for {} gauges over {} to {}",
        gauges.len(),
        period.start,
        period.end
    );

    let mut rows = Vec::new();
    for gauge in &gauges {
        let path = Path::new(daily_dir).join(format!("{}.csv", gauge.gauge_id));
        if !path.is_file() {
            warn!("Skipping {}: {} not found", gauge.gauge_id, path.display());
            continue;
        }
        let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let records = DailyRecord::parse_csv(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;
        match climate_indices(&gauge.gauge_id, &records, &columns, &period) {
            Some(indices) => rows.push(indices),
            None => warn!("Skipping {}: no data in period", gauge.gauge_id),
        }
    }

    let file = File::create(output).with_context(|| format!("creating {output}"))?;
    write_attributes(&rows, file)?;
    info!("Wrote climate indices for {} gauges to {}", rows.len(), output);
    Ok(())
}
