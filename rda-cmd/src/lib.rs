//! Command implementations for the RDA CLI.
//!
//! Provides subcommands for aggregating hourly ERA5-Land extracts into
//! daily records, for one location or a whole gauge registry, and for
//! deriving climate attributes from the daily records.

use clap::Subcommand;
use rda_era5::location::LocationContext;

pub mod aggregate;
pub mod attributes;
pub mod batch;
pub mod io;

use io::OutputFormat;

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate one location's hourly extract into local daily records
    Aggregate {
        /// Hourly input (.csv or .json, optionally .gz)
        #[arg(short = 'i', long)]
        input: String,

        /// Output path for the daily records
        #[arg(short = 'o', long)]
        output: String,

        /// Latitude of the extraction point in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude of the extraction point in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// IANA zone to take the offset from instead of looking it up
        #[arg(long)]
        timezone: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// TOML variable configuration (defaults to the ERA5-Land set)
        #[arg(long)]
        variables: Option<String>,
    },

    /// Aggregate every gauge in a registry, one daily CSV per gauge
    Batch {
        /// Gauge registry CSV: gauge_id,name,lat,lon
        #[arg(short = 'g', long)]
        gauges: String,

        /// Directory holding <gauge_id>.csv hourly extracts
        #[arg(short = 'i', long)]
        input_dir: String,

        /// Directory the daily CSVs are written to
        #[arg(short = 'o', long)]
        output_dir: String,

        /// Gauges processed at the same time
        #[arg(short = 'j', long, default_value_t = 4)]
        jobs: usize,

        /// TOML variable configuration (defaults to the ERA5-Land set)
        #[arg(long)]
        variables: Option<String>,
    },

    /// Compute the climate attribute table from daily CSVs
    Attributes {
        /// Gauge registry CSV: gauge_id,name,lat,lon
        #[arg(short = 'g', long)]
        gauges: String,

        /// Directory holding <gauge_id>.csv daily records
        #[arg(short = 'd', long)]
        daily_dir: String,

        /// Output path for the attribute CSV
        #[arg(short = 'o', long)]
        output: String,

        /// First day of the period (YYYY-MM-DD, default 1981-01-01)
        #[arg(long)]
        start: Option<String>,

        /// Last day of the period (YYYY-MM-DD, default 2020-12-31)
        #[arg(long)]
        end: Option<String>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Aggregate {
            input,
            output,
            lat,
            lon,
            timezone,
            format,
            variables,
        } => {
            aggregate::run_aggregate(
                &input,
                &output,
                LocationContext::new(lat, lon),
                timezone.as_deref(),
                format,
                variables.as_deref(),
            )
            .await
        }
        Command::Batch {
            gauges,
            input_dir,
            output_dir,
            jobs,
            variables,
        } => {
            let summary =
                batch::run_batch(&gauges, &input_dir, &output_dir, jobs, variables.as_deref())
                    .await?;
            if summary.processed.is_empty() && !summary.failed.is_empty() {
                anyhow::bail!("all {} gauges failed", summary.failed.len());
            }
            Ok(())
        }
        Command::Attributes {
            gauges,
            daily_dir,
            output,
            start,
            end,
        } => {
            attributes::run_attributes(
                &gauges,
                &daily_dir,
                &output,
                start.as_deref(),
                end.as_deref(),
            )
            .await
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeDelta, TimeZone, Utc};
    use rda_utils::dates::format_timestamp;
    use tempfile::TempDir;

    /// Empty directory, removed when the returned handle drops.
    pub fn scratch_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    /// `n` raw hours from 2020-01-01T00Z at 15 °C with 0.5 mm/h of rain.
    pub fn hourly_csv(n: usize) -> String {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut text = String::from("time,temperature_2m,total_precipitation\n");
        for i in 0..n {
            let time = start + TimeDelta::hours(i as i64);
            let k = if i % 24 == 0 { 24 } else { i % 24 };
            text.push_str(&format!(
                "{},288.15,{}\n",
                format_timestamp(&time),
                0.0005 * k as f64
            ));
        }
        text
    }
}
