//! Single-location aggregation.

use crate::io::{load_variables, read_hourly, write_daily, OutputFormat};
use log::info;
use rda_data::Pipeline;
use rda_era5::location::{LocationContext, NamedZone, TzfResolver};
use std::path::Path;

/// Aggregate one hourly extract into a daily file.
///
/// The fixed offset comes from `timezone` when given, otherwise from the
/// timezone polygon containing the coordinate.
pub async fn run_aggregate(
    input: &str,
    output: &str,
    location: LocationContext,
    timezone: Option<&str>,
    format: OutputFormat,
    variables: Option<&str>,
) -> anyhow::Result<()> {
    let variables = load_variables(variables)?;
    let hourly = read_hourly(Path::new(input), &variables)?;
    info!("Read {} hourly rows from {}", hourly.len(), input);

    let pipeline = Pipeline::new(variables);
    let days = match timezone {
        Some(name) => pipeline.process_location(&location, &NamedZone::parse(name)?, hourly)?,
        None => pipeline.process_location(&location, &TzfResolver::new(), hourly)?,
    };

    let columns = pipeline.variables.output_columns();
    write_daily(Path::new(output), &days, &columns, format)?;
    info!(
        "Wrote {} daily records ({} missing) to {}",
        days.len(),
        days.iter().filter(|d| d.is_missing()).count(),
        output
    );
    Ok(())
}
