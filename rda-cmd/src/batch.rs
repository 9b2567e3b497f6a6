//! Many gauges at once, each one independent of the others.

use crate::io::{find_hourly_input, load_variables, read_hourly, write_daily, OutputFormat};
use anyhow::Context;
use chrono_tz::Tz;
use log::{info, warn};
use rda_data::Pipeline;
use rda_era5::gauge::Gauge;
use rda_era5::location::{LocationContext, NamedZone, TzfResolver, ZoneResolver};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

/// Outcome of one gauge's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeSummary {
    pub gauge_id: String,
    pub days: usize,
    pub missing_days: usize,
}

/// Outcome of a batch. A failing gauge never stops the others.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: Vec<GaugeSummary>,
    pub failed: Vec<String>,
}

type GaugeOutcome = Result<GaugeSummary, (String, anyhow::Error)>;

/// Read, aggregate and write one gauge. Runs on a blocking thread.
fn process_gauge(
    gauge: &Gauge,
    location: LocationContext,
    zone: Tz,
    pipeline: &Pipeline,
    input_dir: &Path,
    output_dir: &Path,
) -> anyhow::Result<GaugeSummary> {
    let input = find_hourly_input(input_dir, &gauge.gauge_id)
        .with_context(|| format!("no hourly input for {} in {}", gauge.gauge_id, input_dir.display()))?;
    let hourly = read_hourly(&input, &pipeline.variables)?;
    let days = pipeline.process_location(&location, &NamedZone(zone), hourly)?;

    let output = output_dir.join(format!("{}.csv", gauge.gauge_id));
    write_daily(&output, &days, &pipeline.variables.output_columns(), OutputFormat::Csv)?;
    Ok(GaugeSummary {
        gauge_id: gauge.gauge_id.clone(),
        days: days.len(),
        missing_days: days.iter().filter(|d| d.is_missing()).count(),
    })
}

/// Aggregate every gauge in the registry, at most `jobs` at a time.
///
/// Zones are looked up on the calling task; the per-gauge work runs on
/// tokio's blocking pool.
pub async fn run_batch(
    gauges_csv: &str,
    input_dir: &str,
    output_dir: &str,
    jobs: usize,
    variables: Option<&str>,
) -> anyhow::Result<BatchSummary> {
    let registry = std::fs::read_to_string(gauges_csv)
        .with_context(|| format!("reading gauge registry {gauges_csv}"))?;
    let gauges = Gauge::parse_gauge_csv(&registry)?;
    let pipeline = Arc::new(Pipeline::new(load_variables(variables)?));
    let input_dir = PathBuf::from(input_dir);
    let output_dir = PathBuf::from(output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    info!(
        "Processing {} gauges from {} with {} jobs",
        gauges.len(),
        input_dir.display(),
        jobs
    );

    let resolver = TzfResolver::new();
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();
    let mut summary = BatchSummary::default();
    let mut names = HashMap::new();

    for gauge in gauges {
        let Some(location) = gauge.location() else {
            warn!("Skipping {}: lat/lon not set", gauge.gauge_id);
            summary.failed.push(gauge.gauge_id);
            continue;
        };
        let zone = match resolver.resolve(&location) {
            Ok(zone) => zone,
            Err(e) => {
                warn!("Skipping {}: {}", gauge.gauge_id, e);
                summary.failed.push(gauge.gauge_id);
                continue;
            }
        };
        let permit = semaphore.clone().acquire_owned().await?;
        let pipeline = pipeline.clone();
        let input_dir = input_dir.clone();
        let output_dir = output_dir.clone();
        let gauge_id = gauge.gauge_id.clone();
        let handle = tasks.spawn_blocking(move || {
            let _permit = permit;
            process_gauge(&gauge, location, zone, &pipeline, &input_dir, &output_dir)
                .map_err(|e| (gauge.gauge_id.clone(), e))
        });
        names.insert(handle.id(), gauge_id);
    }

    collect_outcomes(&mut tasks, &names, &mut summary).await;

    summary.processed.sort_by(|a, b| a.gauge_id.cmp(&b.gauge_id));
    summary.failed.sort();
    info!(
        "Batch complete: {} gauges written to {}, {} failed",
        summary.processed.len(),
        output_dir.display(),
        summary.failed.len()
    );
    Ok(summary)
}

/// Drain finished gauge tasks into `summary`. A task that panicked or was
/// cancelled counts as failed under the gauge id it was spawned for.
async fn collect_outcomes(
    tasks: &mut JoinSet<GaugeOutcome>,
    names: &HashMap<Id, String>,
    summary: &mut BatchSummary,
) {
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, Ok(done))) => {
                info!(
                    "{}: {} days ({} missing)",
                    done.gauge_id, done.days, done.missing_days
                );
                summary.processed.push(done);
            }
            Ok((_, Err((gauge_id, e)))) => {
                warn!("Failed {}: {:#}", gauge_id, e);
                summary.failed.push(gauge_id);
            }
            Err(e) => {
                let gauge_id = names
                    .get(&e.id())
                    .cloned()
                    .unwrap_or_else(|| format!("task {}", e.id()));
                warn!("Failed {}: task did not finish: {}", gauge_id, e);
                summary.failed.push(gauge_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hourly_csv, scratch_dir};

    #[tokio::test]
    async fn test_batch_skips_failing_gauge() {
        let dir = scratch_dir();
        let input_dir = dir.path().join("hourly");
        let output_dir = dir.path().join("daily");
        std::fs::create_dir_all(&input_dir).unwrap();
        std::fs::write(input_dir.join("ausvic_230200.csv"), hourly_csv(72)).unwrap();
        std::fs::write(input_dir.join("ausvic_230205.csv"), "time,temperature_2m\nyesterday,1\n")
            .unwrap();
        let registry = dir.path().join("gauges.csv");
        std::fs::write(
            &registry,
            "gauge_id,name,lat,lon\n\
             ausvic_230200,Maribyrnong River at Keilor,-37.7277,144.8365\n\
             ausvic_230205,Deep Creek at Bulla,-37.6322,144.8019\n\
             ausvic_missing,No Data Creek,-37.5,144.5\n",
        )
        .unwrap();

        let summary = run_batch(
            registry.to_str().unwrap(),
            input_dir.to_str().unwrap(),
            output_dir.to_str().unwrap(),
            2,
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            summary.processed,
            vec![GaugeSummary {
                gauge_id: "ausvic_230200".to_string(),
                days: 2,
                missing_days: 0,
            }]
        );
        assert_eq!(summary.failed, vec!["ausvic_230205", "ausvic_missing"]);
        assert!(output_dir.join("ausvic_230200.csv").is_file());
        assert!(!output_dir.join("ausvic_230205.csv").exists());
    }

    #[tokio::test]
    async fn test_batch_skips_gauge_without_coordinates() {
        let dir = scratch_dir();
        let input_dir = dir.path().join("hourly");
        let output_dir = dir.path().join("daily");
        std::fs::create_dir_all(&input_dir).unwrap();
        std::fs::write(input_dir.join("ausvic_230200.csv"), hourly_csv(72)).unwrap();
        std::fs::write(input_dir.join("ausvic_230213.csv"), hourly_csv(72)).unwrap();
        let registry = dir.path().join("gauges.csv");
        std::fs::write(
            &registry,
            "gauge_id,name,lat,lon\n\
             ausvic_230200,Maribyrnong River at Keilor,-37.7277,144.8365\n\
             ausvic_230213,Turritable Creek,,\n",
        )
        .unwrap();

        let summary = run_batch(
            registry.to_str().unwrap(),
            input_dir.to_str().unwrap(),
            output_dir.to_str().unwrap(),
            1,
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.processed.len(), 1);
        assert_eq!(summary.processed[0].gauge_id, "ausvic_230200");
        assert_eq!(summary.failed, vec!["ausvic_230213"]);
        assert!(!output_dir.join("ausvic_230213.csv").exists());
    }

    #[tokio::test]
    async fn test_collect_outcomes_records_panicked_gauge() {
        let mut tasks: JoinSet<GaugeOutcome> = JoinSet::new();
        let mut names = HashMap::new();
        let ok = tasks.spawn_blocking(|| {
            Ok(GaugeSummary {
                gauge_id: "ausvic_230200".to_string(),
                days: 3,
                missing_days: 1,
            })
        });
        names.insert(ok.id(), "ausvic_230200".to_string());
        let panicked = tasks.spawn_blocking(|| -> GaugeOutcome { panic!("worker fell over") });
        names.insert(panicked.id(), "ausvic_230205".to_string());

        let mut summary = BatchSummary::default();
        collect_outcomes(&mut tasks, &names, &mut summary).await;

        assert_eq!(summary.processed.len(), 1);
        assert_eq!(summary.processed[0].gauge_id, "ausvic_230200");
        assert_eq!(summary.failed, vec!["ausvic_230205"]);
    }

    #[tokio::test]
    async fn test_batch_requires_registry() {
        let dir = scratch_dir();
        let result = run_batch(
            dir.path().join("absent.csv").to_str().unwrap(),
            dir.path().to_str().unwrap(),
            dir.path().to_str().unwrap(),
            1,
            None,
        )
        .await;
        assert!(result.is_err());
    }
}
