//! The `dashboard` and `series` commands: run the pipeline over a local
//! database and write the results.

use crate::config::DashboardConfig;
use crate::region::resolve_region;
use crate::retry::retry_with_backoff;
use kdss_core::region::Region;
use kdss_core::PipelineError;
use kdss_data::aggregate::{reduce_region_mean, RegionScalarSeries};
use kdss_data::dashboard::build_dashboard;
use kdss_data::indicator::IndicatorKind;
use kdss_data::pipeline::{Collections, Pipeline};
use kdss_data::session::Session;
use kdss_db::Database;
use log::info;
use std::rc::Rc;

/// Build an in-memory database from grid and daily CSV files.
pub fn load_database(grid_csv: &str, daily_csv: &str) -> anyhow::Result<Database> {
    let db = Database::new()?;
    db.load_grid(&std::fs::read_to_string(grid_csv)?)?;
    db.load_daily(&std::fs::read_to_string(daily_csv)?)?;
    match db.query_date_span()? {
        Some(span) => info!(
            "Loaded {} days of precipitation ({} to {})",
            span.days, span.first, span.last
        ),
        None => info!("Loaded no precipitation data from {}", daily_csv),
    }
    Ok(db)
}

/// Resolve the region and evaluate the pipeline, retrying source failures.
pub async fn evaluate(
    session: &Session<Database>,
    config: &DashboardConfig,
) -> anyhow::Result<(Region, Rc<Collections>)> {
    let region = resolve_region(&config.region)?;
    let pipeline = Pipeline::new(region.clone()).with_settings(config.settings());
    let collections = retry_with_backoff(&config.retry, || {
        std::future::ready(session.collections(&pipeline).map_err(anyhow::Error::from))
    })
    .await?;
    Ok((region, collections))
}

/// Run the pipeline and write the dashboard model as JSON to `output`.
pub async fn run_dashboard(
    grid_csv: &str,
    daily_csv: &str,
    config: &DashboardConfig,
    output: &str,
) -> anyhow::Result<()> {
    config.validate()?;
    let session = Session::new(load_database(grid_csv, daily_csv)?);
    let (region, collections) = evaluate(&session, config).await?;
    let dashboard = build_dashboard(&collections, &region, &config.request())?;

    let json = serde_json::to_string_pretty(&dashboard)?;
    std::fs::write(output, json)?;
    info!(
        "Dashboard complete. {} layers, {} charts written to {}",
        dashboard.layers.len(),
        dashboard.charts.len(),
        output
    );
    Ok(())
}

/// Which chart series to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Indicator(IndicatorKind),
    Rainfall,
}

impl std::str::FromStr for SeriesKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rainfall") {
            Ok(SeriesKind::Rainfall)
        } else {
            s.parse().map(SeriesKind::Indicator)
        }
    }
}

/// Region means of one series over the analysis years.
pub fn chart_series(
    collections: &Collections,
    region: &Region,
    config: &DashboardConfig,
    kind: SeriesKind,
) -> Result<RegionScalarSeries, PipelineError> {
    match kind {
        SeriesKind::Indicator(kind) => reduce_region_mean(
            collections.indicators(kind),
            region,
            kind.band_name(),
            config.scale,
        ),
        SeriesKind::Rainfall => {
            collections.rainfall_series(region, config.analysis_years, config.scale)
        }
    }
}

/// Run the pipeline and write one chart series as `date,value` CSV.
pub async fn run_series(
    grid_csv: &str,
    daily_csv: &str,
    config: &DashboardConfig,
    kind: SeriesKind,
    output: &str,
) -> anyhow::Result<()> {
    config.validate()?;
    let session = Session::new(load_database(grid_csv, daily_csv)?);
    let (region, collections) = evaluate(&session, config).await?;
    let series = chart_series(&collections, &region, config, kind)?;
    if series.is_empty() {
        log::warn!("No data for {:?} over {}", kind, region.name);
    }

    let mut wtr = csv::Writer::from_path(output)?;
    for point in series.points() {
        wtr.serialize(point)?;
    }
    wtr.flush()?;
    info!("Series complete. {} points written to {}", series.len(), output);
    Ok(())
}
