//! Dashboard assembly: map layers with visualisation presets, and charts.
//!
//! Everything here is serialisable so the host UI (or the CLI) can hand it to
//! a tile renderer and a line-chart widget as JSON.

use crate::aggregate::{composite_mean, reduce_region_mean, RegionScalarSeries};
use crate::events::{DROUGHT_BAND, FLOOD_BAND};
use crate::indicator::IndicatorKind;
use crate::pipeline::Collections;
use kdss_core::month_range::YearRange;
use kdss_core::raster::Raster;
use kdss_core::region::Region;
use kdss_core::PipelineError;
use log::info;
use serde::{Deserialize, Serialize};

/// Map layers the dashboard can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Climatology,
    Spi,
    Anomaly,
    Pnr,
    HeavyRain,
    Drought,
    Flood,
}

impl LayerKind {
    pub const ALL: [LayerKind; 7] = [
        LayerKind::Climatology,
        LayerKind::Spi,
        LayerKind::Anomaly,
        LayerKind::Pnr,
        LayerKind::HeavyRain,
        LayerKind::Drought,
        LayerKind::Flood,
    ];

    /// Fixed colour stretch for the layer.
    pub fn preset(&self) -> VisParams {
        match self {
            LayerKind::Climatology => VisParams::new(0.0, 200.0, &["white", "blue"]),
            LayerKind::Spi => VisParams::new(-2.0, 2.0, &["brown", "white", "blue"]),
            LayerKind::Anomaly => VisParams::new(-100.0, 100.0, &["red", "white", "green"]),
            LayerKind::Pnr => VisParams::new(0.0, 200.0, &["red", "white", "blue"]),
            LayerKind::HeavyRain => VisParams::new(0.0, 20.0, &["white", "purple"]),
            LayerKind::Drought => VisParams::new(0.0, 12.0, &["white", "orange", "red"]),
            LayerKind::Flood => VisParams::new(0.0, 12.0, &["white", "lightblue", "blue"]),
        }
    }

    pub fn title(&self, year: i32, month: u32) -> String {
        match self {
            LayerKind::Climatology => format!("Climatology Month {}", month),
            LayerKind::Spi => format!("SPI Mean {}", year),
            LayerKind::Anomaly => format!("Anomaly {} Month {}", year, month),
            LayerKind::Pnr => format!("Percent of Normal {} Month {}", year, month),
            LayerKind::HeavyRain => format!("HeavyRain Days {}", year),
            LayerKind::Drought => format!("Drought Frequency {}", year),
            LayerKind::Flood => format!("Flood Frequency {}", year),
        }
    }
}

/// Colour stretch handed to the tile renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
}

impl VisParams {
    fn new(min: f64, max: f64, palette: &[&str]) -> Self {
        VisParams {
            min,
            max,
            palette: palette.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Which layers the user has switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerToggles {
    pub climatology: bool,
    pub spi: bool,
    pub anomaly: bool,
    pub pnr: bool,
    pub heavy_rain: bool,
    pub drought: bool,
    pub flood: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        LayerToggles {
            climatology: true,
            spi: true,
            anomaly: true,
            pnr: true,
            heavy_rain: true,
            drought: true,
            flood: true,
        }
    }
}

impl LayerToggles {
    pub fn is_enabled(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Climatology => self.climatology,
            LayerKind::Spi => self.spi,
            LayerKind::Anomaly => self.anomaly,
            LayerKind::Pnr => self.pnr,
            LayerKind::HeavyRain => self.heavy_rain,
            LayerKind::Drought => self.drought,
            LayerKind::Flood => self.flood,
        }
    }
}

/// The user's current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    pub year: i32,
    pub month: u32,
    pub analysis_years: YearRange,
    pub toggles: LayerToggles,
    pub scale: f64,
}

/// A raster clipped to the region, ready for tiling.
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub title: String,
    pub vis: VisParams,
    pub raster: Raster,
}

/// A line chart; `no_data` is set instead of plotting an empty series.
#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub title: String,
    pub y_axis: String,
    pub no_data: bool,
    pub series: RegionScalarSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub region: String,
    pub year: i32,
    pub month: u32,
    pub layers: Vec<Layer>,
    pub charts: Vec<Chart>,
}

/// Assemble the enabled map layers and the time-series charts.
///
/// A layer whose source collection has nothing for the selected year/month is
/// left out rather than drawn as zeros.
pub fn build_dashboard(
    collections: &Collections,
    region: &Region,
    request: &DashboardRequest,
) -> Result<Dashboard, PipelineError> {
    if !(1..=12).contains(&request.month) {
        return Err(PipelineError::InvalidArgument(format!(
            "month must be 1-12, got {}",
            request.month
        )));
    }
    let (year, month) = (request.year, request.month);

    let mut layers = Vec::new();
    for kind in LayerKind::ALL {
        if !request.toggles.is_enabled(kind) {
            continue;
        }
        if let Some(raster) = layer_raster(collections, kind, year, month)? {
            layers.push(Layer {
                kind,
                title: kind.title(year, month),
                vis: kind.preset(),
                raster: raster.clip(region),
            });
        }
    }

    let span = format!("{}-{}", request.analysis_years.start, request.analysis_years.end);
    let mut charts = Vec::new();
    for (kind, title, y_axis) in [
        (IndicatorKind::Anomaly, "Rainfall Anomaly", "Anomaly (mm)"),
        (IndicatorKind::Spi, "SPI Monthly Mean", "SPI"),
        (IndicatorKind::Pnr, "Percent of Normal Rainfall", "PNR (%)"),
    ] {
        let series = reduce_region_mean(
            collections.indicators(kind),
            region,
            kind.band_name(),
            request.scale,
        )?;
        charts.push(chart(format!("{} - {} ({})", title, region.name, span), y_axis, series));
    }
    let rain = collections.rainfall_series(region, request.analysis_years, request.scale)?;
    charts.push(chart(
        format!("Monthly Rainfall - {} ({})", region.name, span),
        "Rainfall (mm)",
        rain,
    ));

    info!(
        "dashboard: {} layers, {} charts for {} {}-{:02}",
        layers.len(),
        charts.len(),
        region.name,
        year,
        month
    );
    Ok(Dashboard {
        region: region.name.clone(),
        year,
        month,
        layers,
        charts,
    })
}

fn chart(title: String, y_axis: &str, series: RegionScalarSeries) -> Chart {
    Chart {
        title,
        y_axis: y_axis.to_string(),
        no_data: series.is_empty(),
        series,
    }
}

fn layer_raster(
    collections: &Collections,
    kind: LayerKind,
    year: i32,
    month: u32,
) -> Result<Option<Raster>, PipelineError> {
    let raster = match kind {
        LayerKind::Climatology => Some(collections.baseline.mean_for(month)),
        LayerKind::Spi => {
            let yearly: Vec<&Raster> = collections
                .spi
                .iter()
                .filter(|i| i.year == year)
                .map(|i| &i.raster)
                .collect();
            composite_mean(&yearly)?
        }
        LayerKind::Anomaly | LayerKind::Pnr => {
            let indicator_kind = if kind == LayerKind::Anomaly {
                IndicatorKind::Anomaly
            } else {
                IndicatorKind::Pnr
            };
            collections
                .indicators(indicator_kind)
                .iter()
                .find(|i| i.year == year && i.month == month)
                .map(|i| i.raster.clone())
        }
        LayerKind::HeavyRain => collections
            .heavy_rain
            .iter()
            .find(|h| h.year == year)
            .map(|h| h.raster.clone()),
        LayerKind::Drought | LayerKind::Flood => {
            let band = if kind == LayerKind::Drought {
                DROUGHT_BAND
            } else {
                FLOOD_BAND
            };
            collections
                .annual
                .iter()
                .find(|e| e.year == year)
                .and_then(|e| e.raster.select(band))
        }
    };
    Ok(raster.filter(|r| !r.is_empty() && !r.grid().is_empty()))
}
