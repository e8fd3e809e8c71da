//! Event classifier: annual drought and flood month counts from SPI.

use crate::indicator::{Indicator, IndicatorKind};
use chrono::NaiveDate;
use kdss_core::month_range::YearRange;
use kdss_core::raster::{PropertyValue, Raster};
use kdss_core::record::{Timestamped, TIME_START_KEY, YEAR_KEY};
use kdss_core::PipelineError;
use kdss_utils::dates::epoch_millis;
use log::info;

/// SPI at or below this marks a drought month.
pub const DROUGHT_THRESHOLD: f64 = -1.5;
/// SPI at or above this marks a flood month.
pub const FLOOD_THRESHOLD: f64 = 1.5;

pub const DROUGHT_BAND: &str = "drought_freq";
pub const FLOOD_BAND: &str = "flood_freq";

/// Per-pixel counts of drought and flood months within one year.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualEvent {
    pub year: i32,
    /// January 1st of `year`.
    pub timestamp: NaiveDate,
    /// Number of SPI months that contributed to the counts.
    pub months_observed: usize,
    pub raster: Raster,
}

impl Timestamped for AnnualEvent {
    fn timestamp(&self) -> NaiveDate {
        self.timestamp
    }

    fn raster(&self) -> &Raster {
        &self.raster
    }
}

/// Count drought (SPI <= -1.5) and flood (SPI >= 1.5) months per pixel for
/// each year of `analysis` that has at least one SPI raster.
///
/// Observed months that do not qualify contribute zero, so a pixel never in
/// drought counts 0. Non-finite SPI is not an observation: a pixel with no
/// finite SPI in any month of the year stays NaN in both bands.
pub fn build_annual_events(
    spi: &[Indicator],
    analysis: YearRange,
) -> Result<Vec<AnnualEvent>, PipelineError> {
    if let Some(other) = spi.iter().find(|i| i.kind != IndicatorKind::Spi) {
        return Err(PipelineError::InvalidArgument(format!(
            "annual events need spi rasters, got {}",
            other.kind
        )));
    }

    let mut events = Vec::new();
    for year in analysis.years() {
        let yearly: Vec<&Indicator> = spi
            .iter()
            .filter(|i| i.year == year && !i.raster.is_empty())
            .collect();
        let Some(first) = yearly.first() else {
            continue;
        };
        let grid = *first.raster.grid();
        let mut drought = vec![0.0; grid.len()];
        let mut flood = vec![0.0; grid.len()];
        let mut observed = vec![0u32; grid.len()];
        for indicator in &yearly {
            if *indicator.raster.grid() != grid {
                return Err(PipelineError::InvalidArgument(format!(
                    "spi rasters for {} are on different grids",
                    year
                )));
            }
            let Some(band) = indicator.raster.first_band() else {
                continue;
            };
            for (i, v) in band.values.iter().enumerate() {
                if !v.is_finite() {
                    continue;
                }
                observed[i] += 1;
                if *v <= DROUGHT_THRESHOLD {
                    drought[i] += 1.0;
                } else if *v >= FLOOD_THRESHOLD {
                    flood[i] += 1.0;
                }
            }
        }

        for (i, seen) in observed.iter().enumerate() {
            if *seen == 0 {
                drought[i] = f64::NAN;
                flood[i] = f64::NAN;
            }
        }

        let Some(timestamp) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            continue;
        };
        let mut raster = Raster::from_band(grid, DROUGHT_BAND, drought)?;
        raster.add_band(FLOOD_BAND, flood)?;
        raster.set_property(YEAR_KEY, PropertyValue::Int(year as i64));
        raster.set_property(TIME_START_KEY, PropertyValue::Int(epoch_millis(&timestamp)));
        events.push(AnnualEvent {
            year,
            timestamp,
            months_observed: yearly.len(),
            raster,
        });
    }
    info!(
        "events: {} annual drought/flood rasters for {}-{}",
        events.len(),
        analysis.start,
        analysis.end
    );
    Ok(events)
}
