//! Derived indicators: anomaly, percent of normal and SPI per monthly record.

use crate::baseline::Baseline;
use chrono::NaiveDate;
use kdss_core::month_range::YearRange;
use kdss_core::raster::Raster;
use kdss_core::record::{MonthlySeries, Timestamped, MONTH_KEY, TIME_START_KEY, YEAR_KEY};
use kdss_core::PipelineError;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The indicator computed against the matching calendar-month baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    /// `value - mean`
    Anomaly,
    /// `value / mean * 100`
    Pnr,
    /// `(value - mean) / stddev`
    Spi,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 3] = [IndicatorKind::Anomaly, IndicatorKind::Pnr, IndicatorKind::Spi];

    pub fn band_name(&self) -> &'static str {
        match self {
            IndicatorKind::Anomaly => "anomaly",
            IndicatorKind::Pnr => "pnr",
            IndicatorKind::Spi => "spi",
        }
    }

    /// Per-pixel formula. Zero divisors give non-finite output, never a panic.
    pub fn compute(&self, value: f64, mean: f64, stddev: f64) -> f64 {
        match self {
            IndicatorKind::Anomaly => value - mean,
            IndicatorKind::Pnr => value / mean * 100.0,
            IndicatorKind::Spi => (value - mean) / stddev,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.band_name())
    }
}

impl FromStr for IndicatorKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anomaly" => Ok(IndicatorKind::Anomaly),
            "pnr" => Ok(IndicatorKind::Pnr),
            "spi" => Ok(IndicatorKind::Spi),
            other => Err(PipelineError::InvalidArgument(format!(
                "unknown indicator {}",
                other
            ))),
        }
    }
}

/// A single-band indicator raster derived from one monthly record.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub kind: IndicatorKind,
    pub year: i32,
    pub month: u32,
    pub timestamp: NaiveDate,
    pub raster: Raster,
}

impl Timestamped for Indicator {
    fn timestamp(&self) -> NaiveDate {
        self.timestamp
    }

    fn raster(&self) -> &Raster {
        &self.raster
    }
}

/// Compute `kind` for every non-empty record of `series` in `analysis`.
///
/// Output is in series order, one indicator per qualifying record, tagged with
/// the record's year, month and timestamp.
pub fn build_indicator(
    series: &MonthlySeries,
    baseline: &Baseline,
    analysis: YearRange,
    kind: IndicatorKind,
) -> Result<Vec<Indicator>, PipelineError> {
    let mut out = Vec::new();
    for record in series.in_years(analysis) {
        let Some(values) = record.raster.first_band() else {
            continue;
        };
        let mean = baseline.mean_for(record.month);
        let stddev = baseline.stddev_for(record.month);
        let grid = *record.raster.grid();
        if *mean.grid() != grid || *stddev.grid() != grid {
            return Err(PipelineError::InvalidArgument(format!(
                "baseline grid does not match record {}-{:02}",
                record.year, record.month
            )));
        }
        let (Some(m), Some(s)) = (mean.first_band(), stddev.first_band()) else {
            continue;
        };
        let computed = values
            .values
            .iter()
            .zip(m.values.iter())
            .zip(s.values.iter())
            .map(|((v, m), s)| kind.compute(*v, *m, *s))
            .collect();
        let raster = Raster::from_band(grid, kind.band_name(), computed)?.copy_properties(
            &record.raster,
            &[TIME_START_KEY, YEAR_KEY, MONTH_KEY],
        );
        out.push(Indicator {
            kind,
            year: record.year,
            month: record.month,
            timestamp: record.timestamp,
            raster,
        });
    }
    info!(
        "indicator: {} {} rasters for {}-{}",
        out.len(),
        kind,
        analysis.start,
        analysis.end
    );
    Ok(out)
}
