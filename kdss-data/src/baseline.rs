//! Baseline estimator: per-calendar-month climatology over a reference window.

use kdss_core::month_range::YearRange;
use kdss_core::raster::{reduce_collection, Raster, Reducer};
use kdss_core::record::MonthlySeries;
use kdss_core::PipelineError;
use kdss_utils::bands::month_band_name;
use log::{info, warn};

/// Twelve mean and twelve standard-deviation bands, `prec_01` .. `prec_12`.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    mean: Raster,
    stddev: Raster,
    reference: YearRange,
}

impl Baseline {
    /// Packed mean raster with one band per calendar month.
    pub fn mean(&self) -> &Raster {
        &self.mean
    }

    /// Packed standard-deviation raster with one band per calendar month.
    pub fn stddev(&self) -> &Raster {
        &self.stddev
    }

    pub fn reference(&self) -> YearRange {
        self.reference
    }

    /// Mean band for `month`; zero-valued if the band is somehow missing.
    pub fn mean_for(&self, month: u32) -> Raster {
        self.mean.band_or_zero(&month_band_name(month))
    }

    /// Standard-deviation band for `month`; zero-valued if missing.
    pub fn stddev_for(&self, month: u32) -> Raster {
        self.stddev.band_or_zero(&month_band_name(month))
    }
}

/// Compute the climatological baseline from the records of `series` that fall
/// in `reference`, grouping by calendar month regardless of year.
///
/// Every calendar month is present in the output. A month with no reference
/// records gets zero-valued mean and stddev bands. Pixels without a single
/// finite sample stay `NaN`.
pub fn build_baseline(series: &MonthlySeries, reference: YearRange) -> Result<Baseline, PipelineError> {
    let grid = series
        .records()
        .first()
        .map(|r| *r.raster.grid())
        .unwrap_or_default();
    let mut mean = Raster::empty(grid);
    let mut stddev = Raster::empty(grid);

    for month in 1..=12u32 {
        let band = month_band_name(month);
        let samples: Vec<Raster> = series
            .in_years(reference)
            .filter(|r| r.month == month)
            .map(|r| r.raster.map(&band, |v| v))
            .filter(|r| !r.is_empty())
            .collect();
        let refs: Vec<&Raster> = samples.iter().collect();

        if refs.is_empty() {
            warn!(
                "baseline: no reference data for {} in {}-{}, using zeros",
                band, reference.start, reference.end
            );
            mean.add_band(&band, vec![0.0; grid.len()])?;
            stddev.add_band(&band, vec![0.0; grid.len()])?;
            continue;
        }

        let month_mean = reduce_collection(&refs, Reducer::Mean)?;
        let month_std = reduce_collection(&refs, Reducer::StdDev)?;
        mean.add_band(&band, band_values(month_mean, &band))?;
        stddev.add_band(&band, band_values(month_std, &band))?;
    }

    info!(
        "baseline: {} bands from {} reference records ({}-{})",
        mean.bands().len(),
        series.in_years(reference).count(),
        reference.start,
        reference.end
    );
    Ok(Baseline {
        mean,
        stddev,
        reference,
    })
}

fn band_values(raster: Raster, band: &str) -> Vec<f64> {
    raster
        .band(band)
        .map(|b| b.values.clone())
        .unwrap_or_default()
}
