//! Region aggregator: spatial means of a band over a region, per timestamp.

use chrono::NaiveDate;
use kdss_core::raster::{reduce_collection, GridSpec, Raster, Reducer};
use kdss_core::record::Timestamped;
use kdss_core::region::{Bounds, Region};
use kdss_core::PipelineError;
use log::{debug, info};
use serde::Serialize;

/// Linear resolution used by the dashboard charts, in metres.
pub const DEFAULT_SCALE_METERS: f64 = 5000.0;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// A single (date, value) pair used for line chart data points.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DateValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chronological region means. Empty means "no data", never zero.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct RegionScalarSeries(pub Vec<DateValue>);

impl RegionScalarSeries {
    pub fn points(&self) -> &[DateValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Mean of the finite samples of `band` over `region` at `scale` metres.
///
/// At or below the native pixel size every pixel whose centre lies in the
/// region is sampled. At coarser scales the region is sampled on a regular
/// lattice spaced `scale` apart and each lattice point reads the pixel under
/// it. A region too small to catch a pixel centre or a lattice point falls
/// back to the pixels under its bounding box. Non-finite samples are ignored.
/// Returns None for an empty raster, a missing band or a region with no
/// finite samples.
pub fn region_mean(raster: &Raster, region: &Region, band: &str, scale: f64) -> Option<f64> {
    let values = &raster.band(band)?.values;
    let grid = raster.grid();
    let bounds = region.bounds()?;
    let lat_step = scale / METERS_PER_DEGREE;

    let mut hits: Vec<usize> = Vec::new();
    if lat_step <= grid.pixel_size {
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let (lon, lat) = grid.pixel_center(row, col);
                if region.contains(lon, lat) {
                    hits.push(row * grid.cols + col);
                }
            }
        }
    } else {
        let mid_lat = (bounds.south + bounds.north) / 2.0;
        let lon_step = lat_step / mid_lat.to_radians().cos().max(0.01);
        let mut lat = bounds.north - lat_step / 2.0;
        while lat > bounds.south {
            let mut lon = bounds.west + lon_step / 2.0;
            while lon < bounds.east {
                if region.contains(lon, lat) {
                    if let Some(i) = grid.index_of(lon, lat) {
                        hits.push(i);
                    }
                }
                lon += lon_step;
            }
            lat -= lat_step;
        }
    }

    if hits.is_empty() {
        hits = overlapping_pixels(grid, &bounds);
    }
    finite_mean(values, &hits)
}

fn finite_mean(values: &[f64], indices: &[usize]) -> Option<f64> {
    let finite: Vec<f64> = indices
        .iter()
        .filter_map(|&i| values.get(i).copied())
        .filter(|v| v.is_finite())
        .collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

/// Indices of the pixels whose cells overlap `bounds`.
fn overlapping_pixels(grid: &GridSpec, bounds: &Bounds) -> Vec<usize> {
    if grid.is_empty() || !grid.bounds().intersects(bounds) {
        return Vec::new();
    }
    let size = grid.pixel_size;
    let col_lo = ((bounds.west - grid.origin_lon) / size).floor().max(0.0) as usize;
    let col_hi = (((bounds.east - grid.origin_lon) / size).ceil().max(0.0) as usize).min(grid.cols);
    let row_lo = ((grid.origin_lat - bounds.north) / size).floor().max(0.0) as usize;
    let row_hi = (((grid.origin_lat - bounds.south) / size).ceil().max(0.0) as usize).min(grid.rows);
    (row_lo..row_hi)
        .flat_map(|row| (col_lo..col_hi).map(move |col| row * grid.cols + col))
        .collect()
}

/// Reduce `band` of every raster in `collection` to its mean over `region`.
///
/// Empty rasters and non-finite or missing reductions are skipped, so the
/// result only holds valid numbers. Output is sorted ascending by date; an
/// empty input or a region with no overlap yields an empty series.
pub fn reduce_region_mean<'a, T, I>(
    collection: I,
    region: &Region,
    band: &str,
    scale: f64,
) -> Result<RegionScalarSeries, PipelineError>
where
    T: Timestamped + 'a,
    I: IntoIterator<Item = &'a T>,
{
    if !(scale.is_finite() && scale > 0.0) {
        return Err(PipelineError::InvalidArgument(format!(
            "reduction scale must be positive, got {}",
            scale
        )));
    }
    let mut points: Vec<DateValue> = collection
        .into_iter()
        .filter(|item| !item.raster().is_empty())
        .filter_map(|item| {
            let value = region_mean(item.raster(), region, band, scale);
            if value.is_none() {
                debug!("aggregate: no {} value for {}", band, item.timestamp());
            }
            value.map(|value| DateValue {
                date: item.timestamp(),
                value,
            })
        })
        .filter(|p| p.value.is_finite())
        .collect();
    points.sort_by_key(|p| p.date);
    info!(
        "aggregate: {} {} points over {}",
        points.len(),
        band,
        region.name
    );
    Ok(RegionScalarSeries(points))
}

/// Per-pixel mean of the first band across `rasters` (e.g. a year of SPI).
///
/// Returns None when no raster has data.
pub fn composite_mean(rasters: &[&Raster]) -> Result<Option<Raster>, PipelineError> {
    let composite = reduce_collection(rasters, Reducer::Mean)?;
    Ok(if composite.is_empty() {
        None
    } else {
        Some(composite)
    })
}
