//! Gridded numeric fields with named bands.
//!
//! A [`Raster`] is a set of equally sized bands laid over a [`GridSpec`].
//! Missing samples are stored as `NaN`; every per-pixel reduction in this
//! module ignores non-finite inputs, so a pixel with no finite sample stays
//! `NaN` rather than collapsing to zero.

use crate::error::PipelineError;
use crate::region::{Bounds, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placement of a north-up grid in lon/lat degrees.
///
/// `origin_lon`/`origin_lat` is the north-west corner of the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridSpec {
    pub origin_lon: f64,
    pub origin_lat: f64,
    /// Pixel edge length in degrees.
    pub pixel_size: f64,
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn new(origin_lon: f64, origin_lat: f64, pixel_size: f64, rows: usize, cols: usize) -> Self {
        GridSpec {
            origin_lon,
            origin_lat,
            pixel_size,
            rows,
            cols,
        }
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Centre of the pixel at (row, col) as (lon, lat).
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_lon + (col as f64 + 0.5) * self.pixel_size,
            self.origin_lat - (row as f64 + 0.5) * self.pixel_size,
        )
    }

    /// Flat index of the pixel containing (lon, lat), if it lies on the grid.
    pub fn index_of(&self, lon: f64, lat: f64) -> Option<usize> {
        if self.pixel_size <= 0.0 || !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        let col = ((lon - self.origin_lon) / self.pixel_size).floor();
        let row = ((self.origin_lat - lat) / self.pixel_size).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(row * self.cols + col)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            west: self.origin_lon,
            south: self.origin_lat - self.rows as f64 * self.pixel_size,
            east: self.origin_lon + self.cols as f64 * self.pixel_size,
            north: self.origin_lat,
        }
    }
}

/// One independently addressable layer of a raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub values: Vec<f64>,
}

/// Scalar metadata attached to a raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Per-pixel reducers applied across a collection of rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    /// Population standard deviation.
    StdDev,
}

impl Reducer {
    /// Reduce the finite samples of one pixel. No samples yields `NaN`.
    pub fn apply(&self, samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        let n = samples.len() as f64;
        let sum: f64 = samples.iter().sum();
        match self {
            Reducer::Sum => sum,
            Reducer::Mean => sum / n,
            Reducer::StdDev => {
                let mean = sum / n;
                let var = samples.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
                var.sqrt()
            }
        }
    }
}

/// A 2-D gridded field: zero or more bands plus metadata properties.
///
/// A raster with no bands is *empty*; stages drop empty rasters at every
/// collection boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    grid: GridSpec,
    bands: Vec<Band>,
    properties: BTreeMap<String, PropertyValue>,
}

impl Raster {
    /// A raster with no bands over `grid`.
    pub fn empty(grid: GridSpec) -> Self {
        Raster {
            grid,
            bands: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// A single-band raster. Fails if `values` does not cover the grid.
    pub fn from_band(grid: GridSpec, name: &str, values: Vec<f64>) -> Result<Self, PipelineError> {
        let mut raster = Raster::empty(grid);
        raster.add_band(name, values)?;
        Ok(raster)
    }

    /// A single-band raster holding `value` in every pixel.
    pub fn constant(grid: GridSpec, name: &str, value: f64) -> Self {
        Raster {
            grid,
            bands: vec![Band {
                name: name.to_string(),
                values: vec![value; grid.len()],
            }],
            properties: BTreeMap::new(),
        }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.name == name)
    }

    pub fn first_band(&self) -> Option<&Band> {
        self.bands.first()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Append a band, replacing any existing band of the same name.
    pub fn add_band(&mut self, name: &str, values: Vec<f64>) -> Result<(), PipelineError> {
        if values.len() != self.grid.len() {
            return Err(PipelineError::InvalidArgument(format!(
                "band {} has {} values, grid has {} pixels",
                name,
                values.len(),
                self.grid.len()
            )));
        }
        self.bands.retain(|b| b.name != name);
        self.bands.push(Band {
            name: name.to_string(),
            values,
        });
        Ok(())
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    pub fn set_property(&mut self, key: &str, value: PropertyValue) {
        self.properties.insert(key.to_string(), value);
    }

    pub fn with_property(mut self, key: &str, value: PropertyValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Copy the named properties of `source` onto this raster.
    pub fn copy_properties(mut self, source: &Raster, keys: &[&str]) -> Self {
        for key in keys {
            if let Some(value) = source.property(key) {
                self.set_property(key, value.clone());
            }
        }
        self
    }

    /// A single-band raster holding only `name`, with this raster's properties.
    pub fn select(&self, name: &str) -> Option<Raster> {
        self.band(name).map(|band| Raster {
            grid: self.grid,
            bands: vec![band.clone()],
            properties: self.properties.clone(),
        })
    }

    /// Like [`select`](Self::select), but a missing band yields a zero-valued
    /// band of the same name instead of nothing.
    pub fn band_or_zero(&self, name: &str) -> Raster {
        match self.select(name) {
            Some(raster) => raster,
            None => {
                log::debug!("band {} missing, substituting zeros", name);
                Raster::constant(self.grid, name, 0.0)
            }
        }
    }

    /// Rename the first band.
    pub fn rename(mut self, name: &str) -> Self {
        if let Some(band) = self.bands.first_mut() {
            band.name = name.to_string();
        }
        self
    }

    /// Apply `f` to every pixel of the first band, producing a new band `name`.
    ///
    /// Returns an empty raster when this raster is empty.
    pub fn map(&self, name: &str, f: impl Fn(f64) -> f64) -> Raster {
        let mut out = Raster::empty(self.grid);
        out.properties = self.properties.clone();
        if let Some(band) = self.first_band() {
            out.bands.push(Band {
                name: name.to_string(),
                values: band.values.iter().map(|v| f(*v)).collect(),
            });
        }
        out
    }

    /// Combine the first bands of two rasters pixel by pixel.
    ///
    /// Arithmetic follows IEEE rules: a zero divisor gives an infinite or
    /// `NaN` pixel rather than an error.
    pub fn combine(
        &self,
        other: &Raster,
        name: &str,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Raster, PipelineError> {
        if self.grid != other.grid {
            return Err(PipelineError::InvalidArgument(format!(
                "cannot combine rasters on different grids into {}",
                name
            )));
        }
        let (Some(a), Some(b)) = (self.first_band(), other.first_band()) else {
            return Ok(Raster::empty(self.grid));
        };
        let values = a
            .values
            .iter()
            .zip(b.values.iter())
            .map(|(x, y)| f(*x, *y))
            .collect();
        let mut out = Raster::from_band(self.grid, name, values)?;
        out.properties = self.properties.clone();
        Ok(out)
    }

    /// Mask every pixel whose centre falls outside `region` to `NaN`.
    pub fn clip(&self, region: &Region) -> Raster {
        let inside: Vec<bool> = (0..self.grid.rows)
            .flat_map(|row| (0..self.grid.cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                let (lon, lat) = self.grid.pixel_center(row, col);
                region.contains(lon, lat)
            })
            .collect();
        let mut out = self.clone();
        for band in &mut out.bands {
            for (value, keep) in band.values.iter_mut().zip(inside.iter()) {
                if !keep {
                    *value = f64::NAN;
                }
            }
        }
        out
    }

    /// Finite values of the first band, for summaries and legends.
    pub fn finite_values(&self) -> Vec<f64> {
        self.first_band()
            .map(|b| b.values.iter().copied().filter(|v| v.is_finite()).collect())
            .unwrap_or_default()
    }
}

/// Reduce a collection pixel by pixel, band by band.
///
/// Empty rasters are skipped. The output carries the bands of the first
/// non-empty raster; each output band reduces the finite samples of the
/// same-named band across the collection. All contributing rasters must share
/// a grid. A collection with no non-empty raster reduces to an empty raster.
pub fn reduce_collection(rasters: &[&Raster], reducer: Reducer) -> Result<Raster, PipelineError> {
    let present: Vec<&Raster> = rasters.iter().copied().filter(|r| !r.is_empty()).collect();
    let Some(first) = present.first() else {
        return Ok(Raster::empty(GridSpec::default()));
    };
    let grid = first.grid;
    if present.iter().any(|r| r.grid != grid) {
        return Err(PipelineError::InvalidArgument(
            "cannot reduce rasters on different grids".to_string(),
        ));
    }

    let mut out = Raster::empty(grid);
    let mut samples: Vec<f64> = Vec::with_capacity(present.len());
    for band in &first.bands {
        let columns: Vec<&[f64]> = present
            .iter()
            .filter_map(|r| r.band(&band.name))
            .map(|b| b.values.as_slice())
            .collect();
        let mut values = Vec::with_capacity(grid.len());
        for i in 0..grid.len() {
            samples.clear();
            samples.extend(columns.iter().map(|c| c[i]).filter(|v| v.is_finite()));
            values.push(reducer.apply(&samples));
        }
        out.add_band(&band.name, values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;

    fn grid_2x2() -> GridSpec {
        GridSpec::new(36.0, -1.0, 0.5, 2, 2)
    }

    #[test]
    fn test_grid_index_and_center() {
        let grid = grid_2x2();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.pixel_center(0, 0), (36.25, -1.25));
        assert_eq!(grid.index_of(36.25, -1.25), Some(0));
        assert_eq!(grid.index_of(36.75, -1.75), Some(3));
        assert_eq!(grid.index_of(35.9, -1.25), None);
        assert_eq!(grid.index_of(36.25, -2.1), None);
    }

    #[test]
    fn test_from_band_rejects_wrong_length() {
        let result = Raster::from_band(grid_2x2(), "precipitation", vec![1.0, 2.0]);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
    }

    #[test]
    fn test_band_or_zero_substitutes_missing_band() {
        let raster = Raster::constant(grid_2x2(), "prec_01", 5.0);
        let present = raster.band_or_zero("prec_01");
        assert_eq!(present.first_band().unwrap().values, vec![5.0; 4]);
        let missing = raster.band_or_zero("prec_02");
        assert_eq!(missing.band_names(), vec!["prec_02"]);
        assert_eq!(missing.first_band().unwrap().values, vec![0.0; 4]);
    }

    #[test]
    fn test_combine_divides_by_zero_without_error() {
        let a = Raster::from_band(grid_2x2(), "a", vec![1.0, -1.0, 0.0, 2.0]).unwrap();
        let b = Raster::constant(grid_2x2(), "b", 0.0);
        let out = a.combine(&b, "ratio", |x, y| x / y).unwrap();
        let v = &out.first_band().unwrap().values;
        assert_eq!(v[0], f64::INFINITY);
        assert_eq!(v[1], f64::NEG_INFINITY);
        assert!(v[2].is_nan());
    }

    #[test]
    fn test_combine_rejects_grid_mismatch() {
        let a = Raster::constant(grid_2x2(), "a", 1.0);
        let b = Raster::constant(GridSpec::new(0.0, 0.0, 1.0, 1, 1), "b", 1.0);
        assert!(a.combine(&b, "c", |x, y| x + y).is_err());
    }

    #[test]
    fn test_reduce_collection_ignores_nan_and_empty() {
        let grid = grid_2x2();
        let a = Raster::from_band(grid, "precipitation", vec![1.0, f64::NAN, 3.0, f64::NAN]).unwrap();
        let b = Raster::from_band(grid, "precipitation", vec![3.0, 2.0, 5.0, f64::NAN]).unwrap();
        let empty = Raster::empty(grid);
        let sum = reduce_collection(&[&a, &empty, &b], Reducer::Sum).unwrap();
        let v = &sum.band("precipitation").unwrap().values;
        assert_eq!(v[0], 4.0);
        assert_eq!(v[1], 2.0);
        assert_eq!(v[2], 8.0);
        assert!(v[3].is_nan());

        let mean = reduce_collection(&[&a, &b], Reducer::Mean).unwrap();
        assert_eq!(mean.band("precipitation").unwrap().values[0], 2.0);

        let sd = reduce_collection(&[&a, &b], Reducer::StdDev).unwrap();
        assert!((sd.band("precipitation").unwrap().values[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reduce_empty_collection_is_empty() {
        let out = reduce_collection(&[], Reducer::Mean).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_clip_masks_outside_pixels() {
        // Square covering only the top-left pixel centre (36.25, -1.25).
        let region = Region::from_geojson(
            "square",
            r#"{"type":"Polygon","coordinates":[[[36.0,-1.0],[36.5,-1.0],[36.5,-1.5],[36.0,-1.5],[36.0,-1.0]]]}"#,
        )
        .unwrap();
        let raster = Raster::constant(grid_2x2(), "precipitation", 7.0);
        let clipped = raster.clip(&region);
        assert_eq!(clipped.finite_values(), vec![7.0]);
    }
}
