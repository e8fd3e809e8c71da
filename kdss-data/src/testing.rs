//! Synthetic sources shared by the stage tests.

use chrono::NaiveDate;
use kdss_core::raster::{GridSpec, Raster};
use kdss_core::region::Region;
use kdss_core::source::{DailyRaster, DailySource};
use kdss_core::PipelineError;
use std::cell::Cell;

/// 2x2 grid covering lon 36.5..37.5, lat -2.5..-1.5.
pub fn tiny_grid() -> GridSpec {
    GridSpec::new(36.5, -1.5, 0.5, 2, 2)
}

/// A square fully covering [`tiny_grid`].
pub fn test_region() -> Region {
    Region::from_geojson(
        "test",
        r#"{"type":"Polygon","coordinates":[[[36.4,-1.4],[37.6,-1.4],[37.6,-2.6],[36.4,-2.6],[36.4,-1.4]]]}"#,
    )
    .unwrap()
}

/// A square far away from [`tiny_grid`].
pub fn disjoint_region() -> Region {
    Region::from_geojson(
        "elsewhere",
        r#"{"type":"Polygon","coordinates":[[[10,10],[11,10],[11,11],[10,11],[10,10]]]}"#,
    )
    .unwrap()
}

pub fn day(year: i32, month: u32, d: u32, value: f64) -> DailyRaster {
    DailyRaster {
        date: NaiveDate::from_ymd_opt(year, month, d).unwrap(),
        raster: Raster::constant(tiny_grid(), "precipitation", value),
    }
}

/// Days 1..=`days` of a month, each holding `value` everywhere.
pub fn constant_days(year: i32, month: u32, days: u32, value: f64) -> Vec<DailyRaster> {
    (1..=days).map(|d| day(year, month, d, value)).collect()
}

/// A single day carrying the whole monthly total.
pub fn monthly_total(year: i32, month: u32, total: f64) -> DailyRaster {
    day(year, month, 1, total)
}

pub struct FailingSource;

impl DailySource for FailingSource {
    fn daily(
        &self,
        _region: &Region,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<DailyRaster>, PipelineError> {
        Err(PipelineError::SourceUnavailable("connection refused".to_string()))
    }
}

pub fn failing_source() -> FailingSource {
    FailingSource
}

/// Wraps a source and counts queries.
pub struct CountingSource<S> {
    pub inner: S,
    pub calls: Cell<usize>,
}

impl<S> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        CountingSource {
            inner,
            calls: Cell::new(0),
        }
    }
}

impl<S: DailySource> DailySource for CountingSource<S> {
    fn daily(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRaster>, PipelineError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.daily(region, start, end)
    }
}
