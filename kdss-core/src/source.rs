//! The daily precipitation source consumed by the series builder.

use crate::error::PipelineError;
use crate::raster::Raster;
use crate::region::Region;
use chrono::NaiveDate;

/// Band name of daily and monthly precipitation rasters.
pub const PRECIPITATION_BAND: &str = "precipitation";

/// One day of precipitation over the source grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRaster {
    pub date: NaiveDate,
    pub raster: Raster,
}

/// A daily-resolution precipitation store queryable by region and date.
///
/// `start` is inclusive and `end` exclusive. Implementations return only days
/// whose grid overlaps the region's bounding box, in ascending date order.
/// Failures to reach the store are reported as
/// [`PipelineError::SourceUnavailable`].
pub trait DailySource {
    fn daily(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRaster>, PipelineError>;
}

/// A source over daily rasters already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    days: Vec<DailyRaster>,
}

impl MemorySource {
    pub fn new(mut days: Vec<DailyRaster>) -> Self {
        days.sort_by_key(|d| d.date);
        MemorySource { days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl DailySource for MemorySource {
    fn daily(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRaster>, PipelineError> {
        let Some(bounds) = region.bounds() else {
            return Ok(Vec::new());
        };
        Ok(self
            .days
            .iter()
            .filter(|d| d.date >= start && d.date < end)
            .filter(|d| d.raster.grid().bounds().intersects(&bounds))
            .cloned()
            .collect())
    }
}

impl<S: DailySource + ?Sized> DailySource for &S {
    fn daily(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRaster>, PipelineError> {
        (**self).daily(region, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;

    fn day(y: i32, m: u32, d: u32) -> DailyRaster {
        DailyRaster {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            raster: Raster::constant(GridSpec::new(0.0, 2.0, 1.0, 2, 2), "precipitation", 1.0),
        }
    }

    fn region(text: &str) -> Region {
        Region::from_geojson("test", text).unwrap()
    }

    #[test]
    fn test_memory_source_filters_dates() {
        let source = MemorySource::new(vec![day(2020, 1, 31), day(2020, 1, 1), day(2020, 2, 1)]);
        let r = region(r#"{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2],[0,0]]]}"#);
        let days = source
            .daily(
                &r,
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
            )
            .unwrap();
        assert_eq!(days.len(), 2);
        assert!(days[0].date < days[1].date);
    }

    #[test]
    fn test_memory_source_filters_bounds() {
        let source = MemorySource::new(vec![day(2020, 1, 1)]);
        let far = region(r#"{"type":"Polygon","coordinates":[[[10,10],[11,10],[11,11],[10,11],[10,10]]]}"#);
        let days = source
            .daily(
                &far,
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            )
            .unwrap();
        assert!(days.is_empty());
    }
}
