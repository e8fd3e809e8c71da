//! Series builder: daily precipitation summed into monthly rasters.

use kdss_core::month_range::{MonthRange, YearRange};
use kdss_core::raster::{reduce_collection, Raster, Reducer};
use kdss_core::record::{MonthlyRecord, MonthlySeries};
use kdss_core::region::Region;
use kdss_core::source::DailySource;
pub use kdss_core::source::PRECIPITATION_BAND;
use kdss_core::PipelineError;
use kdss_utils::dates::{month_start, next_month_start};
use log::{debug, info};
use std::ops::RangeInclusive;

/// Sum the daily source into one raster per (year, month) over `region`.
///
/// A month for which the source returned no data produces no record at all;
/// it is never emitted as a zero-filled raster. Source failures propagate.
pub fn build_monthly_series<S: DailySource + ?Sized>(
    source: &S,
    region: &Region,
    years: YearRange,
    months: RangeInclusive<u32>,
) -> Result<MonthlySeries, PipelineError> {
    let mut records = Vec::new();
    let mut skipped = 0u32;
    for (year, month) in MonthRange::new(years, months) {
        let Some(start) = month_start(year, month) else {
            continue;
        };
        let Some(end) = next_month_start(&start) else {
            continue;
        };
        let days = source.daily(region, start, end)?;
        let rasters: Vec<&Raster> = days.iter().map(|d| &d.raster).collect();
        let monthly = reduce_collection(&rasters, Reducer::Sum)?;
        if monthly.is_empty() {
            debug!("series: no daily data for {}-{:02}", year, month);
            skipped += 1;
            continue;
        }
        if let Some(record) = MonthlyRecord::new(year, month, monthly) {
            records.push(record);
        }
    }
    let series = MonthlySeries::from_records(records);
    info!(
        "series: built {} monthly records for {} ({}-{}), {} months without data",
        series.len(),
        region.name,
        years.start,
        years.end,
        skipped
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{constant_days, failing_source, test_region, tiny_grid};
    use kdss_core::source::MemorySource;

    #[test]
    fn test_monthly_sum() {
        let source = MemorySource::new(constant_days(2020, 1, 31, 2.0));
        let series =
            build_monthly_series(&source, &test_region(), YearRange::new(2020, 2020), 1..=12).unwrap();
        assert_eq!(series.len(), 1);
        let jan = series.get(2020, 1).unwrap();
        let values = &jan.raster.band(PRECIPITATION_BAND).unwrap().values;
        assert_eq!(values.len(), tiny_grid().len());
        assert!(values.iter().all(|v| (*v - 62.0).abs() < 1e-9));
    }

    #[test]
    fn test_months_without_data_are_absent() {
        let mut days = constant_days(2020, 1, 31, 1.0);
        days.extend(constant_days(2020, 3, 31, 1.0));
        let source = MemorySource::new(days);
        let series =
            build_monthly_series(&source, &test_region(), YearRange::new(2020, 2020), 1..=12).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.get(2020, 2).is_none(), "February must not be zero-filled");
        assert!(series.records()[0].timestamp < series.records()[1].timestamp);
    }

    #[test]
    fn test_month_range_restriction() {
        let mut days = constant_days(2020, 1, 31, 1.0);
        days.extend(constant_days(2020, 3, 31, 1.0));
        let source = MemorySource::new(days);
        let series =
            build_monthly_series(&source, &test_region(), YearRange::new(2020, 2020), 3..=3).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.records()[0].month, 3);
    }

    #[test]
    fn test_source_failure_propagates() {
        let result = build_monthly_series(
            &failing_source(),
            &test_region(),
            YearRange::new(2020, 2020),
            1..=12,
        );
        assert!(matches!(result, Err(PipelineError::SourceUnavailable(_))));
    }
}
