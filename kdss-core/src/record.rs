use crate::month_range::YearRange;
use crate::raster::{PropertyValue, Raster};
use chrono::NaiveDate;
use kdss_utils::dates::{epoch_millis, month_start};

/// Property key holding the calendar year.
pub const YEAR_KEY: &str = "year";
/// Property key holding the calendar month (1-12).
pub const MONTH_KEY: &str = "month";
/// Property key holding the first instant of the period, in epoch millis.
pub const TIME_START_KEY: &str = "time_start";

/// Anything in a time-ordered raster collection.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDate;
    fn raster(&self) -> &Raster;
}

/// A summed monthly raster tagged with its (year, month).
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRecord {
    pub year: i32,
    pub month: u32,
    /// First day of the month.
    pub timestamp: NaiveDate,
    pub raster: Raster,
}

impl MonthlyRecord {
    /// Tag `raster` with its period. Returns None for an invalid month.
    pub fn new(year: i32, month: u32, raster: Raster) -> Option<Self> {
        let timestamp = month_start(year, month)?;
        let raster = raster
            .with_property(YEAR_KEY, PropertyValue::Int(year as i64))
            .with_property(MONTH_KEY, PropertyValue::Int(month as i64))
            .with_property(TIME_START_KEY, PropertyValue::Int(epoch_millis(&timestamp)));
        Some(MonthlyRecord {
            year,
            month,
            timestamp,
            raster,
        })
    }
}

impl Timestamped for MonthlyRecord {
    fn timestamp(&self) -> NaiveDate {
        self.timestamp
    }

    fn raster(&self) -> &Raster {
        &self.raster
    }
}

/// Chronological monthly records for one region. Months without source data
/// are absent rather than zero-filled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonthlySeries {
    records: Vec<MonthlyRecord>,
}

impl MonthlySeries {
    /// Build a series, dropping empty rasters and sorting by timestamp.
    pub fn from_records(mut records: Vec<MonthlyRecord>) -> Self {
        records.retain(|r| !r.raster.is_empty());
        records.sort_by_key(|r| r.timestamp);
        records.dedup_by_key(|r| r.timestamp);
        MonthlySeries { records }
    }

    pub fn records(&self) -> &[MonthlyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, year: i32, month: u32) -> Option<&MonthlyRecord> {
        self.records
            .iter()
            .find(|r| r.year == year && r.month == month)
    }

    pub fn in_years(&self, years: YearRange) -> impl Iterator<Item = &MonthlyRecord> + '_ {
        self.records.iter().filter(move |r| years.contains(r.year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GridSpec, Raster};

    fn record(year: i32, month: u32, value: f64) -> MonthlyRecord {
        let grid = GridSpec::new(36.0, -1.0, 0.5, 1, 1);
        MonthlyRecord::new(year, month, Raster::constant(grid, "precipitation", value)).unwrap()
    }

    #[test]
    fn test_record_tags_properties() {
        let r = record(2020, 1, 50.0);
        assert_eq!(r.timestamp, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(r.raster.property(YEAR_KEY), Some(&PropertyValue::Int(2020)));
        assert_eq!(r.raster.property(MONTH_KEY), Some(&PropertyValue::Int(1)));
        assert!(r.raster.property(TIME_START_KEY).is_some());
        let grid = GridSpec::new(36.0, -1.0, 0.5, 1, 1);
        assert!(MonthlyRecord::new(2020, 13, Raster::empty(grid)).is_none());
    }

    #[test]
    fn test_series_sorted_and_filters_empty() {
        let grid = GridSpec::new(36.0, -1.0, 0.5, 1, 1);
        let empty = MonthlyRecord::new(2020, 2, Raster::empty(grid)).unwrap();
        let series = MonthlySeries::from_records(vec![record(2020, 3, 1.0), empty, record(2019, 12, 2.0)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.records()[0].year, 2019);
        assert_eq!(series.records()[1].month, 3);
        assert!(series.get(2020, 2).is_none());
        assert_eq!(series.in_years(YearRange::new(2020, 2020)).count(), 1);
    }
}
