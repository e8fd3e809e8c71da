//! Heavy-rain days: yearly count of days above 50 mm per pixel.

use chrono::NaiveDate;
use kdss_core::month_range::YearRange;
use kdss_core::raster::{reduce_collection, PropertyValue, Raster, Reducer};
use kdss_core::record::{Timestamped, TIME_START_KEY, YEAR_KEY};
use kdss_core::region::Region;
use kdss_core::source::DailySource;
use kdss_core::PipelineError;
use kdss_utils::dates::epoch_millis;
use log::info;

/// Daily precipitation strictly above this is a heavy-rain day (mm).
pub const HEAVY_RAIN_THRESHOLD_MM: f64 = 50.0;
pub const HEAVY_RAIN_BAND: &str = "heavy_rain";

#[derive(Debug, Clone, PartialEq)]
pub struct HeavyRainYear {
    pub year: i32,
    pub timestamp: NaiveDate,
    pub raster: Raster,
}

impl Timestamped for HeavyRainYear {
    fn timestamp(&self) -> NaiveDate {
        self.timestamp
    }

    fn raster(&self) -> &Raster {
        &self.raster
    }
}

/// Count heavy-rain days per pixel for each year with daily data.
pub fn build_heavy_rain<S: DailySource + ?Sized>(
    source: &S,
    region: &Region,
    years: YearRange,
) -> Result<Vec<HeavyRainYear>, PipelineError> {
    let mut out = Vec::new();
    for year in years.years() {
        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year + 1, 1, 1),
        ) else {
            continue;
        };
        let days = source.daily(region, start, end)?;
        let masks: Vec<Raster> = days
            .iter()
            .map(|d| {
                d.raster.map(HEAVY_RAIN_BAND, |v| {
                    if v.is_nan() {
                        f64::NAN
                    } else if v > HEAVY_RAIN_THRESHOLD_MM {
                        1.0
                    } else {
                        0.0
                    }
                })
            })
            .collect();
        let refs: Vec<&Raster> = masks.iter().collect();
        let mut count = reduce_collection(&refs, Reducer::Sum)?;
        if count.is_empty() {
            continue;
        }
        count.set_property(YEAR_KEY, PropertyValue::Int(year as i64));
        count.set_property(TIME_START_KEY, PropertyValue::Int(epoch_millis(&start)));
        out.push(HeavyRainYear {
            year,
            timestamp: start,
            raster: count,
        });
    }
    info!("heavy_rain: {} yearly rasters for {}", out.len(), region.name);
    Ok(out)
}
