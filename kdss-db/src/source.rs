//! Exposes the database as a [`DailySource`] for the pipeline.

use crate::Database;
use chrono::NaiveDate;
use kdss_core::region::Region;
use kdss_core::source::{DailyRaster, DailySource};
use kdss_core::PipelineError;

impl DailySource for Database {
    fn daily(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRaster>, PipelineError> {
        let grid = self
            .query_grid()
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))?;
        let (Some(grid), Some(bounds)) = (grid, region.bounds()) else {
            return Ok(Vec::new());
        };
        if !grid.bounds().intersects(&bounds) {
            log::debug!("source: region {} lies outside the stored grid", region.name);
            return Ok(Vec::new());
        }
        self.query_daily(start, end)
            .map_err(|e| PipelineError::SourceUnavailable(e.to_string()))
    }
}
