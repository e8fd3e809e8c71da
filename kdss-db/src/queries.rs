//! Typed query methods for retrieving grid and precipitation data.
//!
//! Dates are stored as `YYYYMMDD` text, so lexical comparison in SQL matches
//! chronological order.

use crate::models::{CellValue, DaySpan};
use crate::Database;
use chrono::NaiveDate;
use kdss_core::raster::{GridSpec, Raster};
use kdss_core::source::{DailyRaster, PRECIPITATION_BAND};
use kdss_utils::dates::{format_date_compact, parse_date_compact};
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Get the stored grid placement, if one has been loaded.
    pub fn query_grid(&self) -> anyhow::Result<Option<GridSpec>> {
        let conn = self.conn.borrow();
        let grid = conn
            .query_row(
                "SELECT origin_lon, origin_lat, pixel_size, rows, cols FROM grid WHERE id = 1",
                [],
                |row| {
                    let rows: i64 = row.get(3)?;
                    let cols: i64 = row.get(4)?;
                    Ok(GridSpec::new(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        rows.max(0) as usize,
                        cols.max(0) as usize,
                    ))
                },
            )
            .optional()?;
        Ok(grid)
    }

    /// Get one daily raster per stored date in `[start, end)`.
    ///
    /// Cells without a stored value for a date are NaN. Dates with no stored
    /// cells are absent from the result. Returns an empty list when no grid
    /// has been loaded.
    pub fn query_daily(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<DailyRaster>> {
        let Some(grid) = self.query_grid()? else {
            log::warn!("query: query_daily called before a grid was loaded");
            return Ok(Vec::new());
        };
        let cells = self.query_cells(start, end)?;

        let mut days: Vec<DailyRaster> = Vec::new();
        let mut current: Option<(String, Vec<f64>)> = None;
        for cell in cells {
            let same_day = matches!(&current, Some((date, _)) if *date == cell.date);
            if !same_day {
                if let Some((date, values)) = current.take() {
                    days.push(to_daily(&grid, &date, values)?);
                }
                current = Some((cell.date.clone(), vec![f64::NAN; grid.len()]));
            }
            if let Some((_, values)) = current.as_mut() {
                if cell.row < grid.rows && cell.col < grid.cols {
                    values[cell.row * grid.cols + cell.col] = cell.value;
                }
            }
        }
        if let Some((date, values)) = current.take() {
            days.push(to_daily(&grid, &date, values)?);
        }
        log::info!(
            "query: query_daily returned {} days for {} to {}",
            days.len(),
            start,
            end
        );
        Ok(days)
    }

    /// Get raw cell values in `[start, end)`, ordered by date, row, col.
    pub fn query_cells(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<CellValue>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT date, row, col, value
             FROM daily_precipitation
             WHERE date >= ?1 AND date < ?2
             ORDER BY date, row, col",
        )?;
        let rows = stmt
            .query_map(
                params![format_date_compact(&start), format_date_compact(&end)],
                |row| {
                    let r: i64 = row.get(1)?;
                    let c: i64 = row.get(2)?;
                    Ok(CellValue {
                        date: row.get(0)?,
                        row: r.max(0) as usize,
                        col: c.max(0) as usize,
                        value: row.get(3)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("query: query_cells returned {} cells", rows.len());
        Ok(rows)
    }

    /// Get the first and last stored dates and the number of distinct dates.
    pub fn query_date_span(&self) -> anyhow::Result<Option<DaySpan>> {
        let conn = self.conn.borrow();
        let (first, last, days): (Option<String>, Option<String>, i64) = conn.query_row(
            "SELECT MIN(date), MAX(date), COUNT(DISTINCT date) FROM daily_precipitation",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        match (first, last) {
            (Some(first), Some(last)) => Ok(Some(DaySpan {
                first: parse_date_compact(&first)?,
                last: parse_date_compact(&last)?,
                days: days.max(0) as u32,
            })),
            _ => Ok(None),
        }
    }
}

fn to_daily(grid: &GridSpec, date: &str, values: Vec<f64>) -> anyhow::Result<DailyRaster> {
    Ok(DailyRaster {
        date: parse_date_compact(date)?,
        raster: Raster::from_band(*grid, PRECIPITATION_BAND, values)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_db() -> Database {
        let db = Database::new().unwrap();
        db.load_grid("ORIGIN_LON,ORIGIN_LAT,PIXEL_SIZE,ROWS,COLS\n36.0,-1.0,0.5,2,2\n")
            .unwrap();
        db.load_daily(
            "20200101,0,0,1.0\n\
             20200101,0,1,2.0\n\
             20200101,1,0,3.0\n\
             20200101,1,1,4.0\n\
             20200102,1,1,9.0\n\
             20200201,0,0,5.0\n",
        )
        .unwrap();
        db
    }

    #[test]
    fn query_daily_groups_by_date() {
        let db = sample_db();
        let days = db.query_daily(date(2020, 1, 1), date(2020, 2, 1)).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date(2020, 1, 1));
        assert_eq!(
            days[0].raster.band("precipitation").unwrap().values,
            vec![1.0, 2.0, 3.0, 4.0]
        );
        let second = &days[1].raster.band("precipitation").unwrap().values;
        assert!(second[0].is_nan(), "missing cells are NaN");
        assert_eq!(second[3], 9.0);
    }

    #[test]
    fn query_daily_end_is_exclusive() {
        let db = sample_db();
        let days = db.query_daily(date(2020, 1, 2), date(2020, 2, 1)).unwrap();
        assert_eq!(days.len(), 1);
        let days = db.query_daily(date(2020, 2, 1), date(2020, 3, 1)).unwrap();
        assert_eq!(days.len(), 1);
        assert!(db.query_daily(date(2021, 1, 1), date(2022, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn query_daily_without_grid_is_empty() {
        let db = Database::new().unwrap();
        db.load_daily("20200101,0,0,1.0\n").unwrap();
        assert!(db.query_daily(date(2020, 1, 1), date(2020, 2, 1)).unwrap().is_empty());
    }

    #[test]
    fn query_date_span_reports_range() {
        let db = sample_db();
        let span = db.query_date_span().unwrap().unwrap();
        assert_eq!(span.first, date(2020, 1, 1));
        assert_eq!(span.last, date(2020, 2, 1));
        assert_eq!(span.days, 3);
    }
}
