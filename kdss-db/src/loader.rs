//! CSV data loading functions for populating the in-memory SQLite database.
//!
//! # CSV Formats
//!
//! - **Grid** (has headers): `ORIGIN_LON,ORIGIN_LAT,PIXEL_SIZE,ROWS,COLS`
//! - **Daily precipitation** (no headers): `date(YYYYMMDD),row,col,value`

use crate::Database;
use kdss_core::raster::GridSpec;
use rusqlite::params;

impl Database {
    /// Load the grid placement from CSV string, replacing any previous grid.
    ///
    /// Expected format (with headers): `ORIGIN_LON,ORIGIN_LAT,PIXEL_SIZE,ROWS,COLS`.
    /// The origin is the north-west corner of the grid, in degrees.
    ///
    /// # Example CSV
    /// ```text
    /// ORIGIN_LON,ORIGIN_LAT,PIXEL_SIZE,ROWS,COLS
    /// 36.0,-1.0,0.05,40,40
    /// ```
    pub fn load_grid(&self, csv_data: &str) -> anyhow::Result<()> {
        let conn = self.conn.borrow();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let record = match rdr.records().next() {
            Some(r) => r?,
            None => anyhow::bail!("grid CSV has no data row"),
        };
        let origin_lon: f64 = record.get(0).unwrap_or("").trim().parse()?;
        let origin_lat: f64 = record.get(1).unwrap_or("").trim().parse()?;
        let pixel_size: f64 = record.get(2).unwrap_or("").trim().parse()?;
        let rows: i64 = record.get(3).unwrap_or("").trim().parse()?;
        let cols: i64 = record.get(4).unwrap_or("").trim().parse()?;
        if !(pixel_size.is_finite() && pixel_size > 0.0) || rows <= 0 || cols <= 0 {
            anyhow::bail!(
                "invalid grid: pixel size {}, {} rows, {} cols",
                pixel_size,
                rows,
                cols
            );
        }

        conn.execute(
            "INSERT OR REPLACE INTO grid (id, origin_lon, origin_lat, pixel_size, rows, cols)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![origin_lon, origin_lat, pixel_size, rows, cols],
        )?;
        log::info!(
            "loader: Loaded grid {}x{} at ({}, {}), pixel {}",
            rows,
            cols,
            origin_lon,
            origin_lat,
            pixel_size
        );
        Ok(())
    }

    /// Store a grid directly, replacing any previous grid.
    pub fn set_grid(&self, grid: &GridSpec) -> anyhow::Result<()> {
        let conn = self.conn.borrow();
        conn.execute(
            "INSERT OR REPLACE INTO grid (id, origin_lon, origin_lat, pixel_size, rows, cols)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                grid.origin_lon,
                grid.origin_lat,
                grid.pixel_size,
                grid.rows as i64,
                grid.cols as i64
            ],
        )?;
        Ok(())
    }

    /// Load daily precipitation cells from CSV string.
    ///
    /// Expected format (no headers): `date(YYYYMMDD),row,col,value`
    ///
    /// Rows with a non-numeric or negative value (e.g. `---`, `-9999`), an
    /// unparseable date, or a cell outside the loaded grid are skipped. When
    /// no grid is loaded yet only the row/col parse is checked.
    ///
    /// # Example CSV
    /// ```text
    /// 20200101,0,0,12.5
    /// 20200101,0,1,0.0
    /// ```
    pub fn load_daily(&self, csv_data: &str) -> anyhow::Result<()> {
        let grid = self.query_grid()?;
        let conn = self.conn.borrow();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0u32;
        let mut skipped = 0u32;
        for result in rdr.records() {
            let r = result?;
            let date = r.get(0).unwrap_or("").trim();
            let row = r.get(1).unwrap_or("").trim().parse::<usize>();
            let col = r.get(2).unwrap_or("").trim().parse::<usize>();
            let value = r.get(3).unwrap_or("").trim().parse::<f64>();

            let (row, col, value) = match (row, col, value) {
                (Ok(row), Ok(col), Ok(value)) if value.is_finite() && value >= 0.0 => {
                    (row, col, value)
                }
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            if kdss_utils::dates::parse_date_compact(date).is_err() {
                skipped += 1;
                continue;
            }
            if let Some(grid) = &grid {
                if row >= grid.rows || col >= grid.cols {
                    skipped += 1;
                    continue;
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO daily_precipitation (date, row, col, value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![date, row as i64, col as i64, value],
            )?;
            count += 1;
        }
        log::info!(
            "loader: Loaded {} daily cells, skipped {} invalid",
            count,
            skipped
        );
        Ok(())
    }
}
