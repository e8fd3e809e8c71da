//! SQL schema definitions for the in-memory SQLite database.

/// Returns the full SQL schema as a single batch string.
///
/// - `grid` - placement of the precipitation grid (at most one row, id = 1)
/// - `daily_precipitation` - daily total per cell (date as YYYYMMDD, mm)
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS grid (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        origin_lon REAL NOT NULL,
        origin_lat REAL NOT NULL,
        pixel_size REAL NOT NULL,
        rows INTEGER NOT NULL,
        cols INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS daily_precipitation (
        date TEXT NOT NULL,
        row INTEGER NOT NULL,
        col INTEGER NOT NULL,
        value REAL NOT NULL,
        PRIMARY KEY (date, row, col)
    );
    CREATE INDEX IF NOT EXISTS idx_daily_date ON daily_precipitation(date);

    "#
}
