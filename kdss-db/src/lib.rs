//! In-memory SQLite database holding gridded daily precipitation.
//!
//! This crate loads CSV exports of a daily precipitation product into an
//! in-memory SQLite database and serves them back as daily rasters through
//! the [`kdss_core::source::DailySource`] trait, so the pipeline can run
//! against it exactly as it would against a remote engine.
//!
//! # Architecture
//!
//! - `Rc<RefCell<Connection>>` wrapper for interior mutability, single-threaded
//! - In-memory SQLite via `rusqlite`
//! - CSV data loaded from strings (files are read by the caller)
//! - One grid definition per database; cells addressed by (row, col)
//!
//! # Usage
//!
//! ```rust
//! use kdss_db::Database;
//!
//! let db = Database::new().unwrap();
//! db.load_grid("ORIGIN_LON,ORIGIN_LAT,PIXEL_SIZE,ROWS,COLS\n36.0,-1.0,0.05,2,2\n").unwrap();
//! db.load_daily("20200101,0,0,12.5\n20200101,1,1,3.0\n").unwrap();
//! let span = db.query_date_span().unwrap().unwrap();
//! assert_eq!(span.days, 1);
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.
//!
//! - `grid` - Grid placement (single row)
//! - `daily_precipitation` - Per-cell daily totals in millimetres

pub mod schema;
mod loader;
mod queries;
pub mod models;
mod source;

use rusqlite::Connection;
use std::cell::RefCell;
use std::rc::Rc;

/// In-memory SQLite database of daily precipitation.
///
/// This struct is cheaply cloneable (via `Rc`); clones share one connection.
///
/// # Example
///
/// ```rust
/// use kdss_db::Database;
///
/// let db = Database::new().unwrap();
/// db.load_grid("ORIGIN_LON,ORIGIN_LAT,PIXEL_SIZE,ROWS,COLS\n36.0,-1.0,0.05,2,2\n").unwrap();
/// assert!(db.query_grid().unwrap().is_some());
/// ```
#[derive(Clone)]
pub struct Database {
    conn: Rc<RefCell<Connection>>,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    ///
    /// The database is empty after creation; use the `load_*` methods
    /// to populate it with CSV data.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}
