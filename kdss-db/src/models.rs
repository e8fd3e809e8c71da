//! Query result model structs.

use chrono::NaiveDate;
use serde::Serialize;

/// First and last stored observation dates, inclusive.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DaySpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
    /// Number of distinct dates with at least one stored cell.
    pub days: u32,
}

/// A single stored cell value, in the same shape as the daily CSV rows.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CellValue {
    /// Observation date (YYYYMMDD format).
    pub date: String,
    pub row: usize,
    pub col: usize,
    /// Daily total in millimetres.
    pub value: f64,
}
