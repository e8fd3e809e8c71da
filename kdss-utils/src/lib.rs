//! Shared utility functions for KDSS crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, NaiveDate};

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Format a NaiveDate as "YYYYMMDD" (compact storage format)
    pub fn format_date_compact(date: &NaiveDate) -> String {
        date.format("%Y%m%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
    }

    /// Parse a date string in "YYYYMMDD" format
    pub fn parse_date_compact(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y%m%d")?)
    }

    /// First day of the given calendar month, or None if the month is not 1-12.
    pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, 1)
    }

    /// First day of the month following `date`'s month.
    pub fn next_month_start(date: &NaiveDate) -> Option<NaiveDate> {
        if date.month() == 12 {
            NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
        }
    }

    /// Milliseconds since the Unix epoch at midnight UTC of `date`.
    pub fn epoch_millis(date: &NaiveDate) -> i64 {
        date.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default()
    }

}

/// Band naming conventions shared by the baseline and indicator stages.
pub mod bands {
    /// Prefix of the per-calendar-month baseline bands.
    pub const MONTH_BAND_PREFIX: &str = "prec_";

    /// Band name for a calendar month: `prec_01` .. `prec_12`.
    pub fn month_band_name(month: u32) -> String {
        format!("{}{:02}", MONTH_BAND_PREFIX, month)
    }

    /// All twelve month band names in calendar order.
    pub fn all_month_band_names() -> Vec<String> {
        (1..=12).map(month_band_name).collect()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_month_band_name_is_zero_padded() {
            assert_eq!(month_band_name(1), "prec_01");
            assert_eq!(month_band_name(12), "prec_12");
        }

        #[test]
        fn test_all_month_band_names() {
            let names = all_month_band_names();
            assert_eq!(names.len(), 12);
            assert_eq!(names[0], "prec_01");
            assert_eq!(names[11], "prec_12");
        }
    }
}
