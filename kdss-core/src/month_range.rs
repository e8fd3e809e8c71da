use serde::{Deserialize, Serialize};
use std::mem::replace;

/// An inclusive range of calendar years, e.g. the 1981-2015 reference window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        YearRange { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start..=self.end
    }
}

/// A (year, month) iterator that yields each calendar month from the start
/// month through the end month (inclusive), restricted to `months`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthRange {
    current: (i32, u32),
    end: (i32, u32),
    months: std::ops::RangeInclusive<u32>,
}

impl MonthRange {
    /// Every month of every year in `years` whose month lies in `months`.
    pub fn new(years: YearRange, months: std::ops::RangeInclusive<u32>) -> Self {
        MonthRange {
            current: (years.start, 1),
            end: (years.end, 12),
            months,
        }
    }

    fn advance(ym: (i32, u32)) -> (i32, u32) {
        if ym.1 >= 12 {
            (ym.0 + 1, 1)
        } else {
            (ym.0, ym.1 + 1)
        }
    }
}

impl Iterator for MonthRange {
    type Item = (i32, u32);
    fn next(&mut self) -> Option<Self::Item> {
        while self.current <= self.end {
            let next = MonthRange::advance(self.current);
            let ym = replace(&mut self.current, next);
            if self.months.contains(&ym.1) {
                return Some(ym);
            }
        }
        None
    }
}
