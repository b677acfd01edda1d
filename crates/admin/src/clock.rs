//! Source of "today" for date filters.

use chrono::{Local, NaiveDate};

/// Provides the current local date.
pub trait Clock: Send + Sync {
    /// Today's date in the local time zone.
    fn today(&self) -> NaiveDate;
}

/// The system clock, zoned to local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock frozen on one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
