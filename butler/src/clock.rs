//! Local-date helpers; every job reasons about "today" in the configured timezone.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// Today's calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// `YYYY-MM-DD`.
pub fn iso_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
