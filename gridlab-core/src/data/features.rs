//! Calendar features derived from the hourly UTC index.

use chrono::{DateTime, Datelike, Timelike, Utc};

pub const HOUR_COLUMN: &str = "hour";
pub const DAY_OF_WEEK_COLUMN: &str = "day_of_week";
pub const MONTH_COLUMN: &str = "month";

/// Names of the derived columns, in output order.
pub const CALENDAR_COLUMNS: [&str; 3] = [HOUR_COLUMN, DAY_OF_WEEK_COLUMN, MONTH_COLUMN];

/// Integer calendar features, one entry per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarFeatures {
    /// 0..=23
    pub hour: Vec<i32>,
    /// Monday = 0 .. Sunday = 6
    pub day_of_week: Vec<i32>,
    /// 1..=12
    pub month: Vec<i32>,
}

/// Derive features on the UTC clock. No timezone conversion is applied.
pub fn calendar_features(index: &[DateTime<Utc>]) -> CalendarFeatures {
    let mut features = CalendarFeatures {
        hour: Vec::with_capacity(index.len()),
        day_of_week: Vec::with_capacity(index.len()),
        month: Vec::with_capacity(index.len()),
    };
    for ts in index {
        features.hour.push(ts.hour() as i32);
        features
            .day_of_week
            .push(ts.weekday().num_days_from_monday() as i32);
        features.month.push(ts.month() as i32);
    }
    features
}
