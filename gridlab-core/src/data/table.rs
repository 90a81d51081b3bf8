//! The aligned, feature-ready hourly table.

use super::align::{FrameColumn, TimeFrame};
use super::features::{
    calendar_features, CalendarFeatures, DAY_OF_WEEK_COLUMN, HOUR_COLUMN, MONTH_COLUMN,
};
use chrono::{DateTime, Utc};
use polars::prelude::*;

/// Name of the leading index column in the persisted table.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Textual timestamp layout of the persisted table, e.g.
/// `2024-01-01 00:00:00+00:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Hourly rows keyed by a unique UTC timestamp, every row with a target.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    pub index: Vec<DateTime<Utc>>,
    /// Target first, then drivers.
    pub columns: Vec<FrameColumn>,
    pub features: CalendarFeatures,
}

impl AlignedTable {
    /// Attach calendar features to an hourly, gap-filtered frame.
    pub fn from_frame(frame: TimeFrame) -> Self {
        let features = calendar_features(&frame.index);
        Self {
            index: frame.index,
            columns: frame.columns,
            features,
        }
    }

    pub fn height(&self) -> usize {
        self.index.len()
    }

    /// Data columns, excluding the timestamp index (pandas-style shape).
    pub fn width(&self) -> usize {
        self.columns.len() + 3
    }

    /// Header row in output order.
    pub fn header(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width() + 1);
        names.push(TIMESTAMP_COLUMN.to_string());
        names.extend(self.columns.iter().map(|c| c.name.clone()));
        names.extend([HOUR_COLUMN, DAY_OF_WEEK_COLUMN, MONTH_COLUMN].map(String::from));
        names
    }

    /// Convert to a polars DataFrame with the timestamp rendered as text.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let timestamps: Vec<String> = self
            .index
            .iter()
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .collect();

        let mut columns = Vec::with_capacity(self.width() + 1);
        columns.push(Column::new(TIMESTAMP_COLUMN.into(), timestamps));
        for col in &self.columns {
            columns.push(Column::new(col.name.as_str().into(), col.values.clone()));
        }
        columns.push(Column::new(HOUR_COLUMN.into(), self.features.hour.clone()));
        columns.push(Column::new(
            DAY_OF_WEEK_COLUMN.into(),
            self.features.day_of_week.clone(),
        ));
        columns.push(Column::new(MONTH_COLUMN.into(), self.features.month.clone()));

        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table() -> AlignedTable {
        AlignedTable::from_frame(TimeFrame {
            index: vec![
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            ],
            columns: vec![
                FrameColumn {
                    name: "price_da".into(),
                    values: vec![Some(50.5), Some(-3.0)],
                },
                FrameColumn {
                    name: "solar".into(),
                    values: vec![None, Some(12.0)],
                },
            ],
        })
    }

    #[test]
    fn header_leads_with_timestamp_and_ends_with_features() {
        assert_eq!(
            table().header(),
            vec!["timestamp", "price_da", "solar", "hour", "day_of_week", "month"]
        );
    }

    #[test]
    fn shape_excludes_index() {
        let t = table();
        assert_eq!((t.height(), t.width()), (2, 5));
    }

    #[test]
    fn dataframe_renders_utc_timestamps() {
        let df = table().to_dataframe().unwrap();
        assert_eq!(df.shape(), (2, 6));

        let ts = df.column(TIMESTAMP_COLUMN).unwrap().str().unwrap();
        assert_eq!(ts.get(0), Some("2024-01-01 00:00:00+00:00"));

        let solar = df.column("solar").unwrap().f64().unwrap();
        assert_eq!(solar.get(0), None);
        assert_eq!(solar.get(1), Some(12.0));

        let hours = df.column("hour").unwrap().i32().unwrap();
        assert_eq!(hours.get(1), Some(1));
    }
}
