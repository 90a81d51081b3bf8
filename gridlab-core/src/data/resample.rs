//! Hourly mean resampling.
//!
//! Generation forecasts may arrive every 15 minutes while prices are hourly.
//! Every sample is assigned to the UTC hour it falls in and each hour takes
//! the arithmetic mean of the samples that are present. Missing samples are
//! left out of the mean, never counted as zero.

use super::align::{FrameColumn, TimeFrame};
use chrono::{DateTime, Duration, Utc};

const HOUR_SECS: i64 = 3600;

/// Per-column count of hours that were averaged from fewer samples than the
/// column's native resolution implies (e.g. 1 of 4 quarter-hours).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialCoverage {
    pub column: String,
    /// Inferred native sample spacing in seconds.
    pub resolution_secs: i64,
    pub hours: usize,
}

#[derive(Debug)]
pub struct Resampled {
    /// Uniform hourly grid from the first to the last occupied hour.
    pub frame: TimeFrame,
    /// Only columns with at least one partial hour are listed.
    pub partial: Vec<PartialCoverage>,
}

/// Floor a timestamp to the start of its UTC hour.
pub fn floor_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp().rem_euclid(HOUR_SECS);
    ts - Duration::seconds(secs) - Duration::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
}

/// Resample a joined frame onto an hourly grid using the mean.
pub fn resample_hourly(frame: &TimeFrame) -> Resampled {
    let (Some(first), Some(last)) = (frame.index.first(), frame.index.last()) else {
        return Resampled {
            frame: TimeFrame {
                index: Vec::new(),
                columns: frame
                    .columns
                    .iter()
                    .map(|c| FrameColumn {
                        name: c.name.clone(),
                        values: Vec::new(),
                    })
                    .collect(),
            },
            partial: Vec::new(),
        };
    };

    let origin = floor_hour(*first);
    let n_hours = ((floor_hour(*last) - origin).num_seconds() / HOUR_SECS) as usize + 1;
    let index: Vec<DateTime<Utc>> = (0..n_hours)
        .map(|h| origin + Duration::hours(h as i64))
        .collect();

    let bucket_of =
        |ts: &DateTime<Utc>| ((floor_hour(*ts) - origin).num_seconds() / HOUR_SECS) as usize;

    let mut columns = Vec::with_capacity(frame.columns.len());
    let mut partial = Vec::new();

    for col in &frame.columns {
        let mut sums = vec![0.0_f64; n_hours];
        let mut counts = vec![0_usize; n_hours];
        for (ts, v) in frame.index.iter().zip(&col.values) {
            if let Some(x) = v {
                let b = bucket_of(ts);
                sums[b] += x;
                counts[b] += 1;
            }
        }

        let resolution_secs = native_resolution(&frame.index, &col.values);
        let expected = (HOUR_SECS / resolution_secs).max(1) as usize;
        let partial_hours = counts.iter().filter(|&&c| c > 0 && c < expected).count();
        if partial_hours > 0 {
            partial.push(PartialCoverage {
                column: col.name.clone(),
                resolution_secs,
                hours: partial_hours,
            });
        }

        let values = sums
            .iter()
            .zip(&counts)
            .map(|(s, &c)| (c > 0).then(|| s / c as f64))
            .collect();
        columns.push(FrameColumn {
            name: col.name.clone(),
            values,
        });
    }

    Resampled {
        frame: TimeFrame { index, columns },
        partial,
    }
}

/// Smallest positive spacing between present samples, capped at one hour.
/// A column with fewer than two samples is treated as hourly.
fn native_resolution(index: &[DateTime<Utc>], values: &[Option<f64>]) -> i64 {
    let present: Vec<i64> = index
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_some())
        .map(|(ts, _)| ts.timestamp())
        .collect();
    present
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0)
        .min()
        .unwrap_or(HOUR_SECS)
        .min(HOUR_SECS)
}
