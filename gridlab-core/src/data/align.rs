//! Union-of-indices time alignment.
//!
//! Given named series with independent indices, lay them out on one common
//! timeline. A series with no sample at a timestamp gets a missing cell there;
//! nothing is filled and nothing is filtered.

use super::normalize::NamedSeries;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// One named column of a [`TimeFrame`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Columns sharing one sorted, duplicate-free UTC index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeFrame {
    /// The common time axis (sorted ascending).
    pub index: Vec<DateTime<Utc>>,
    /// Each column has the same length as `index`.
    pub columns: Vec<FrameColumn>,
}

impl TimeFrame {
    pub fn height(&self) -> usize {
        self.index.len()
    }

    pub fn column(&self, name: &str) -> Option<&FrameColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Outcome of [`outer_join`]: the frame plus how many repeated samples were
/// discarded (same series, same timestamp; first one wins).
#[derive(Debug)]
pub struct JoinResult {
    pub frame: TimeFrame,
    pub repeated_samples: usize,
}

/// Join series on the union of all their timestamps.
///
/// Column order follows the input order.
pub fn outer_join(series: &[NamedSeries]) -> JoinResult {
    let mut all_ts = BTreeSet::new();
    for s in series {
        all_ts.extend(s.index.iter().copied());
    }
    let index: Vec<DateTime<Utc>> = all_ts.into_iter().collect();
    let position: HashMap<DateTime<Utc>, usize> =
        index.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();

    let mut repeated_samples = 0;
    let mut columns = Vec::with_capacity(series.len());

    for s in series {
        let mut values: Vec<Option<f64>> = vec![None; index.len()];
        let mut filled = vec![false; index.len()];
        for (ts, v) in s.index.iter().zip(&s.values) {
            let row = position[ts];
            if filled[row] {
                repeated_samples += 1;
                continue;
            }
            filled[row] = true;
            values[row] = *v;
        }
        columns.push(FrameColumn {
            name: s.name.clone(),
            values,
        });
    }

    JoinResult {
        frame: TimeFrame { index, columns },
        repeated_samples,
    }
}
