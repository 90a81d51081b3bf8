//! Target-anchored gap policy.
//!
//! A row without a ground-truth price cannot be used for supervised training,
//! so it is dropped. Gaps in driver columns are left in place.

use super::align::{FrameColumn, TimeFrame};
use super::provider::DataError;

/// Row accounting for one application of the gap policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub dropped: usize,
}

/// Drop every row whose `target` cell is missing.
pub fn drop_missing_target(
    frame: TimeFrame,
    target: &str,
) -> Result<(TimeFrame, GapReport), DataError> {
    let target_col = frame
        .column(target)
        .ok_or_else(|| DataError::MissingColumn(target.to_string()))?;
    let keep: Vec<bool> = target_col.values.iter().map(Option::is_some).collect();

    let rows_before = frame.height();
    let TimeFrame { index, columns } = frame;

    let index: Vec<_> = index
        .into_iter()
        .zip(&keep)
        .filter_map(|(ts, &k)| k.then_some(ts))
        .collect();
    let columns = columns
        .into_iter()
        .map(|c| FrameColumn {
            name: c.name,
            values: c
                .values
                .into_iter()
                .zip(&keep)
                .filter_map(|(v, &k)| k.then_some(v))
                .collect(),
        })
        .collect();

    let rows_after = index.len();
    Ok((
        TimeFrame { index, columns },
        GapReport {
            rows_before,
            rows_after,
            dropped: rows_before - rows_after,
        },
    ))
}
