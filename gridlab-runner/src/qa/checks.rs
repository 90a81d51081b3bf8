//! Structural checks over a loaded table. Each check is independent and
//! reports a count; none of them rejects the table.

use gridlab_core::data::TARGET_COLUMN;
use polars::prelude::*;

/// Per-column null counts, only for columns with at least one null.
pub fn missing_counts(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .map(|c| (c.name().to_string(), c.null_count()))
        .collect()
}

/// Rows whose leading timestamp repeats an earlier row.
pub fn duplicate_timestamps(df: &DataFrame) -> PolarsResult<usize> {
    let Some(index) = df.get_columns().first() else {
        return Ok(0);
    };
    Ok(df.height().saturating_sub(index.n_unique()?))
}

/// Rows with a strictly negative target price.
pub fn negative_prices(df: &DataFrame) -> PolarsResult<usize> {
    let negatives = df
        .clone()
        .lazy()
        .filter(col(TARGET_COLUMN).cast(DataType::Float64).lt(lit(0.0)))
        .collect()?;
    Ok(negatives.height())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "timestamp" => &[
                "2024-01-01 00:00:00+00:00",
                "2024-01-01 01:00:00+00:00",
                "2024-01-01 01:00:00+00:00",
            ],
            "price_da" => &[Some(10.0), Some(-5.0), Some(0.0)],
            "solar" => &[None, Some(1.0), Some(2.0)],
            "wind_onshore" => &[Some(3.0), Some(4.0), Some(5.0)],
        )
        .unwrap()
    }

    #[test]
    fn missing_counts_lists_only_columns_with_nulls() {
        assert_eq!(missing_counts(&frame()), vec![("solar".to_string(), 1)]);
    }

    #[test]
    fn duplicate_count_is_rows_minus_distinct() {
        assert_eq!(duplicate_timestamps(&frame()).unwrap(), 1);
    }

    #[test]
    fn zero_price_is_not_negative() {
        assert_eq!(negative_prices(&frame()).unwrap(), 1);
    }

    #[test]
    fn clean_frame_reports_nothing() {
        let df = df!(
            "timestamp" => &["2024-01-01 00:00:00+00:00"],
            "price_da" => &[1.0],
        )
        .unwrap();
        assert!(missing_counts(&df).is_empty());
        assert_eq!(duplicate_timestamps(&df).unwrap(), 0);
        assert_eq!(negative_prices(&df).unwrap(), 0);
    }
}
