//! Boundary normalization of provider responses.
//!
//! Every response, whatever its shape, leaves this module as a list of
//! [`NamedSeries`] with canonical column names. Nothing downstream looks at
//! [`ProviderResponse`] again.

use super::provider::{DataError, ProviderResponse, RawColumn, RawSeries, RawTable, Signal};
use chrono::{DateTime, Utc};

/// Canonical name of the prediction target.
pub const TARGET_COLUMN: &str = "price_da";

/// Canonical name of the load driver.
pub const LOAD_COLUMN: &str = "load_forecast";

/// A time series with a canonical column name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    pub index: Vec<DateTime<Utc>>,
    pub values: Vec<Option<f64>>,
}

impl NamedSeries {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Normalize a provider label to a column name: lower-case, spaces to `_`.
///
/// `"Wind Offshore"` becomes `wind_offshore`.
pub fn column_name(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Resolve a response into named columns for the given signal.
pub fn normalize(
    signal: Signal,
    response: ProviderResponse,
) -> Result<Vec<NamedSeries>, DataError> {
    if response.is_empty() {
        return Err(DataError::EmptyResponse { signal });
    }

    let columns = match (signal, response) {
        (Signal::DayAheadPrice, resp) => vec![single_column(signal, resp, TARGET_COLUMN)?],
        (Signal::LoadForecast, resp) => vec![single_column(signal, resp, LOAD_COLUMN)?],
        (Signal::WindSolarForecast, ProviderResponse::Series(series)) => {
            let label = series.label.clone().ok_or_else(|| {
                DataError::ResponseFormatChanged(format!(
                    "{signal} arrived as an unlabeled series"
                ))
            })?;
            vec![from_series(series, column_name(&label))?]
        }
        (Signal::WindSolarForecast, ProviderResponse::Table(table)) => from_table(table)?,
    };
    if columns.is_empty() {
        return Err(DataError::EmptyResponse { signal });
    }

    let mut seen: Vec<&str> = Vec::with_capacity(columns.len());
    for col in &columns {
        if seen.contains(&col.name.as_str()) {
            return Err(DataError::DuplicateColumn(col.name.clone()));
        }
        seen.push(&col.name);
    }

    Ok(columns)
}

/// Price and load must carry exactly one column, whatever the shape.
fn single_column(
    signal: Signal,
    response: ProviderResponse,
    name: &str,
) -> Result<NamedSeries, DataError> {
    match response {
        ProviderResponse::Series(series) => from_series(series, name.to_string()),
        ProviderResponse::Table(table) => {
            if table.columns.len() != 1 {
                return Err(DataError::ResponseFormatChanged(format!(
                    "expected a single column for {signal}, got {}",
                    table.columns.len()
                )));
            }
            let mut columns = from_table(table)?;
            let mut only = columns.remove(0);
            only.name = name.to_string();
            Ok(only)
        }
    }
}

fn from_series(series: RawSeries, name: String) -> Result<NamedSeries, DataError> {
    check_len(&name, series.index.len(), series.values.len())?;
    Ok(NamedSeries {
        name,
        index: series.index,
        values: series.values.into_iter().map(finite).collect(),
    })
}

fn from_table(table: RawTable) -> Result<Vec<NamedSeries>, DataError> {
    let RawTable { index, columns } = table;
    columns
        .into_iter()
        .map(|RawColumn { label, values }| {
            let name = column_name(&label);
            check_len(&name, index.len(), values.len())?;
            Ok(NamedSeries {
                name,
                index: index.clone(),
                values: values.into_iter().map(finite).collect(),
            })
        })
        .collect()
}

fn check_len(name: &str, index_len: usize, values_len: usize) -> Result<(), DataError> {
    if index_len != values_len {
        return Err(DataError::ResponseFormatChanged(format!(
            "column '{name}' has {values_len} values for {index_len} timestamps"
        )));
    }
    Ok(())
}

/// NaN and infinities are missing values, not numbers.
fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}
