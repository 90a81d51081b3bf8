//! The Validator stage: structural checks and plots over a persisted table.

pub mod checks;
pub mod plots;

use crate::persist::{read_table, PersistError};
use gridlab_core::data::{
    SchemaError, TableSchema, CALENDAR_COLUMNS, LOAD_COLUMN, TARGET_COLUMN, TIMESTAMP_COLUMN,
};
use plots::{
    ChartText, Line, PlotError, PRICE_CHART, PRICE_PLOT_FILE, RENEWABLES_CHART,
    RENEWABLES_PLOT_FILE,
};
use polars::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum QaError {
    #[error("input table not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to read table: {0}")]
    Read(#[from] PersistError),

    #[error("table does not match the expected schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("check failed: {0}")]
    Check(#[from] PolarsError),

    #[error("failed to render {}: {source}", path.display())]
    Plot { path: PathBuf, source: PlotError },
}

/// Findings of one Validator run.
#[derive(Debug, Clone, PartialEq)]
pub struct QaReport {
    pub rows: usize,
    /// Columns with at least one missing value.
    pub missing: Vec<(String, usize)>,
    pub duplicate_timestamps: usize,
    pub negative_prices: usize,
    pub price_plot: PathBuf,
    pub renewables_plot: PathBuf,
}

impl fmt::Display for QaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows checked: {}", self.rows)?;
        writeln!(f, "Missing values:")?;
        if self.missing.is_empty() {
            writeln!(f, "  none found")?;
        }
        for (column, count) in &self.missing {
            writeln!(f, "  {column}: {count}")?;
        }
        writeln!(f, "Duplicate timestamps: {}", self.duplicate_timestamps)?;
        writeln!(f, "Negative {TARGET_COLUMN} rows: {}", self.negative_prices)?;
        writeln!(f, "Price plot: {}", self.price_plot.display())?;
        write!(f, "Renewables plot: {}", self.renewables_plot.display())
    }
}

/// Every column that is not the index, target, load or a calendar feature.
pub fn generation_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .filter(|n| {
            n != TIMESTAMP_COLUMN
                && n != TARGET_COLUMN
                && n != LOAD_COLUMN
                && !CALENDAR_COLUMNS.contains(&n.as_str())
        })
        .collect()
}

pub struct Validator {
    table_path: PathBuf,
}

impl Validator {
    pub fn new(table_path: impl Into<PathBuf>) -> Self {
        Self {
            table_path: table_path.into(),
        }
    }

    fn artifact(&self, file: &str) -> PathBuf {
        self.table_path
            .parent()
            .map(|dir| dir.join(file))
            .unwrap_or_else(|| PathBuf::from(file))
    }

    pub fn run(&self) -> Result<QaReport, QaError> {
        if !self.table_path.is_file() {
            return Err(QaError::MissingInput(self.table_path.clone()));
        }

        let df = read_table(&self.table_path)?;
        TableSchema::validate(&df)?;
        info!(path = %self.table_path.display(), rows = df.height(), "loaded table");

        let missing = checks::missing_counts(&df);
        let duplicate_timestamps = checks::duplicate_timestamps(&df)?;
        let negative_prices = checks::negative_prices(&df)?;
        if duplicate_timestamps > 0 {
            warn!(count = duplicate_timestamps, "duplicate timestamps");
        }
        if negative_prices > 0 {
            info!(count = negative_prices, "negative prices present");
        }

        let x = plots::time_axis(&df, TIMESTAMP_COLUMN).map_err(|source| QaError::Plot {
            path: self.table_path.clone(),
            source,
        })?;

        let price_plot = self.artifact(PRICE_PLOT_FILE);
        self.plot(&price_plot, PRICE_CHART, &x, &df, &[TARGET_COLUMN.to_string()])?;

        let generation = generation_columns(&df);
        if generation.len() < 2 {
            warn!(
                columns = ?generation,
                "fewer than two generation columns to plot"
            );
        }
        let renewables_plot = self.artifact(RENEWABLES_PLOT_FILE);
        self.plot(&renewables_plot, RENEWABLES_CHART, &x, &df, &generation)?;

        Ok(QaReport {
            rows: df.height(),
            missing,
            duplicate_timestamps,
            negative_prices,
            price_plot,
            renewables_plot,
        })
    }

    fn plot(
        &self,
        path: &Path,
        text: ChartText,
        x: &[Option<i64>],
        df: &DataFrame,
        columns: &[String],
    ) -> Result<(), QaError> {
        columns
            .iter()
            .map(|c| Line::from_column(df, c))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|lines| plots::render(path, text, x, &lines))
            .map_err(|source| QaError::Plot {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "plot written");
        Ok(())
    }
}

/// Run the Validator, logging any failure instead of propagating it.
///
/// A missing input table is reported and no plot files are created.
pub fn run_qa(table_path: &Path) -> Option<QaReport> {
    match Validator::new(table_path).run() {
        Ok(report) => Some(report),
        Err(QaError::MissingInput(path)) => {
            warn!(path = %path.display(), "input table not found; run ingest first");
            None
        }
        Err(e) => {
            error!(error = %e, "quality checks failed");
            None
        }
    }
}
