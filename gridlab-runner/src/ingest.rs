//! The Aligner stage: fetch, join, resample, filter, derive, persist.
//!
//! Signals are fetched one at a time in a fixed order (price, load,
//! generation). Any failure after configuration is caught by [`run_ingest`],
//! logged, and leaves nothing on disk.

use crate::config::PipelineConfig;
use crate::persist::{write_table, PersistError};
use gridlab_core::data::{
    drop_missing_target, normalize, outer_join, resample_hourly, AlignedTable, DataError,
    FetchWindow, GapReport, MarketDataProvider, NamedSeries, PartialCoverage, Signal,
    TARGET_COLUMN,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Data(#[from] DataError),

    #[error("no usable rows: every hour in the window is missing '{TARGET_COLUMN}'")]
    NoUsableRows,

    #[error("failed to persist table: {0}")]
    Persist(#[from] PersistError),
}

/// The in-memory result of alignment, before anything is written.
#[derive(Debug)]
pub struct BuiltTable {
    pub table: AlignedTable,
    pub gaps: GapReport,
    pub partial: Vec<PartialCoverage>,
    /// Samples discarded because a series repeated a timestamp.
    pub repeated_samples: usize,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub path: PathBuf,
    pub rows: usize,
    /// Data columns, excluding the timestamp.
    pub cols: usize,
    pub dropped: usize,
    pub partial: Vec<PartialCoverage>,
    /// BLAKE3 hex digest of the written file.
    pub digest: String,
}

impl IngestSummary {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

/// Fetches the three signals for one region and window.
pub struct Aligner<'a> {
    provider: &'a dyn MarketDataProvider,
    config: &'a PipelineConfig,
}

impl<'a> Aligner<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, config: &'a PipelineConfig) -> Self {
        Self { provider, config }
    }

    /// Fetch and normalize every signal, in order.
    pub fn fetch_all(&self) -> Result<Vec<NamedSeries>, IngestError> {
        let window = self.config.window();
        let mut series = Vec::new();
        for signal in Signal::ALL {
            series.extend(self.fetch_one(signal, &window)?);
        }
        ensure_unique_names(&series)?;
        Ok(series)
    }

    fn fetch_one(
        &self,
        signal: Signal,
        window: &FetchWindow,
    ) -> Result<Vec<NamedSeries>, IngestError> {
        info!(
            provider = self.provider.name(),
            %signal,
            region = %self.config.region,
            start = %window.start,
            end = %window.end,
            "fetching"
        );
        let response = self.provider.fetch(signal, &self.config.region, window)?;
        let named = normalize(signal, response)?;
        for s in &named {
            info!(column = %s.name, samples = s.len(), "normalized");
        }
        Ok(named)
    }

    /// Fetch, align and persist. Errors propagate to the caller.
    pub fn run(&self) -> Result<IngestSummary, IngestError> {
        let built = build_table(&self.fetch_all()?)?;
        let path = self.config.table_path();
        write_table(&built.table, &path)?;
        let digest = file_digest(&path)?;

        Ok(IngestSummary {
            rows: built.table.height(),
            cols: built.table.width(),
            dropped: built.gaps.dropped,
            partial: built.partial,
            digest,
            path,
        })
    }
}

/// Join, resample, apply the gap policy and derive calendar features.
pub fn build_table(series: &[NamedSeries]) -> Result<BuiltTable, IngestError> {
    let joined = outer_join(series);
    if joined.repeated_samples > 0 {
        warn!(
            repeated = joined.repeated_samples,
            "discarded samples with repeated timestamps (first sample kept)"
        );
    }

    let resampled = resample_hourly(&joined.frame);
    for p in &resampled.partial {
        warn!(
            column = %p.column,
            hours = p.hours,
            resolution_secs = p.resolution_secs,
            "hours averaged from partial sub-hourly coverage"
        );
    }

    let (frame, gaps) = drop_missing_target(resampled.frame, TARGET_COLUMN)?;
    if gaps.dropped > 0 {
        warn!(
            dropped = gaps.dropped,
            before = gaps.rows_before,
            after = gaps.rows_after,
            "dropped rows with missing target"
        );
    }
    if frame.height() == 0 {
        return Err(IngestError::NoUsableRows);
    }

    Ok(BuiltTable {
        table: AlignedTable::from_frame(frame),
        gaps,
        partial: resampled.partial,
        repeated_samples: joined.repeated_samples,
    })
}

/// Column names must be unique across all signals, not only within one.
fn ensure_unique_names(series: &[NamedSeries]) -> Result<(), DataError> {
    let mut seen = HashSet::new();
    match series.iter().find(|s| !seen.insert(s.name.as_str())) {
        Some(dup) => Err(DataError::DuplicateColumn(dup.name.clone())),
        None => Ok(()),
    }
}

fn file_digest(path: &Path) -> Result<String, PersistError> {
    let bytes = std::fs::read(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Run the Aligner, logging any failure instead of propagating it.
///
/// Returns `None` when the run failed; nothing is written in that case.
pub fn run_ingest(
    provider: &dyn MarketDataProvider,
    config: &PipelineConfig,
) -> Option<IngestSummary> {
    match Aligner::new(provider, config).run() {
        Ok(summary) => {
            info!(
                path = %summary.path.display(),
                rows = summary.rows,
                cols = summary.cols,
                digest = %summary.digest,
                "training table written"
            );
            Some(summary)
        }
        Err(e) => {
            error!(error = %e, "ingestion failed; no table written");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use gridlab_core::data::{ProviderResponse, RawColumn, RawTable};

    fn hours(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|h| base + Duration::hours(h as i64)).collect()
    }

    fn named(name: &str, index: Vec<DateTime<Utc>>, values: Vec<Option<f64>>) -> NamedSeries {
        NamedSeries {
            name: name.into(),
            index,
            values,
        }
    }

    /// Answers every signal with a one-column table.
    struct LabelledProvider {
        generation_label: &'static str,
    }

    impl MarketDataProvider for LabelledProvider {
        fn name(&self) -> &str {
            "labelled"
        }

        fn fetch(
            &self,
            signal: Signal,
            _region: &str,
            window: &FetchWindow,
        ) -> Result<ProviderResponse, DataError> {
            let label = match signal {
                Signal::DayAheadPrice => "Price",
                Signal::LoadForecast => "Forecasted Load",
                Signal::WindSolarForecast => self.generation_label,
            };
            Ok(ProviderResponse::Table(RawTable {
                index: vec![window.start],
                columns: vec![RawColumn {
                    label: label.into(),
                    values: vec![Some(1.0)],
                }],
            }))
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            start: hours(1)[0],
            end: hours(2)[1],
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn generation_column_named_like_target_is_rejected() {
        let provider = LabelledProvider {
            generation_label: "Price DA",
        };
        let cfg = config();
        let err = Aligner::new(&provider, &cfg).fetch_all().unwrap_err();
        assert!(matches!(
            err,
            IngestError::Data(DataError::DuplicateColumn(name)) if name == TARGET_COLUMN
        ));
    }

    #[test]
    fn distinct_names_across_signals_pass() {
        let provider = LabelledProvider {
            generation_label: "Solar",
        };
        let cfg = config();
        let names: Vec<String> = Aligner::new(&provider, &cfg)
            .fetch_all()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["price_da", "load_forecast", "solar"]);
    }

    #[test]
    fn build_table_drops_missing_targets() {
        let price = named(
            TARGET_COLUMN,
            hours(4),
            vec![Some(1.0), None, Some(3.0), Some(4.0)],
        );
        let load = named("load_forecast", hours(4), vec![Some(10.0); 4]);

        let built = build_table(&[price, load]).unwrap();
        assert_eq!(built.table.height(), 3);
        assert_eq!(built.gaps.dropped, 1);
        assert_eq!(built.table.width(), 5);
    }

    #[test]
    fn build_table_counts_repeated_samples() {
        let mut index = hours(3);
        index.insert(1, index[0]);
        let price = named(TARGET_COLUMN, index, vec![Some(1.0), Some(99.0), Some(2.0), Some(3.0)]);

        let built = build_table(&[price]).unwrap();
        assert_eq!(built.repeated_samples, 1);
        assert_eq!(built.table.columns[0].values[0], Some(1.0));
    }

    #[test]
    fn build_table_without_any_target_fails() {
        let price = named(TARGET_COLUMN, hours(2), vec![None, None]);
        let err = build_table(&[price]).unwrap_err();
        assert!(matches!(err, IngestError::NoUsableRows));
    }

    #[test]
    fn build_table_without_target_column_fails() {
        let load = named("load_forecast", hours(2), vec![Some(1.0); 2]);
        let err = build_table(&[load]).unwrap_err();
        assert!(matches!(err, IngestError::Data(DataError::MissingColumn(_))));
    }
}
