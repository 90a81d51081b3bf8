//! Integration tests for the ingestion stage.
//!
//! A scripted provider stands in for the market-data API so the full
//! fetch → align → persist path runs without a network.

use chrono::{DateTime, Duration, TimeZone, Utc};
use gridlab_core::data::{
    DataError, FetchWindow, MarketDataProvider, ProviderResponse, RawColumn, RawSeries, RawTable,
    Signal, TableSchema, TARGET_COLUMN,
};
use gridlab_runner::{read_table, run_ingest, Aligner, IngestError, PipelineConfig};
use std::path::Path;
use std::time::Duration as StdDuration;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        region: "DE_LU".into(),
        start: base(),
        end: base() + Duration::days(2),
        output_dir: dir.to_path_buf(),
        http_timeout: StdDuration::from_secs(5),
    }
}

/// Two days of synthetic data: hourly prices with one missing hour, hourly
/// load, quarter-hourly solar and onshore wind.
struct FakeProvider {
    missing_price_hour: usize,
    /// Quarter-hour slot of the solar series left empty.
    missing_solar_slot: Option<usize>,
    fail_on: Option<Signal>,
}

impl FakeProvider {
    fn standard() -> Self {
        Self {
            missing_price_hour: 10,
            missing_solar_slot: None,
            fail_on: None,
        }
    }

    fn hourly(window: &FetchWindow) -> Vec<DateTime<Utc>> {
        let n = (window.end - window.start).num_hours();
        (0..n).map(|h| window.start + Duration::hours(h)).collect()
    }

    fn quarter_hourly(window: &FetchWindow) -> Vec<DateTime<Utc>> {
        let n = (window.end - window.start).num_minutes() / 15;
        (0..n).map(|q| window.start + Duration::minutes(15 * q)).collect()
    }
}

impl MarketDataProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch(
        &self,
        signal: Signal,
        _region: &str,
        window: &FetchWindow,
    ) -> Result<ProviderResponse, DataError> {
        if self.fail_on == Some(signal) {
            return Err(DataError::NetworkUnreachable("connection refused".into()));
        }

        match signal {
            Signal::DayAheadPrice => {
                let index = Self::hourly(window);
                let values = (0..index.len())
                    .map(|h| (h != self.missing_price_hour).then(|| 40.0 + h as f64 - 20.0))
                    .collect();
                Ok(ProviderResponse::Series(RawSeries {
                    label: None,
                    index,
                    values,
                }))
            }
            Signal::LoadForecast => {
                let index = Self::hourly(window);
                let values = (0..index.len()).map(|h| Some(50_000.0 + h as f64)).collect();
                Ok(ProviderResponse::Table(RawTable {
                    index,
                    columns: vec![RawColumn {
                        label: "Forecasted Load".into(),
                        values,
                    }],
                }))
            }
            Signal::WindSolarForecast => {
                let index = Self::quarter_hourly(window);
                let solar = (0..index.len())
                    .map(|q| (Some(q) != self.missing_solar_slot).then_some((q % 4) as f64))
                    .collect();
                let wind = (0..index.len()).map(|q| Some(1_000.0 + q as f64)).collect();
                Ok(ProviderResponse::Table(RawTable {
                    index,
                    columns: vec![
                        RawColumn {
                            label: "Solar".into(),
                            values: solar,
                        },
                        RawColumn {
                            label: "Wind Onshore".into(),
                            values: wind,
                        },
                    ],
                }))
            }
        }
    }
}

#[test]
fn two_days_with_one_missing_price_hour_yield_47_rows() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    let summary = Aligner::new(&FakeProvider::standard(), &cfg).run().unwrap();

    assert_eq!(summary.shape(), (47, 7));
    assert_eq!(summary.dropped, 1);
    assert!(summary.partial.is_empty());
    assert_eq!(summary.path, dir.path().join("training_data.csv"));

    let df = read_table(&summary.path).unwrap();
    TableSchema::validate(&df).unwrap();
    assert_eq!(df.height(), 47);
    assert_eq!(df.column(TARGET_COLUMN).unwrap().null_count(), 0);

    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "timestamp",
            "price_da",
            "load_forecast",
            "solar",
            "wind_onshore",
            "hour",
            "day_of_week",
            "month"
        ]
    );
    for feature in ["hour", "day_of_week", "month"] {
        assert_eq!(df.column(feature).unwrap().null_count(), 0, "{feature}");
    }
}

#[test]
fn quarter_hours_are_averaged_into_hours() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let summary = Aligner::new(&FakeProvider::standard(), &cfg).run().unwrap();

    let text = std::fs::read_to_string(&summary.path).unwrap();
    let first = text.lines().nth(1).unwrap();
    // solar quarters 0,1,2,3 → 1.5; wind 1000..1003 → 1001.5; 2024-01-01 is a Monday.
    assert_eq!(
        first,
        "2024-01-01 00:00:00+00:00,20.0,50000.0,1.5,1001.5,0,0,1"
    );
    assert!(!text.contains("2024-01-01 10:00:00+00:00"));
}

#[test]
fn partial_sub_hourly_coverage_is_counted() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let provider = FakeProvider {
        missing_solar_slot: Some(5),
        ..FakeProvider::standard()
    };

    let summary = Aligner::new(&provider, &cfg).run().unwrap();

    assert_eq!(summary.partial.len(), 1);
    assert_eq!(summary.partial[0].column, "solar");
    assert_eq!(summary.partial[0].resolution_secs, 900);
    assert_eq!(summary.partial[0].hours, 1);
    assert_eq!(summary.rows, 47);
}

#[test]
fn identical_inputs_produce_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    let first = run_ingest(&FakeProvider::standard(), &cfg).unwrap();
    let bytes_first = std::fs::read(&first.path).unwrap();
    let second = run_ingest(&FakeProvider::standard(), &cfg).unwrap();
    let bytes_second = std::fs::read(&second.path).unwrap();

    assert_eq!(bytes_first, bytes_second);
    assert_eq!(first.digest, second.digest);
    assert_eq!(first.digest.len(), 64);
}

#[test]
fn failing_provider_leaves_no_table() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let provider = FakeProvider {
        fail_on: Some(Signal::LoadForecast),
        ..FakeProvider::standard()
    };

    assert!(run_ingest(&provider, &cfg).is_none());
    assert!(!cfg.table_path().exists());

    let err = Aligner::new(&provider, &cfg).run().unwrap_err();
    assert!(matches!(
        err,
        IngestError::Data(DataError::NetworkUnreachable(_))
    ));
}

#[test]
fn failed_rerun_keeps_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    let ok = run_ingest(&FakeProvider::standard(), &cfg).unwrap();
    let before = std::fs::read(&ok.path).unwrap();

    let failing = FakeProvider {
        fail_on: Some(Signal::WindSolarForecast),
        ..FakeProvider::standard()
    };
    assert!(run_ingest(&failing, &cfg).is_none());
    assert_eq!(std::fs::read(&ok.path).unwrap(), before);
}
