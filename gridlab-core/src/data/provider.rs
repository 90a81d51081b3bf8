//! Market-data provider trait, response shapes and structured error types.
//!
//! The MarketDataProvider trait abstracts over upstream sources (the ENTSO-E
//! Transparency Platform, fixtures in tests) so the aligner never depends on
//! HTTP or XML details.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use thiserror::Error;

/// The three upstream signals the pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Day-ahead market clearing price (the prediction target).
    DayAheadPrice,
    /// Day-ahead total load forecast.
    LoadForecast,
    /// Day-ahead wind and solar generation forecast.
    WindSolarForecast,
}

impl Signal {
    /// Fetch order used by the aligner.
    pub const ALL: [Signal; 3] = [
        Signal::DayAheadPrice,
        Signal::LoadForecast,
        Signal::WindSolarForecast,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Signal::DayAheadPrice => "day-ahead prices",
            Signal::LoadForecast => "load forecast",
            Signal::WindSolarForecast => "wind and solar forecast",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Half-open UTC query window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DataError> {
        if start >= end {
            return Err(DataError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Split into consecutive sub-windows no longer than `max_len`.
    pub fn chunks(&self, max_len: Duration) -> Vec<FetchWindow> {
        let mut out = Vec::new();
        let mut cursor = self.start;
        while cursor < self.end {
            let next = (cursor + max_len).min(self.end);
            out.push(FetchWindow {
                start: cursor,
                end: next,
            });
            cursor = next;
        }
        out
    }
}

/// A single, optionally labeled, time-indexed series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    pub label: Option<String>,
    pub index: Vec<DateTime<Utc>>,
    pub values: Vec<Option<f64>>,
}

/// One labeled column of a [`RawTable`]. Shares the table's index.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// A multi-column table sharing one time index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub index: Vec<DateTime<Utc>>,
    pub columns: Vec<RawColumn>,
}

/// What a provider returns for one signal. Depending on provider and region
/// the same query may come back as a bare series or as a table.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    Series(RawSeries),
    Table(RawTable),
}

impl ProviderResponse {
    /// Number of timestamps carried by the response.
    pub fn len(&self) -> usize {
        match self {
            ProviderResponse::Series(s) => s.index.len(),
            ProviderResponse::Table(t) => t.index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output and logs.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("authentication rejected: {0}")]
    AuthenticationRequired(String),

    #[error("unknown bidding zone '{0}'")]
    UnknownRegion(String),

    #[error("invalid query window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("provider returned no data for {signal}: {reason}")]
    NoData { signal: Signal, reason: String },

    #[error("provider returned an empty result for {signal}")]
    EmptyResponse { signal: Signal },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("duplicate column '{0}' after normalization")]
    DuplicateColumn(String),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("provider error: {0}")]
    Other(String),
}

/// Trait for market-data providers.
///
/// Implementations handle a particular source. Each call is one blocking
/// request (or a strictly sequential series of requests) and is never
/// retried by the caller.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch one signal for a bidding zone over a UTC window.
    fn fetch(
        &self,
        signal: Signal,
        region: &str,
        window: &FetchWindow,
    ) -> Result<ProviderResponse, DataError>;
}
