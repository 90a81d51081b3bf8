//! Data ingestion, alignment and feature derivation

pub mod align;
pub mod area;
pub mod entsoe;
pub mod features;
pub mod gap_policy;
pub mod normalize;
pub mod provider;
pub mod resample;
pub mod schema;
pub mod table;

pub use align::{outer_join, FrameColumn, JoinResult, TimeFrame};
pub use area::Area;
pub use entsoe::EntsoeClient;
pub use features::{calendar_features, CalendarFeatures, CALENDAR_COLUMNS};
pub use gap_policy::{drop_missing_target, GapReport};
pub use normalize::{column_name, normalize, NamedSeries, LOAD_COLUMN, TARGET_COLUMN};
pub use provider::{
    DataError, FetchWindow, MarketDataProvider, ProviderResponse, RawColumn, RawSeries, RawTable,
    Signal,
};
pub use resample::{resample_hourly, PartialCoverage, Resampled};
pub use schema::{SchemaError, TableSchema};
pub use table::{AlignedTable, TIMESTAMP_COLUMN, TIMESTAMP_FORMAT};
