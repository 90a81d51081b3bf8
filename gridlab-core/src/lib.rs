//! GridLab Core: response normalization, hourly alignment, calendar features.
//!
//! This crate contains the data side of the day-ahead price dataset builder:
//! - Provider trait and the two upstream response shapes (series / table)
//! - Boundary normalization to canonical column names
//! - Union-of-indices join and hourly mean resampling
//! - Target-anchored gap policy and calendar features
//! - The aligned table, its persisted schema, and the ENTSO-E client

pub mod data;
