//! Pipeline configuration and credentials.
//!
//! Defaults cover the standard run (DE_LU from 2024-01-01 until the current
//! hour, output under `data/`). An optional `gridlab.toml` in the working
//! directory overrides them. The API key comes from the environment, loaded
//! from a `.env` file when one exists.

use chrono::{DateTime, DurationRound, NaiveDate, TimeDelta, Utc};
use gridlab_core::data::{Area, FetchWindow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the ENTSO-E security token.
pub const API_KEY_VAR: &str = "ENTSOE_API_KEY";

/// Optional override file, looked up in the working directory.
pub const CONFIG_FILE: &str = "gridlab.toml";

pub const DEFAULT_REGION: &str = "DE_LU";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const TABLE_FILE: &str = "training_data.csv";

/// Fatal configuration problems, raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key not found: set {API_KEY_VAR} in the environment or a .env file")]
    MissingApiKey,

    #[error("invalid window: start {start} must be before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Secret material, kept apart from the rest of the configuration so it is
/// never logged with it.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self { api_key })
    }

    /// Read the key from the process environment (after loading `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let key = std::env::var(API_KEY_VAR).map_err(|_| ConfigError::MissingApiKey)?;
        Self::new(key)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("api_key", &"<redacted>").finish()
    }
}

/// Overrides accepted in `gridlab.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    region: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    output_dir: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
}

/// Everything a run needs except credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Bidding-zone code, e.g. `DE_LU`.
    pub region: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Directory holding the table and the QA plots.
    pub output_dir: PathBuf,
    pub http_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            region: DEFAULT_REGION.to_string(),
            start: DateTime::from_naive_utc_and_offset(
                NaiveDate::from_ymd_opt(2024, 1, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .unwrap_or_default(),
                Utc,
            ),
            end: now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            http_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Defaults, overridden by `gridlab.toml` when it exists in the working
    /// directory.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::from_file(path)
        } else {
            Self::default().validated()
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE),
            source,
        })?;

        let mut config = Self::default();
        if let Some(region) = file.region {
            config.region = region;
        }
        if let Some(d) = file.start_date {
            config.start = midnight_utc(d);
        }
        if let Some(d) = file.end_date {
            config.end = midnight_utc(d);
        }
        if let Some(dir) = file.output_dir {
            config.output_dir = dir;
        }
        if let Some(secs) = file.http_timeout_secs {
            config.http_timeout = Duration::from_secs(secs);
        }
        config.validated()
    }

    /// Check the window and the region.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.start >= self.end {
            return Err(ConfigError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Area::lookup(&self.region).map_err(|_| ConfigError::UnknownRegion(self.region.clone()))?;
        Ok(self)
    }

    pub fn window(&self) -> FetchWindow {
        FetchWindow {
            start: self.start,
            end: self.end,
        }
    }

    /// Location of the persisted table.
    pub fn table_path(&self) -> PathBuf {
        self.output_dir.join(TABLE_FILE)
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_target_de_lu_from_2024() {
        let c = PipelineConfig::default();
        assert_eq!(c.region, "DE_LU");
        assert_eq!(c.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(c.end, c.end.duration_trunc(TimeDelta::hours(1)).unwrap());
        assert_eq!(c.table_path(), PathBuf::from("data/training_data.csv"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let c = PipelineConfig::from_toml_str(
            r#"
            region = "FR"
            start_date = "2024-03-01"
            end_date = "2024-04-01"
            output_dir = "out"
            http_timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(c.region, "FR");
        assert_eq!(c.start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(c.end, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(c.table_path(), PathBuf::from("out/training_data.csv"));
        assert_eq!(c.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = PipelineConfig::from_toml_str(
            r#"
            start_date = "2024-05-01"
            end_date = "2024-04-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow { .. }));
    }

    #[test]
    fn unknown_region_is_rejected() {
        let err = PipelineConfig::from_toml_str(r#"region = "ATLANTIS""#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRegion(r) if r == "ATLANTIS"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PipelineConfig::from_toml_str(r#"regoin = "FR""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn blank_api_key_is_missing() {
        assert!(matches!(Credentials::new("  "), Err(ConfigError::MissingApiKey)));
        assert_eq!(Credentials::new("token").unwrap().api_key(), "token");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let c = Credentials::new("super-secret").unwrap();
        assert!(!format!("{c:?}").contains("super-secret"));
    }
}
