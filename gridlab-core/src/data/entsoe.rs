//! ENTSO-E Transparency Platform provider.
//!
//! Fetches day-ahead prices (A44), day-ahead load forecasts (A65) and
//! day-ahead wind and solar forecasts (A69) from the RESTful API and parses
//! the XML market documents into [`ProviderResponse`]s.
//!
//! The platform limits a query to one year, so longer windows are split into
//! consecutive chunks fetched one after another. Requests are never retried.

use super::area::Area;
use super::provider::{
    DataError, FetchWindow, MarketDataProvider, ProviderResponse, RawColumn, RawSeries, RawTable,
    Signal,
};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

/// Upper bound on the span of a single request.
const MAX_QUERY_DAYS: i64 = 365;

const HOURLY: &str = "PT60M";

/// Label of the single load column, as the platform names it.
pub const LOAD_LABEL: &str = "Forecasted Load";

// ── XML documents ───────────────────────────────────────────────────

/// `Publication_MarketDocument` (prices) or `GL_MarketDocument` (load,
/// generation). Only the parts the pipeline reads are modelled.
#[derive(Debug, Deserialize)]
struct MarketDocument {
    #[serde(rename = "TimeSeries", default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(rename = "curveType")]
    curve_type: Option<String>,
    #[serde(rename = "MktPSRType")]
    psr: Option<MktPsrType>,
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct MktPsrType {
    #[serde(rename = "psrType")]
    psr_type: String,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "timeInterval")]
    time_interval: TimeInterval,
    resolution: String,
    #[serde(rename = "Point", default)]
    points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct TimeInterval {
    start: String,
    end: String,
}

impl TimeInterval {
    fn key(&self) -> (String, String) {
        (self.start.trim().to_string(), self.end.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Point {
    position: u32,
    #[serde(rename = "price.amount")]
    price: Option<f64>,
    quantity: Option<f64>,
}

/// Returned instead of a market document when a query cannot be served.
#[derive(Debug, Deserialize)]
struct AcknowledgementDocument {
    #[serde(rename = "Reason", default)]
    reasons: Vec<Reason>,
}

#[derive(Debug, Deserialize)]
struct Reason {
    code: String,
    text: Option<String>,
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Human-readable label for an ENTSO-E production type code.
pub fn psr_label(code: &str) -> &str {
    match code {
        "B16" => "Solar",
        "B18" => "Wind Offshore",
        "B19" => "Wind Onshore",
        other => other,
    }
}

/// Points keyed by PSR code (empty key for single-series documents).
type Collected = BTreeMap<String, Vec<(DateTime<Utc>, f64)>>;

/// Parse one XML document and append its points to `into`.
fn collect_document(signal: Signal, xml: &str, into: &mut Collected) -> Result<(), DataError> {
    if xml.contains("Acknowledgement_MarketDocument") {
        let ack: AcknowledgementDocument = quick_xml::de::from_str(xml)
            .map_err(|e| DataError::ResponseFormatChanged(format!("acknowledgement: {e}")))?;
        let reason = ack
            .reasons
            .into_iter()
            .map(|r| match r.text {
                Some(text) => format!("{} ({})", text.trim(), r.code),
                None => r.code,
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(DataError::NoData { signal, reason });
    }

    let doc: MarketDocument = quick_xml::de::from_str(xml)
        .map_err(|e| DataError::ResponseFormatChanged(format!("{signal} document: {e}")))?;

    // Some zones publish prices for the same interval in several resolutions;
    // there the hourly period wins. Intervals without an hourly period keep
    // whatever resolution they come in.
    let hourly_intervals: BTreeSet<(String, String)> = if signal == Signal::DayAheadPrice {
        doc.time_series
            .iter()
            .flat_map(|ts| &ts.periods)
            .filter(|p| p.resolution == HOURLY)
            .map(|p| p.time_interval.key())
            .collect()
    } else {
        BTreeSet::new()
    };

    for ts in doc.time_series {
        let key = match (signal, &ts.psr) {
            (Signal::WindSolarForecast, Some(psr)) => psr.psr_type.clone(),
            (Signal::WindSolarForecast, None) => {
                return Err(DataError::ResponseFormatChanged(
                    "generation series without a production type".into(),
                ))
            }
            _ => String::new(),
        };
        let fill_forward = ts.curve_type.as_deref() == Some("A03");
        let bucket = into.entry(key).or_default();
        for period in &ts.periods {
            if period.resolution != HOURLY
                && hourly_intervals.contains(&period.time_interval.key())
            {
                continue;
            }
            bucket.extend(period_points(period, fill_forward)?);
        }
    }
    Ok(())
}

/// Expand a period's points into timestamped values.
///
/// Position `p` sits at `start + (p - 1) * resolution`. With curve type A03
/// a missing position repeats the previous value until the period ends.
fn period_points(
    period: &Period,
    fill_forward: bool,
) -> Result<Vec<(DateTime<Utc>, f64)>, DataError> {
    let start = parse_instant(&period.time_interval.start)?;
    let end = parse_instant(&period.time_interval.end)?;
    let step = parse_resolution(&period.resolution)?;

    let mut points: Vec<(u32, f64)> = period
        .points
        .iter()
        .filter_map(|p| p.price.or(p.quantity).map(|v| (p.position, v)))
        .filter(|(pos, _)| *pos >= 1)
        .collect();
    points.sort_by_key(|(pos, _)| *pos);

    let at = |pos: u32| {
        i32::try_from(pos - 1)
            .ok()
            .and_then(|k| step.checked_mul(k))
            .and_then(|offset| start.checked_add_signed(offset))
            .ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("point position {pos} out of range"))
            })
    };

    if !fill_forward {
        return points
            .into_iter()
            .map(|(pos, v)| Ok((at(pos)?, v)))
            .collect();
    }

    let slots = ((end - start).num_seconds() / step.num_seconds()).max(0);
    let slots = u32::try_from(slots).map_err(|_| {
        DataError::ResponseFormatChanged(format!(
            "period {} to {} has too many slots",
            period.time_interval.start, period.time_interval.end
        ))
    })?;
    let mut out = Vec::with_capacity(slots as usize);
    let mut next = points.iter().peekable();
    let mut current = None;
    for pos in 1..=slots {
        while let Some((p, v)) = next.peek() {
            if *p > pos {
                break;
            }
            current = Some(*v);
            next.next();
        }
        if let Some(v) = current {
            out.push((at(pos)?, v));
        }
    }
    Ok(out)
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, DataError> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%MZ")
        .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%SZ"))
        .map(|dt| dt.and_utc())
        .map_err(|_| DataError::ResponseFormatChanged(format!("invalid instant: {s}")))
}

/// ISO-8601 durations used by the platform: `PT15M`, `PT60M`, `PT1H`, `P1D`.
/// Zero, negative and out-of-range durations are rejected.
fn parse_resolution(s: &str) -> Result<Duration, DataError> {
    let bad = || DataError::ResponseFormatChanged(format!("unsupported resolution: {s}"));
    let s = s.trim();
    let step = if let Some(rest) = s.strip_prefix("PT") {
        let unit = rest.chars().last().ok_or_else(bad)?;
        let n: i64 = rest[..rest.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| bad())?;
        match unit {
            'M' => Duration::try_minutes(n),
            'H' => Duration::try_hours(n),
            _ => None,
        }
    } else if let Some(days) = s.strip_prefix('P').and_then(|r| r.strip_suffix('D')) {
        days.parse().ok().and_then(Duration::try_days)
    } else {
        None
    };
    step.filter(|d| *d > Duration::zero()).ok_or_else(bad)
}

/// Build the signal's response shape from collected points.
///
/// Prices come back as an unlabeled series, load as a one-column table and
/// generation as a table with one column per production type.
fn into_response(signal: Signal, collected: Collected) -> ProviderResponse {
    match signal {
        Signal::DayAheadPrice => {
            let mut points: Vec<_> = collected.into_values().flatten().collect();
            points.sort_by_key(|(ts, _)| *ts);
            ProviderResponse::Series(RawSeries {
                label: None,
                index: points.iter().map(|(ts, _)| *ts).collect(),
                values: points.iter().map(|(_, v)| Some(*v)).collect(),
            })
        }
        Signal::LoadForecast => {
            let points: Vec<_> = collected.into_values().flatten().collect();
            ProviderResponse::Table(table_from(vec![(LOAD_LABEL.to_string(), points)]))
        }
        Signal::WindSolarForecast => ProviderResponse::Table(table_from(
            collected
                .into_iter()
                .map(|(code, points)| (psr_label(&code).to_string(), points))
                .collect(),
        )),
    }
}

fn table_from(columns: Vec<(String, Vec<(DateTime<Utc>, f64)>)>) -> RawTable {
    let index: Vec<DateTime<Utc>> = columns
        .iter()
        .flat_map(|(_, points)| points.iter().map(|(ts, _)| *ts))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns = columns
        .into_iter()
        .map(|(label, points)| {
            let mut by_ts: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
            for (ts, v) in points {
                by_ts.entry(ts).or_insert(v);
            }
            RawColumn {
                label,
                values: index.iter().map(|ts| by_ts.get(ts).copied()).collect(),
            }
        })
        .collect();

    RawTable { index, columns }
}

/// Parse a sequence of XML documents (one per query chunk) for a signal.
pub fn parse_documents<'a>(
    signal: Signal,
    documents: impl IntoIterator<Item = &'a str>,
) -> Result<ProviderResponse, DataError> {
    let mut collected = Collected::new();
    for xml in documents {
        collect_document(signal, xml, &mut collected)?;
    }
    Ok(into_response(signal, collected))
}

// ── HTTP client ─────────────────────────────────────────────────────

/// ENTSO-E Transparency Platform client.
pub struct EntsoeClient {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl EntsoeClient {
    pub fn new(
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gridlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (e.g. the iop test platform).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query parameters for one signal and chunk, without the token.
    fn query_params(
        signal: Signal,
        area: &Area,
        window: &FetchWindow,
    ) -> Vec<(&'static str, String)> {
        let mut params = match signal {
            Signal::DayAheadPrice => vec![
                ("documentType", "A44".to_string()),
                ("in_Domain", area.eic.to_string()),
                ("out_Domain", area.eic.to_string()),
            ],
            Signal::LoadForecast => vec![
                ("documentType", "A65".to_string()),
                ("processType", "A01".to_string()),
                ("outBiddingZone_Domain", area.eic.to_string()),
            ],
            Signal::WindSolarForecast => vec![
                ("documentType", "A69".to_string()),
                ("processType", "A01".to_string()),
                ("in_Domain", area.eic.to_string()),
            ],
        };
        params.push(("periodStart", window.start.format("%Y%m%d%H%M").to_string()));
        params.push(("periodEnd", window.end.format("%Y%m%d%H%M").to_string()));
        params
    }

    /// Execute one request and return the response body.
    fn get_document(
        &self,
        signal: Signal,
        params: &[(&'static str, String)],
    ) -> Result<String, DataError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("securityToken", self.api_key.as_str())])
            .query(params)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::AuthenticationRequired(
                "ENTSO-E rejected the security token".into(),
            ));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited);
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading {signal} body: {e}")))?;

        // Unserviceable queries carry an acknowledgement document, often with 400.
        if !status.is_success() && !body.contains("Acknowledgement_MarketDocument") {
            return Err(DataError::Other(format!("HTTP {status} for {signal}")));
        }
        Ok(body)
    }
}

impl MarketDataProvider for EntsoeClient {
    fn name(&self) -> &str {
        "entsoe_transparency"
    }

    fn fetch(
        &self,
        signal: Signal,
        region: &str,
        window: &FetchWindow,
    ) -> Result<ProviderResponse, DataError> {
        let area = Area::lookup(region)?;
        let chunks = window.chunks(Duration::days(MAX_QUERY_DAYS));

        let mut documents = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            debug!(
                %signal,
                zone = area.code,
                chunk = i + 1,
                of = chunks.len(),
                "requesting document"
            );
            let params = Self::query_params(signal, area, chunk);
            documents.push(self.get_document(signal, &params)?);
        }

        parse_documents(signal, documents.iter().map(String::as_str))
    }
}
