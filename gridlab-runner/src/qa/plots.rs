//! PNG line plots of the persisted table.
//!
//! The x axis is seconds since the epoch, labelled as dates. Missing values
//! split a line into separate segments instead of being bridged. Text is
//! drawn with an embedded DejaVu Sans.

use chrono::DateTime;
use gridlab_core::data::TIMESTAMP_FORMAT;
use plotters::prelude::*;
use plotters::style::register_font;
use polars::prelude::*;
use std::path::Path;
use std::sync::OnceLock;

pub const PRICE_PLOT_FILE: &str = "qa_price_history.png";
pub const RENEWABLES_PLOT_FILE: &str = "qa_renewables.png";

const SIZE: (u32, u32) = (1200, 500);

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("column error: {0}")]
    Column(#[from] PolarsError),

    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("embedded font could not be loaded")]
    Font,
}

/// One named line over the shared time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Line {
    pub fn from_column(df: &DataFrame, name: &str) -> Result<Self, PlotError> {
        let floats = df.column(name)?.cast(&DataType::Float64)?;
        Ok(Self {
            name: name.to_string(),
            values: floats.f64()?.into_iter().collect(),
        })
    }
}

/// Parse the textual timestamp column into epoch seconds. Unparseable cells
/// become `None` and break every line at that row.
pub fn time_axis(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>, PlotError> {
    let text = df.column(column)?.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|cell| {
            cell.and_then(|s| DateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok())
                .map(|ts| ts.timestamp())
        })
        .collect())
}

/// Split a line into runs of consecutive present points.
pub fn segments(x: &[Option<i64>], y: &[Option<f64>]) -> Vec<Vec<(i64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (xi, yi) in x.iter().zip(y) {
        match (xi, yi) {
            (Some(x), Some(y)) => current.push((*x, *y)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Title and y-axis description of one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartText {
    pub title: &'static str,
    pub y_desc: &'static str,
}

pub const PRICE_CHART: ChartText = ChartText {
    title: "Price History",
    y_desc: "EUR/MWh",
};

pub const RENEWABLES_CHART: ChartText = ChartText {
    title: "Renewables Availability",
    y_desc: "MW",
};

const FONT_FAMILY: &str = "sans-serif";
static FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Register the embedded font once per process.
fn ensure_font() -> Result<(), PlotError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT).is_ok());
    if ok {
        Ok(())
    } else {
        Err(PlotError::Font)
    }
}

fn format_epoch(secs: &i64) -> String {
    DateTime::from_timestamp(*secs, 0)
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Render the given lines, with a title, axis labels and a legend, to a PNG
/// at `path`.
pub fn render(
    path: &Path,
    text: ChartText,
    x: &[Option<i64>],
    lines: &[Line],
) -> Result<(), PlotError> {
    ensure_font()?;
    let (x_range, y_range) = ranges(x, lines);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(text.title, (FONT_FAMILY, 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), y_range.clone())
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&format_epoch)
        .y_desc(text.y_desc)
        .draw()
        .map_err(draw_err)?;

    if y_range.start < 0.0 && y_range.end > 0.0 {
        chart
            .draw_series(LineSeries::new(
                [(x_range.start, 0.0), (x_range.end, 0.0)],
                BLACK.mix(0.3),
            ))
            .map_err(draw_err)?;
    }

    for (i, line) in lines.iter().enumerate() {
        let style = Palette99::pick(i).stroke_width(2);
        // Empty series carrying the legend entry, so an all-missing column
        // still shows up.
        chart
            .draw_series(LineSeries::new(std::iter::empty::<(i64, f64)>(), style))
            .map_err(draw_err)?
            .label(line.name.as_str())
            .legend(move |(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], style));
        for seg in segments(x, &line.values) {
            chart
                .draw_series(LineSeries::new(seg, style).point_size(1))
                .map_err(draw_err)?;
        }
    }

    if !lines.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    Ok(())
}

fn ranges(x: &[Option<i64>], lines: &[Line]) -> (std::ops::Range<i64>, std::ops::Range<f64>) {
    let xs: Vec<i64> = x.iter().flatten().copied().collect();
    let (x_lo, x_hi) = match (xs.iter().min(), xs.iter().max()) {
        (Some(lo), Some(hi)) if lo < hi => (*lo, *hi),
        (Some(lo), _) => (*lo, lo + 3600),
        _ => (0, 3600),
    };

    let ys = lines.iter().flat_map(|l| l.values.iter().flatten().copied());
    let (y_lo, y_hi) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (y_lo, y_hi) = if y_lo.is_finite() && y_hi > y_lo {
        let pad = (y_hi - y_lo) * 0.05;
        (y_lo - pad, y_hi + pad)
    } else if y_lo.is_finite() {
        (y_lo - 1.0, y_lo + 1.0)
    } else {
        (0.0, 1.0)
    };

    (x_lo..x_hi, y_lo..y_hi)
}

fn draw_err<E: std::fmt::Debug>(e: E) -> PlotError {
    PlotError::Draw(format!("{e:?}"))
}
