//! rc-series: production time series for the case dashboard.
//!
//! Rows come in from the query client, get filtered and aggregated into
//! per-category series, then stacked into chart geometry with a point
//! index for hover lookups.

pub mod aggregate;
pub mod query;
pub mod smooth;
pub mod stack;
pub mod theme;
pub mod tooltip;
pub mod types;

pub use aggregate::{
    BreakdownRow, DEFAULT_MAX_POINTS, RatioKind, aggregate, aggregate_with, date_breakdown,
    downsample, group_series, oil_saturation, ratio_series, sorted_categories,
};
pub use query::{
    DateRange, JsonFileSource, QuerySource, RowFilter, fetch_rows, filter_rows,
    normalize_response, parse_date,
};
pub use smooth::{DEFAULT_SMOOTHING_WINDOW, moving_average};
pub use stack::{
    AreaPath, AxisTick, ChartPoint, ChartViewport, LegendEntry, StackLayer, StackOptions,
    StackedChart, build_stack, nice_max,
};
pub use theme::{ChartPalette, ThemePreference, hex_to_rgba};
pub use tooltip::{Tooltip, nearest, pointer_to_chart_x};
pub use types::*;

pub type SeriesResult<T> = Result<T, SeriesError>;

#[derive(thiserror::Error, Debug)]
pub enum SeriesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unknown date range: {0}")]
    UnknownDateRange(String),

    #[error("Unknown palette: {0}")]
    UnknownPalette(String),

    #[error("Invalid colour: {0}")]
    InvalidColor(String),
}
