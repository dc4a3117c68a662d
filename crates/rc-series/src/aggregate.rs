//! Grouping raw rows into per-category date series.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rc_core::UnitConverter;
use serde::{Deserialize, Serialize};

use crate::query::{parse_date, row_key, row_number};
use crate::types::{CategorySeries, Row, TimeSeriesPoint};

/// Upper bound on points per category handed to the chart.
pub const DEFAULT_MAX_POINTS: usize = 500;

/// Sum `value_key` per category and date.
pub fn aggregate(
    rows: &[Row],
    category_key: &str,
    date_key: &str,
    value_key: &str,
    converter: Option<&UnitConverter>,
) -> CategorySeries {
    aggregate_with(
        rows,
        category_key,
        date_key,
        |row| row_number(row, value_key),
        converter,
    )
}

/// General form of [`aggregate`]: the value of each row comes from
/// `extractor`, and a missing value contributes zero.
///
/// Rows without a category or with an unparsable date are skipped. The
/// converter is applied to every value before it is summed.
pub fn aggregate_with<F>(
    rows: &[Row],
    category_key: &str,
    date_key: &str,
    extractor: F,
    converter: Option<&UnitConverter>,
) -> CategorySeries
where
    F: Fn(&Row) -> Option<f64>,
{
    let mut grouped: HashMap<String, BTreeMap<NaiveDate, f64>> = HashMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let Some((category, date)) = row_coordinates(row, category_key, date_key) else {
            skipped += 1;
            continue;
        };
        let mut value = extractor(row).unwrap_or(0.0);
        if let Some(converter) = converter.filter(|c| !c.is_identity()) {
            value = converter.apply(value);
        }
        *grouped.entry(category).or_default().entry(date).or_insert(0.0) += value;
    }

    if skipped > 0 {
        tracing::warn!(skipped, category_key, date_key, "rows without category or date");
    }
    tracing::debug!(rows = rows.len(), categories = grouped.len(), "aggregated rows");

    grouped
        .into_iter()
        .map(|(category, dates)| {
            let points = dates
                .into_iter()
                .map(|(date, value)| TimeSeriesPoint::new(date, value))
                .collect();
            (category, points)
        })
        .collect()
}

/// One point per row, no summing; points sorted by date.
pub fn group_series<F>(
    rows: &[Row],
    category_key: &str,
    date_key: &str,
    extractor: F,
    converter: Option<&UnitConverter>,
) -> CategorySeries
where
    F: Fn(&Row) -> Option<f64>,
{
    let mut series = CategorySeries::new();
    for row in rows {
        let Some((category, date)) = row_coordinates(row, category_key, date_key) else {
            continue;
        };
        let Some(mut value) = extractor(row) else {
            continue;
        };
        if let Some(converter) = converter.filter(|c| !c.is_identity()) {
            value = converter.apply(value);
        }
        series
            .entry(category)
            .or_default()
            .push(TimeSeriesPoint::new(date, value));
    }
    for points in series.values_mut() {
        points.sort_by_key(|p| p.date);
    }
    series
}

fn row_coordinates(row: &Row, category_key: &str, date_key: &str) -> Option<(String, NaiveDate)> {
    let category = row_key(row, category_key)?;
    let date = row.get(date_key).and_then(parse_date)?;
    Some((category, date))
}

/// Oil saturation from the water and gas saturation columns.
pub fn oil_saturation(row: &Row) -> Option<f64> {
    let sw = row_number(row, "sw")?;
    let sg = row_number(row, "sg")?;
    Some(1.0 - sw - sg)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioKind {
    Wor,
    Gor,
}

impl RatioKind {
    pub fn numerator_key(self) -> &'static str {
        match self {
            Self::Wor => "Water",
            Self::Gor => "Gas",
        }
    }

    pub fn denominator_key(self) -> &'static str {
        "Oil"
    }
}

impl fmt::Display for RatioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wor => f.write_str("wor"),
            Self::Gor => f.write_str("gor"),
        }
    }
}

impl FromStr for RatioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wor" => Ok(Self::Wor),
            "gor" => Ok(Self::Gor),
            other => Err(format!("unknown ratio '{other}', expected wor or gor")),
        }
    }
}

/// Per category and date, `sum(numerator) / sum(denominator)`; zero when
/// the denominator sum is not positive.
pub fn ratio_series(
    rows: &[Row],
    category_key: &str,
    date_key: &str,
    numerator_key: &str,
    denominator_key: &str,
) -> CategorySeries {
    let numerators = aggregate(rows, category_key, date_key, numerator_key, None);
    let denominators = aggregate(rows, category_key, date_key, denominator_key, None);

    numerators
        .into_iter()
        .map(|(category, points)| {
            let below: HashMap<NaiveDate, f64> = denominators
                .get(&category)
                .map(|pts| pts.iter().map(|p| (p.date, p.value)).collect())
                .unwrap_or_default();
            let ratios = points
                .into_iter()
                .map(|p| {
                    let denominator = below.get(&p.date).copied().unwrap_or(0.0);
                    let ratio = if denominator > 0.0 {
                        p.value / denominator
                    } else {
                        0.0
                    };
                    TimeSeriesPoint::new(p.date, ratio)
                })
                .collect();
            (category, ratios)
        })
        .collect()
}

pub fn sorted_categories(series: &CategorySeries) -> Vec<String> {
    let mut names: Vec<String> = series.keys().cloned().collect();
    names.sort();
    names
}

/// Thin every series by the same stride once the first category exceeds
/// `max_points`.
pub fn downsample(series: &CategorySeries, categories: &[String], max_points: usize) -> CategorySeries {
    let first_len = categories
        .first()
        .and_then(|c| series.get(c))
        .map_or(0, Vec::len);
    if max_points == 0 || first_len <= max_points {
        return series.clone();
    }

    let step = first_len.div_ceil(max_points);
    tracing::debug!(first_len, step, "downsampling series");
    series
        .iter()
        .map(|(category, points)| {
            let kept = points.iter().step_by(step).copied().collect();
            (category.clone(), kept)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub category: String,
    pub value: f64,
    pub percentage: f64,
}

/// Each category's value on `date` and its share of that date's total,
/// largest first.
pub fn date_breakdown(
    series: &CategorySeries,
    categories: &[String],
    date: NaiveDate,
) -> Vec<BreakdownRow> {
    let values: Vec<(String, f64)> = categories
        .iter()
        .filter_map(|c| {
            let point = series.get(c)?.iter().find(|p| p.date == date)?;
            Some((c.clone(), point.value))
        })
        .collect();
    let total: f64 = values.iter().map(|(_, v)| v).sum();

    let mut rows: Vec<BreakdownRow> = values
        .into_iter()
        .map(|(category, value)| BreakdownRow {
            category,
            value,
            percentage: if total != 0.0 { value / total * 100.0 } else { 0.0 },
        })
        .collect();
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    rows
}
