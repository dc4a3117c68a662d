//! Query seam: fetching rows, response normalization and row filters.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Row;
use crate::{SeriesError, SeriesResult};

/// Keys a query response may wrap its rows in.
const WRAPPER_KEYS: [&str; 3] = ["data", "results", "rows"];

/// The opaque query client.
pub trait QuerySource {
    fn query(&self, sql: &str) -> SeriesResult<Value>;
}

/// Serves a saved query response from disk, whatever the SQL.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuerySource for JsonFileSource {
    fn query(&self, _sql: &str) -> SeriesResult<Value> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Run `sql` and normalize whatever comes back into rows.
pub fn fetch_rows(source: &impl QuerySource, sql: &str) -> SeriesResult<Vec<Row>> {
    let response = source.query(sql)?;
    let rows = normalize_response(response);
    tracing::debug!(rows = rows.len(), "query returned");
    Ok(rows)
}

/// Accepts a bare array or one wrapped in `data`, `results` or `rows`.
/// Non-object entries are dropped.
pub fn normalize_response(response: Value) -> Vec<Row> {
    let items = match response {
        Value::Array(items) => items,
        Value::Object(mut map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        other => {
            tracing::warn!(kind = json_kind(&other), "unexpected query response shape");
            Vec::new()
        }
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text form of a key column: strings as-is, numbers and booleans printed.
pub(crate) fn row_key(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric form of a value column; numeric strings are accepted.
pub(crate) fn row_number(row: &Row, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Calendar date of a date column. Time-of-day is discarded.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()
                .map(|dt| dt.date())
        })
}

/// `key == value` selection; the value `all` selects everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub key: String,
    pub value: String,
}

impl RowFilter {
    pub const ALL: &'static str = "all";

    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.value == Self::ALL
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.is_all() || row_key(row, &self.key).is_some_and(|v| v == self.value)
    }
}

pub fn filter_rows(rows: &[Row], filters: &[RowFilter]) -> Vec<Row> {
    rows.iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateRange {
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "15y")]
    FifteenYears,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl DateRange {
    pub fn years(self) -> Option<u32> {
        match self {
            Self::OneYear => Some(1),
            Self::FiveYears => Some(5),
            Self::TenYears => Some(10),
            Self::FifteenYears => Some(15),
            Self::All => None,
        }
    }

    /// Predicate fragment appended to a `WHERE` clause; empty for `All`.
    pub fn sql_clause(self) -> String {
        match self.years() {
            Some(n) => format!(r#"AND "Date" >= CURRENT_DATE - INTERVAL '{n} years'"#),
            None => String::new(),
        }
    }

    /// Same cut-off as [`sql_clause`](Self::sql_clause), applied in memory.
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        let Some(years) = self.years() else {
            return true;
        };
        match today.checked_sub_months(Months::new(years * 12)) {
            Some(start) => date >= start,
            None => true,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.years() {
            Some(n) => write!(f, "{n}y"),
            None => f.write_str("all"),
        }
    }
}

impl FromStr for DateRange {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1y" => Ok(Self::OneYear),
            "5y" => Ok(Self::FiveYears),
            "10y" => Ok(Self::TenYears),
            "15y" => Ok(Self::FifteenYears),
            "all" => Ok(Self::All),
            _ => Err(SeriesError::UnknownDateRange(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        normalize_response(value)
    }

    #[test]
    fn normalizes_every_response_shape() {
        let row = json!({ "Layer": "L1" });
        assert_eq!(rows(json!([row.clone()])).len(), 1);
        assert_eq!(rows(json!({ "data": [row.clone()] })).len(), 1);
        assert_eq!(rows(json!({ "results": [row.clone(), row.clone()] })).len(), 2);
        assert_eq!(rows(json!({ "rows": [row.clone(), 3] })).len(), 1);
        assert!(rows(json!({ "other": [row] })).is_empty());
        assert!(rows(json!("nope")).is_empty());
    }

    #[test]
    fn parses_supported_date_forms() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date(&json!("2024-03-15")), Some(day));
        assert_eq!(parse_date(&json!("2024-03-15T00:00:00Z")), Some(day));
        assert_eq!(parse_date(&json!("2024-03-15T10:30:00+02:00")), Some(day));
        assert_eq!(parse_date(&json!("2024-03-15T10:30:00")), Some(day));
        assert_eq!(parse_date(&json!("2024-03-15 10:30:00.250")), Some(day));
        assert_eq!(parse_date(&json!("15/03/2024")), None);
        assert_eq!(parse_date(&json!(20240315)), None);
    }

    #[test]
    fn row_filters() {
        let data = rows(json!([
            { "Identifier": "W1", "Layer": "L1" },
            { "Identifier": "W2", "Layer": "L1" },
            { "Identifier": "W1", "Layer": "L2" }
        ]));
        let well = RowFilter::new("Identifier", "W1");
        let any_layer = RowFilter::new("Layer", RowFilter::ALL);
        assert_eq!(filter_rows(&data, &[well.clone(), any_layer]).len(), 2);
        assert_eq!(
            filter_rows(&data, &[well, RowFilter::new("Layer", "L2")]).len(),
            1
        );
        assert_eq!(filter_rows(&data, &[]).len(), 3);
    }

    #[test]
    fn date_range_clause_and_cutoff() {
        assert_eq!(
            DateRange::FiveYears.sql_clause(),
            r#"AND "Date" >= CURRENT_DATE - INTERVAL '5 years'"#
        );
        assert_eq!(DateRange::All.sql_clause(), "");

        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let old = NaiveDate::from_ymd_opt(2023, 6, 29).unwrap();
        let recent = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        assert!(!DateRange::OneYear.contains(old, today));
        assert!(DateRange::OneYear.contains(recent, today));
        assert!(DateRange::All.contains(old, today));
    }

    #[test]
    fn date_range_parses_and_prints() {
        for range in [
            DateRange::OneYear,
            DateRange::FiveYears,
            DateRange::TenYears,
            DateRange::FifteenYears,
            DateRange::All,
        ] {
            assert_eq!(range.to_string().parse::<DateRange>().unwrap(), range);
        }
        assert!("2y".parse::<DateRange>().is_err());
    }

    struct Fixed(Value);

    impl QuerySource for Fixed {
        fn query(&self, _sql: &str) -> SeriesResult<Value> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn fetch_normalizes() {
        let source = Fixed(json!({ "data": [{ "a": 1 }, { "a": 2 }] }));
        let rows = fetch_rows(&source, "SELECT 1").unwrap();
        assert_eq!(rows.len(), 2);
    }
}
