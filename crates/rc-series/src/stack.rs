//! Stacked-area layout: date axis, cumulative layers, axis scaling and the
//! hover point index.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::smooth::{DEFAULT_SMOOTHING_WINDOW, moving_average};
use crate::theme::ThemePreference;
use crate::types::CategorySeries;

/// Headroom above the nice axis max so the top layer never touches the frame.
const DRAWING_HEADROOM: f64 = 1.05;
const MAX_X_TICKS: usize = 8;
const LEGEND_MAX_CATEGORIES: usize = 10;
const Y_LABEL_FRACTIONS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Drawing coordinate space; y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartViewport {
    pub width: f64,
    pub height: f64,
}

impl Default for ChartViewport {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackOptions {
    pub smoothing_window: usize,
    pub explicit_max: Option<f64>,
    pub viewport: ChartViewport,
    pub theme: ThemePreference,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            explicit_max: None,
            viewport: ChartViewport::default(),
            theme: ThemePreference::default(),
        }
    }
}

/// Closed outline of one layer: the top edge forward in time, then the
/// bottom edge backwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AreaPath {
    pub top: Vec<(f64, f64)>,
    pub bottom: Vec<(f64, f64)>,
}

impl AreaPath {
    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// SVG path data, or an empty string for a layer with no samples.
    pub fn to_svg(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut d = String::new();
        for (i, (x, y)) in self.top.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{cmd} {x} {y} ");
        }
        for (x, y) in &self.bottom {
            let _ = write!(d, "L {x} {y} ");
        }
        d.push('Z');
        d
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackLayer {
    pub category: String,
    pub color: String,
    pub path: AreaPath,
}

/// A (category, date) sample as drawn, used for hover lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
    pub date: NaiveDate,
    pub category: String,
    pub category_index: usize,
    pub value: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub date: NaiveDate,
    /// Fraction of the time axis, `0.0..=1.0`.
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub category: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedChart {
    pub dates: Vec<NaiveDate>,
    pub layers: Vec<StackLayer>,
    /// Value shown at the top of the y axis.
    pub axis_max: f64,
    /// Value mapped to the top of the viewport.
    pub drawing_max: f64,
    pub points: Vec<ChartPoint>,
    /// Top to bottom.
    pub y_labels: Vec<String>,
    pub x_ticks: Vec<AxisTick>,
    pub legend: Vec<LegendEntry>,
    pub grid_color: String,
    pub text_color: String,
    pub viewport: ChartViewport,
}

/// Round `raw` up to 1, 2, 5 or 10 times its power of ten. Non-positive or
/// non-finite input gives 1.
pub fn nice_max(raw: f64) -> f64 {
    if raw <= 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    if magnitude <= 0.0 || !magnitude.is_finite() {
        return raw;
    }
    // Compare against the product so float noise in `raw / magnitude` can
    // never pick a leading digit that ends up below `raw`.
    [1.0, 2.0, 5.0, 10.0, 20.0]
        .into_iter()
        .map(|leading| leading * magnitude)
        .find(|nice| *nice >= raw)
        .filter(|nice| nice.is_finite())
        .unwrap_or(raw)
}

/// Lay out `categories` of `data` as stacked areas, first category at the
/// bottom.
pub fn build_stack(data: &CategorySeries, categories: &[String], options: &StackOptions) -> StackedChart {
    let viewport = options.viewport;
    let explicit_max = options.explicit_max.filter(|m| {
        let usable = m.is_finite() && *m > 0.0;
        if !usable {
            tracing::warn!(max = m, "ignoring non-positive axis max");
        }
        usable
    });

    let dates: Vec<NaiveDate> = data
        .values()
        .flat_map(|points| points.iter().map(|p| p.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Dense per-category columns on the shared date axis.
    let columns: Vec<Vec<Option<f64>>> = categories
        .iter()
        .map(|category| {
            let by_date: HashMap<NaiveDate, f64> = data
                .get(category)
                .map(|pts| pts.iter().map(|p| (p.date, p.value)).collect())
                .unwrap_or_default();
            let dense: Vec<Option<f64>> = dates.iter().map(|d| by_date.get(d).copied()).collect();
            moving_average(&dense, options.smoothing_window)
        })
        .collect();

    if columns.iter().all(|column| column.iter().all(Option::is_none)) {
        return empty_chart(explicit_max, options);
    }

    // cumulative[date][layer]; a missing sample carries the running total.
    let cumulative: Vec<Vec<f64>> = (0..dates.len())
        .map(|di| {
            let mut running = 0.0;
            columns
                .iter()
                .map(|column| {
                    if let Some(v) = column[di] {
                        running += v;
                    }
                    running
                })
                .collect()
        })
        .collect();

    let (axis_max, drawing_max) = match explicit_max {
        Some(max) => (max, max),
        None => {
            // Seeded with 1 so fractional data keeps a unit axis.
            let raw = cumulative
                .iter()
                .filter_map(|row| row.last().copied())
                .fold(1.0, f64::max);
            let nice = nice_max(raw);
            (nice, nice * DRAWING_HEADROOM)
        }
    };

    let first = dates[0];
    let span = (dates[dates.len() - 1] - first).num_days().max(1) as f64;
    let xs: Vec<f64> = dates
        .iter()
        .map(|d| (*d - first).num_days() as f64 / span * viewport.width)
        .collect();
    let to_y = |v: f64| (viewport.height - v / drawing_max * viewport.height).clamp(0.0, viewport.height);

    let mut points = Vec::new();
    let layers: Vec<StackLayer> = categories
        .iter()
        .enumerate()
        .map(|(ci, category)| {
            let mut path = AreaPath::default();
            let mut started = false;
            for (di, date) in dates.iter().enumerate() {
                let top = cumulative[di][ci];
                let bottom = if ci > 0 { cumulative[di][ci - 1] } else { 0.0 };
                let top_y = to_y(top);

                if let Some(value) = columns[ci][di] {
                    started = true;
                    points.push(ChartPoint {
                        x: xs[di],
                        y: top_y,
                        date: *date,
                        category: category.clone(),
                        category_index: ci,
                        value,
                        cumulative: top,
                    });
                }
                if started {
                    path.top.push((xs[di], top_y));
                    path.bottom.push((xs[di], to_y(bottom)));
                }
            }
            path.bottom.reverse();
            StackLayer {
                category: category.clone(),
                color: options.theme.palette.color(ci).to_string(),
                path,
            }
        })
        .collect();

    let legend = if categories.len() <= LEGEND_MAX_CATEGORIES {
        layers
            .iter()
            .map(|l| LegendEntry {
                category: l.category.clone(),
                color: l.color.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    tracing::debug!(
        dates = dates.len(),
        layers = layers.len(),
        points = points.len(),
        axis_max,
        "stacked chart built"
    );

    StackedChart {
        x_ticks: x_ticks(&dates),
        dates,
        layers,
        axis_max,
        drawing_max,
        points,
        y_labels: y_labels(axis_max),
        legend,
        grid_color: options.theme.grid_color().to_string(),
        text_color: options.theme.text_color().to_string(),
        viewport,
    }
}

fn empty_chart(explicit_max: Option<f64>, options: &StackOptions) -> StackedChart {
    let axis_max = explicit_max.unwrap_or(1.0);
    StackedChart {
        dates: Vec::new(),
        layers: Vec::new(),
        axis_max,
        drawing_max: explicit_max.unwrap_or(DRAWING_HEADROOM),
        points: Vec::new(),
        y_labels: y_labels(axis_max),
        x_ticks: Vec::new(),
        legend: Vec::new(),
        grid_color: options.theme.grid_color().to_string(),
        text_color: options.theme.text_color().to_string(),
        viewport: options.viewport,
    }
}

fn y_labels(axis_max: f64) -> Vec<String> {
    Y_LABEL_FRACTIONS
        .iter()
        .map(|fraction| format_axis_value(axis_max * (1.0 - fraction)))
        .collect()
}

fn format_axis_value(value: f64) -> String {
    if value >= 1000.0 {
        format!("{:.1}k", (value / 100.0).round() / 10.0)
    } else {
        format!("{:.0}", value.round())
    }
}

/// Up to eight evenly spaced targets, each snapped to the nearest date not
/// already used.
fn x_ticks(dates: &[NaiveDate]) -> Vec<AxisTick> {
    let Some(&first) = dates.first() else {
        return Vec::new();
    };
    let offsets: Vec<f64> = dates.iter().map(|d| (*d - first).num_days() as f64).collect();
    let span = offsets.last().copied().unwrap_or(0.0).max(1.0);
    let count = dates.len().min(MAX_X_TICKS);
    let divisions = count.saturating_sub(1).max(1) as f64;

    let mut used = vec![false; dates.len()];
    let mut ticks = Vec::with_capacity(count);
    for i in 0..count {
        let target = span * i as f64 / divisions;
        let mut best: Option<(usize, f64)> = None;
        for (j, offset) in offsets.iter().enumerate() {
            let dist = (offset - target).abs();
            if !used[j] && best.is_none_or(|(_, d)| dist < d) {
                best = Some((j, dist));
            }
        }
        let Some((j, _)) = best else {
            break;
        };
        used[j] = true;
        ticks.push(AxisTick {
            date: dates[j],
            position: offsets[j] / span,
        });
    }
    ticks
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::types::TimeSeriesPoint;
    use proptest::prelude::*;
    use rc_core::{Tolerances, nearly_equal};

    proptest! {
        #[test]
        fn nice_max_bounds(x in 1e-6f64..1e12) {
            let nice = nice_max(x);
            prop_assert!(nice >= x);
            prop_assert!(nice <= x * 10.0 + f64::EPSILON);

            let leading = nice / 10f64.powi(nice.log10().floor() as i32);
            let tol = Tolerances { abs: 1e-9, rel: 1e-9 };
            prop_assert!(
                [1.0, 2.0, 5.0, 10.0].iter().any(|d| nearly_equal(leading, *d, tol)),
                "leading digit {} of {}", leading, nice
            );
        }

        #[test]
        fn stacking_is_monotone_per_date(
            layers in prop::collection::vec(
                prop::collection::vec(prop::option::of(0.0f64..1000.0), 12),
                1..5,
            ),
        ) {
            let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            let categories: Vec<String> = (0..layers.len()).map(|i| format!("C{i}")).collect();
            let mut data = CategorySeries::new();
            for (name, samples) in categories.iter().zip(&layers) {
                let points = samples
                    .iter()
                    .enumerate()
                    .filter_map(|(d, v)| {
                        v.map(|v| TimeSeriesPoint::new(start + chrono::Days::new(d as u64), v))
                    })
                    .collect();
                data.insert(name.clone(), points);
            }
            let chart = build_stack(&data, &categories, &StackOptions::default());

            for date in &chart.dates {
                let mut last = 0.0;
                for point in chart.points.iter().filter(|p| p.date == *date) {
                    prop_assert!(point.cumulative >= last);
                    last = point.cumulative;
                }
                prop_assert!(last <= chart.axis_max);
            }
        }
    }
}
