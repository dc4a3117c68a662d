//! Hover lookup over the stacked chart's point index.

use chrono::NaiveDate;
use serde::Serialize;

use crate::stack::ChartPoint;

/// Pixel offset between the pointer and the tooltip box.
const POINTER_OFFSET: f64 = 10.0;

/// Closest point of `category` along x. Ties keep the earlier point.
pub fn nearest<'a>(category: &str, pointer_x: f64, points: &'a [ChartPoint]) -> Option<&'a ChartPoint> {
    let mut best: Option<&ChartPoint> = None;
    for point in points.iter().filter(|p| p.category == category) {
        let closer = best.is_none_or(|b| (point.x - pointer_x).abs() < (b.x - pointer_x).abs());
        if closer {
            best = Some(point);
        }
    }
    best
}

/// Map a client-space pointer position onto the chart's viewport x.
pub fn pointer_to_chart_x(client_x: f64, rect_left: f64, rect_width: f64, viewport_width: f64) -> f64 {
    if rect_width <= 0.0 {
        return 0.0;
    }
    (client_x - rect_left) / rect_width * viewport_width
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub category: String,
    pub date: NaiveDate,
    pub value_text: String,
    pub total_text: String,
    /// Anchor in container pixels.
    pub left: f64,
    pub top: f64,
    /// Box extends to the left of the anchor.
    pub flip_left: bool,
}

impl Tooltip {
    /// `pointer` is relative to the chart container, which is
    /// `container_width` pixels wide.
    pub fn from_point(point: &ChartPoint, pointer: (f64, f64), container_width: f64) -> Self {
        let (x, y) = pointer;
        Self {
            category: point.category.clone(),
            date: point.date,
            value_text: format!("{:.2}", point.value),
            total_text: format!("{:.2}", point.cumulative),
            left: x + POINTER_OFFSET,
            top: y - POINTER_OFFSET,
            flip_left: x > container_width / 2.0,
        }
    }
}
