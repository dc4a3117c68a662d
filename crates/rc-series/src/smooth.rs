//! Centered moving average that leaves zero periods alone.

use rc_core::is_sample;

/// Weekly smoothing over daily-equivalent samples.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 7;

/// Smooth `series` with a centered window of `window` samples.
///
/// Any exact zero inside a sample's window keeps that sample unsmoothed, so
/// shut-in periods never blend into production. Missing and NaN samples do
/// not contribute; a window with no contributors keeps the original value.
pub fn moving_average(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window <= 1 {
        return series.to_vec();
    }

    let half = window / 2;
    let mut out = Vec::with_capacity(series.len());
    for (i, original) in series.iter().enumerate() {
        let lo = i.saturating_sub(half);
        let hi = (i + half).min(series.len().saturating_sub(1));

        let mut has_zero = false;
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in series[lo..=hi].iter().copied().filter(|v| is_sample(*v)).flatten() {
            if v == 0.0 {
                has_zero = true;
                break;
            }
            sum += v;
            count += 1;
        }

        out.push(if has_zero || count == 0 {
            *original
        } else {
            Some(sum / count as f64)
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_of_one_is_identity() {
        let series = vec![Some(1.0), None, Some(3.0)];
        assert_eq!(moving_average(&series, 1), series);
        assert_eq!(moving_average(&series, 0), series);
    }

    #[test]
    fn zero_in_window_keeps_original() {
        let series = vec![Some(5.0), Some(0.0), Some(5.0)];
        assert_eq!(moving_average(&series, 3), series);
    }

    #[test]
    fn averages_defined_neighbours() {
        let series = vec![Some(2.0), Some(4.0), None, Some(6.0)];
        let out = moving_average(&series, 3);
        assert_eq!(out[0], Some(3.0));
        assert_eq!(out[1], Some(3.0));
        // Gap takes the average of its neighbours.
        assert_eq!(out[2], Some(5.0));
        assert_eq!(out[3], Some(6.0));
    }

    #[test]
    fn empty_window_keeps_gap() {
        let series = vec![None, None, None, Some(1.0)];
        let out = moving_average(&series, 3);
        assert_eq!(out[0], None);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn nan_is_ignored() {
        let series = vec![Some(f64::NAN), Some(4.0), Some(2.0)];
        let out = moving_average(&series, 3);
        assert_eq!(out[0], Some(4.0));
        assert_eq!(out[1], Some(3.0));
    }

    #[test]
    fn empty_series() {
        assert!(moving_average(&[], 7).is_empty());
    }
}
