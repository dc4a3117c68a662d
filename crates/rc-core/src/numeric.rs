use crate::CoreError;

/// Floating point type for rates, volumes and chart coordinates.
pub type Real = f64;

/// Absolute + relative tolerance pair for float comparisons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Tolerance for values that went through a unit round trip.
    pub fn round_trip() -> Self {
        Self {
            abs: 1e-9,
            rel: 1e-9,
        }
    }
}

/// `a` and `b` agree within `tol.abs`, or within `tol.rel` of the larger
/// magnitude.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(value: Real, what: &'static str) -> Result<Real, CoreError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::NonFinite { what, value })
    }
}

/// Sample value that counts as present: defined and not NaN.
#[inline]
pub fn is_sample(v: Option<Real>) -> bool {
    v.is_some_and(|x| !x.is_nan())
}
