//! Affine functions of a single probability and their crossings.

/// `f(p) = slope * p + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub slope: f64,
    pub intercept: f64,
}

impl Affine {
    pub const ZERO: Affine = Affine {
        slope: 0.0,
        intercept: 0.0,
    };

    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    #[inline]
    pub fn eval(&self, p: f64) -> f64 {
        self.slope * p + self.intercept
    }
}

/// Point where two affine functions are equal.
///
/// Returns `None` when the lines are parallel (including identical) or the
/// crossing is not finite.
pub fn linear_crossing(a: Affine, b: Affine) -> Option<f64> {
    let slope_diff = a.slope - b.slope;
    if slope_diff == 0.0 {
        return None;
    }
    let p = (b.intercept - a.intercept) / slope_diff;
    if p.is_finite() {
        Some(p)
    } else {
        None
    }
}
