//! Numerically stable summary statistics over probability samples.

/// Default absolute tolerance used by [`approx_eq`] callers in this workspace.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Compensated (Neumaier) summation.
///
/// Keeps a running correction term so that long reference samples of small
/// probabilities do not lose precision. Returns NaN if any input is NaN and
/// follows IEEE-754 for infinities.
pub fn neumaier_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for &v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    let total = sum + compensation;
    // Infinite inputs make the compensation NaN; the plain sum is the answer.
    if total.is_nan() && !sum.is_nan() {
        return sum;
    }
    total
}

/// Arithmetic mean using compensated summation.
///
/// Returns `None` for an empty slice.
pub fn stable_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(neumaier_sum(values) / values.len() as f64)
}

/// Absolute-or-relative approximate equality.
///
/// NaN never compares equal; infinities compare equal only to themselves.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

/// True when `p` lies in the closed unit interval.
pub fn is_unit_interval(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}
