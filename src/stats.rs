//! Small descriptive-statistics helpers used throughout the pipeline.
//!
//! Everything here is a pure function over `&[f64]`; callers are responsible
//! for filtering sentinels (NaN / +inf) before asking for moments.
use std::cmp::Ordering;

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

/// Mean and population standard deviation (ddof = 0).
pub fn mean_std(x: &[f64]) -> (f64, f64) {
    let m = mean(x);
    if x.is_empty() {
        return (m, f64::NAN);
    }
    let var = x.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / x.len() as f64;
    (m, var.sqrt())
}

/// Trapezoidal integral of `y` over the (possibly non-uniform) grid `x`.
///
/// `x` and `y` must have equal length; fewer than two points integrate to 0.
pub fn trapz(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 2 {
        return 0.0;
    }
    let mut acc = 0.0;
    for k in 1..x.len() {
        acc += 0.5 * (y[k] + y[k - 1]) * (x[k] - x[k - 1]);
    }
    acc
}

/// Linear-interpolated order-statistic quantile, `p` in [0, 1].
///
/// Matches the "linear" method: `h = (n-1)·p`, interpolate between the
/// floor and ceil order statistics. Returns NaN for an empty slice.
pub fn quantile(x: &[f64], p: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let mut sorted: Vec<f64> = x.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Index of the grid point in `x` closest to `v` (ties resolve to the lower
/// index). `x` must be non-empty.
pub fn nearest_bin(x: &[f64], v: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (k, &xv) in x.iter().enumerate() {
        let d = (xv - v).abs();
        if d < best_d {
            best_d = d;
            best = k;
        }
    }
    best
}
