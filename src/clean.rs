//! Per-channel signal conditioning ahead of the spectral estimate.
//!
//! `clean` chains the three preprocessing steps every SNR window gets:
//!   1. DC removal (subtract the channel mean),
//!   2. outlier clipping (|x − μ| > 5σ → linearly interpolated),
//!   3. zero-phase bandpass FIR (Hamming windowed-sinc, FFT convolution).
//!
//! Missing samples (NaN markers for lost packets) are handled separately by
//! [`fill_missing`], which the SNR calculator runs first.
use anyhow::{bail, Result};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::psd::hamming;

/// Multiple of the channel standard deviation beyond which a sample is
/// treated as an artifact and interpolated away.
const OUTLIER_SIGMA: f64 = 5.0;

/// Linearly interpolate interior NaN runs and strip NaNs that have no
/// neighbour on one side (leading/trailing runs).
///
/// Returns the repaired signal; an all-NaN input yields an empty vector.
pub fn fill_missing(x: &[f64]) -> Vec<f64> {
    let first = match x.iter().position(|v| !v.is_nan()) {
        Some(k) => k,
        None => return vec![],
    };
    let last = x.iter().rposition(|v| !v.is_nan()).unwrap();

    let mut out = Vec::with_capacity(last + 1 - first);
    let mut k = first;
    while k <= last {
        if !x[k].is_nan() {
            out.push(x[k]);
            k += 1;
            continue;
        }
        // Interior NaN run: bounded by finite samples on both sides.
        let run_start = k;
        while x[k].is_nan() {
            k += 1;
        }
        let a = x[run_start - 1];
        let b = x[k];
        let run_len = k - run_start;
        for j in 0..run_len {
            let t = (j + 1) as f64 / (run_len + 1) as f64;
            out.push(a + t * (b - a));
        }
    }
    out
}

/// Subtract the mean in place.
pub fn remove_dc(x: &mut [f64]) {
    let m = crate::stats::mean(x);
    if m.is_finite() {
        for v in x.iter_mut() {
            *v -= m;
        }
    }
}

/// Replace samples further than [`OUTLIER_SIGMA`] standard deviations from
/// the mean with a linear interpolation between their finite neighbours.
pub fn clip_outliers(x: &[f64]) -> Vec<f64> {
    let (m, s) = crate::stats::mean_std(x);
    if !s.is_finite() || s == 0.0 {
        return x.to_vec();
    }
    let bound = OUTLIER_SIGMA * s;
    let marked: Vec<f64> = x
        .iter()
        .map(|&v| if (v - m).abs() > bound { f64::NAN } else { v })
        .collect();
    fill_missing(&marked)
}

/// Design a zero-phase bandpass FIR for `[lo_hz, hi_hz]` at `sfreq`.
///
/// Built as the difference of two Hamming-windowed lowpass kernels
/// (`lowpass(hi) − lowpass(lo)`); tap count follows the
/// `⌈3.3 / trans_bw · sfreq⌉`-rounded-to-odd rule with the transition
/// bandwidth taken from the lower edge.
pub fn design_bandpass(lo_hz: f64, hi_hz: f64, sfreq: f64) -> Vec<f64> {
    let trans_bw = (0.25 * lo_hz).max(2.0).min(lo_hz);
    let n_raw = (3.3 / trans_bw * sfreq).ceil() as usize;
    let n = if n_raw % 2 == 0 { n_raw + 1 } else { n_raw };

    let h_hi = firwin_lowpass(n, hi_hz, sfreq);
    let h_lo = firwin_lowpass(n, lo_hz, sfreq);
    h_hi.iter().zip(h_lo.iter()).map(|(a, b)| a - b).collect()
}

/// Hamming windowed-sinc lowpass with unit DC gain; `n` must be odd.
fn firwin_lowpass(n: usize, cutoff_hz: f64, sfreq: f64) -> Vec<f64> {
    debug_assert!(n % 2 == 1, "linear-phase FIR needs odd N");
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz / (sfreq / 2.0);
    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            let sinc = if x == 0.0 {
                fc
            } else {
                (std::f64::consts::PI * fc * x).sin() / (std::f64::consts::PI * x)
            };
            sinc * win[i]
        })
        .collect();

    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    h
}

/// Zero-phase FIR filtering of a single channel via one FFT block.
///
/// The signal is reflect-padded by `N−1` samples on each side to suppress
/// the edge transient, convolved in the frequency domain, shifted left by
/// `(N−1)/2` for zero phase, and cropped back to the input length.
pub fn filter_zero_phase(x: &[f64], h: &[f64]) -> Result<Vec<f64>> {
    let n_x = x.len();
    let n_h = h.len();
    if n_x == 0 {
        return Ok(vec![]);
    }
    if n_h % 2 == 0 {
        bail!("FIR kernel must have odd length, got {n_h}");
    }

    let n_edge = n_h - 1;
    let x_ext = reflect_limited_pad(x, n_edge, n_edge);
    let n_ext = x_ext.len();

    let n_fft = (n_ext + n_h - 1).next_power_of_two();
    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fwd = planner.plan_fft_forward(n_fft);
    let inv = planner.plan_fft_inverse(n_fft);

    let mut sig: Vec<Complex<f64>> = x_ext
        .iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n_fft)
        .collect();
    let mut ker: Vec<Complex<f64>> = h
        .iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n_fft)
        .collect();

    fwd.process(&mut sig);
    fwd.process(&mut ker);
    for (s, k) in sig.iter_mut().zip(ker.iter()) {
        *s *= *k;
    }
    inv.process(&mut sig);
    let scale = 1.0 / n_fft as f64;

    // Zero-phase shift + edge strip in one crop.
    let shift = (n_h - 1) / 2;
    let start = n_edge + shift;
    Ok(sig[start..start + n_x].iter().map(|c| c.re * scale).collect())
}

/// Full conditioning chain for one channel.
pub fn clean(x: &[f64], band: (f64, f64), sfreq: f64) -> Result<Vec<f64>> {
    let mut y = clip_outliers(x);
    remove_dc(&mut y);
    let h = design_bandpass(band.0, band.1, sfreq);
    filter_zero_phase(&y, &h)
}

/// Reflect-limited padding: odd reflection around the edge samples, zeros
/// when the requested pad exceeds the signal length.
fn reflect_limited_pad(x: &[f64], n_l: usize, n_r: usize) -> Vec<f64> {
    let n = x.len();
    let actual_l = n_l.min(n - 1);
    let actual_r = n_r.min(n - 1);

    let mut out = Vec::with_capacity(n_l + n + n_r);
    for _ in actual_l..n_l {
        out.push(0.0);
    }
    for i in (1..=actual_l).rev() {
        out.push(2.0 * x[0] - x[i]);
    }
    out.extend_from_slice(x);
    let last = x[n - 1];
    for i in 1..=actual_r {
        let idx = (n - 1).saturating_sub(i);
        out.push(2.0 * last - x[idx]);
    }
    for _ in actual_r..n_r {
        out.push(0.0);
    }
    out
}
