//! Welch one-sided power spectral density.
//!
//! The signal is cut into Hamming-tapered segments with fractional overlap,
//! each segment is zero-padded to the FFT length and transformed, and the
//! squared magnitudes are averaged. Scaling is `2 / (fs · Σw²)` so the
//! output has density units (the DC and Nyquist bins are not doubled).
//!
//! The SNR calculator consumes this as a black box mapping a time series to
//! a `(frequencies, power)` pair; absolute scale cancels in the SNR ratio.
use anyhow::{bail, Result};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// One-sided PSD estimate.
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Frequency grid in Hz, `0 ..= fs/2`.
    pub freqs: Vec<f64>,
    /// Power density per bin (linear scale).
    pub power: Vec<f64>,
}

impl Spectrum {
    /// Restrict the spectrum to `[lo_hz, hi_hz]` via nearest-bin lookup
    /// (inclusive boundaries).
    pub fn truncate(&self, lo_hz: f64, hi_hz: f64) -> Spectrum {
        let lo = crate::stats::nearest_bin(&self.freqs, lo_hz);
        let hi = crate::stats::nearest_bin(&self.freqs, hi_hz);
        Spectrum {
            freqs: self.freqs[lo..=hi].to_vec(),
            power: self.power[lo..=hi].to_vec(),
        }
    }
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Welch PSD of `x` sampled at `sfreq` Hz.
///
/// * `seg_len`  – samples per segment; a shorter signal is analysed as a
///   single full-length segment.
/// * `overlap`  – fractional overlap between segments in `[0, 1)`.
///
/// The FFT length is the next power of two ≥ the segment length.
pub fn welch(x: &[f64], sfreq: f64, seg_len: usize, overlap: f64) -> Result<Spectrum> {
    if x.len() < 2 {
        bail!("welch: need at least 2 samples, got {}", x.len());
    }
    if !(0.0..1.0).contains(&overlap) {
        bail!("welch: overlap must be in [0, 1), got {overlap}");
    }

    // A signal shorter than one segment is analysed as a single full-length
    // segment.
    let seg = seg_len.min(x.len()).max(2);
    let hop = ((seg as f64) * (1.0 - overlap)).max(1.0) as usize;
    let n_fft = seg.next_power_of_two();
    let n_bins = n_fft / 2 + 1;

    let win = hamming(seg);
    let win_power: f64 = win.iter().map(|w| w * w).sum();

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut acc = vec![0.0_f64; n_bins];
    let mut n_segments = 0usize;
    let mut start = 0usize;
    while start + seg <= x.len() {
        let mut buf: Vec<Complex<f64>> = x[start..start + seg]
            .iter()
            .zip(win.iter())
            .map(|(&v, &w)| Complex { re: v * w, im: 0.0 })
            .chain(std::iter::repeat(Complex::default()))
            .take(n_fft)
            .collect();
        fft.process(&mut buf);
        for (k, a) in acc.iter_mut().enumerate() {
            *a += buf[k].norm_sqr();
        }
        n_segments += 1;
        start += hop;
    }
    let scale = 2.0 / (sfreq * win_power * n_segments as f64);
    let power: Vec<f64> = acc
        .iter()
        .enumerate()
        .map(|(k, &a)| {
            let s = if k == 0 || k == n_bins - 1 { scale / 2.0 } else { scale };
            a * s
        })
        .collect();
    let freqs = (0..n_bins).map(|k| k as f64 * sfreq / n_fft as f64).collect();
    Ok(Spectrum { freqs, power })
}
