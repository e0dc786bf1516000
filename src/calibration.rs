//! Calibration: quality-gated segment selection and the baseline artifact.
//!
//! The calibration recording arrives as a `[C, T]` signal matrix plus a
//! `[C, P]` per-packet quality matrix (1 packet = 1 second). Packets are
//! kept when at least one channel scores ≥ [`PACKET_KEEP`] after remapping;
//! the whole recording is accepted when every channel's mean quality passes
//! [`GATE_ALL`] or at least one channel passes [`GATE_ANY`]. A 4-second
//! window then slides over the concatenated good packets at a 1-second hop,
//! producing the raw and smoothed SNR series that every later session tick
//! normalises against.
use log::{debug, warn};
use ndarray::{s, Array2};

use crate::config::EngineConfig;
use crate::session::smooth_tail;
use crate::snr::{channel_snr, combine_channels, ChannelSnr};
use crate::value::CalibrationError;

/// Minimum remapped quality for a packet to be kept (any channel).
pub const PACKET_KEEP: f64 = 0.5;
/// Mean-quality gate that every channel must pass...
pub const GATE_ALL: f64 = 0.5;
/// ...unless at least one channel passes this stricter one.
pub const GATE_ANY: f64 = 0.75;

/// Calibration output: the reference SNR distribution and frequency history
/// consumed by every session tick. Created once per calibration run and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationBaseline {
    /// Combined SNR per calibration window, in window order.
    pub raw_snr: Vec<f64>,
    /// Trailing-window smoothed SNR per calibration window.
    pub smoothed_snr: Vec<f64>,
    /// Alpha-peak frequencies accepted during calibration; seeds the
    /// session frequency history.
    pub freq_history: Vec<f64>,
    /// Outcome code; the series above are only meaningful for `Ok`.
    pub error: CalibrationError,
}

impl CalibrationBaseline {
    fn failed(error: CalibrationError) -> Self {
        // BAD_QUALITY keeps the legacy sentinel series: a single +inf in
        // each, so a caller that ignores the code still sees divergence.
        let series = match error {
            CalibrationError::BadQuality => vec![f64::INFINITY],
            _ => vec![],
        };
        CalibrationBaseline {
            raw_snr: series.clone(),
            smoothed_snr: series,
            freq_history: vec![],
            error,
        }
    }
}

/// Remap the quality checker's special raw values before use:
/// 0.25 → 0.5 and −1 → 0.
pub fn remap_quality(q: f64) -> f64 {
    if (q - 0.25).abs() < 1e-9 {
        0.5
    } else if (q + 1.0).abs() < 1e-9 {
        0.0
    } else {
        q
    }
}

/// Run the calibration engine over one recording.
///
/// Never panics and never returns `Err`: malformed input and quality-gate
/// rejection are reported through [`CalibrationBaseline::error`].
pub fn calibrate(
    signal: &Array2<f64>,
    quality: &Array2<f64>,
    cfg: &EngineConfig,
) -> CalibrationBaseline {
    let n_ch = signal.nrows();
    let packet_len = cfg.packet_samples();
    if n_ch == 0 || signal.ncols() == 0 || quality.ncols() == 0 || quality.nrows() != n_ch {
        warn!(
            "calibration rejected: malformed input ({}x{} signal, {}x{} quality)",
            signal.nrows(),
            signal.ncols(),
            quality.nrows(),
            quality.ncols()
        );
        return CalibrationBaseline::failed(CalibrationError::BadInput);
    }

    // Packet gating: remap each quality entry, track per-channel running
    // means, keep packets where any channel clears the bar.
    let n_packets = quality.ncols().min(signal.ncols() / packet_len);
    if n_packets == 0 {
        return CalibrationBaseline::failed(CalibrationError::BadInput);
    }

    let mut mean_quality = vec![0.0_f64; n_ch];
    let mut kept: Vec<usize> = Vec::with_capacity(n_packets);
    for p in 0..n_packets {
        let mut keep = false;
        for ch in 0..n_ch {
            let q = remap_quality(quality[[ch, p]]);
            mean_quality[ch] += q;
            if q >= PACKET_KEEP {
                keep = true;
            }
        }
        if keep {
            kept.push(p);
        }
    }
    for m in mean_quality.iter_mut() {
        *m /= n_packets as f64;
    }

    // Calibration gate: every channel decent, or one channel very good.
    let all_pass = mean_quality.iter().all(|&m| m >= GATE_ALL);
    let any_good = mean_quality.iter().any(|&m| m >= GATE_ANY);
    if !(all_pass || any_good) {
        warn!("calibration rejected: mean quality {mean_quality:?}");
        return CalibrationBaseline::failed(CalibrationError::BadQuality);
    }
    debug!(
        "calibration gate passed: mean quality {:?}, {}/{} packets kept",
        mean_quality,
        kept.len(),
        n_packets
    );

    // Concatenate the good packets into a contiguous recording.
    let mut good = Array2::<f64>::zeros((n_ch, kept.len() * packet_len));
    for (i, &p) in kept.iter().enumerate() {
        good.slice_mut(s![.., i * packet_len..(i + 1) * packet_len])
            .assign(&signal.slice(s![.., p * packet_len..(p + 1) * packet_len]));
    }

    // Windowed SNR over the good recording.
    let win = cfg.window_samples();
    let hop = cfg.hop_samples();
    let mut raw_snr = Vec::new();
    let mut smoothed_snr = Vec::new();
    let mut freq_history: Vec<f64> = Vec::new();

    let mut start = 0usize;
    while start + win <= good.ncols() {
        let combined = window_snr(&good, start, win, cfg, &mut freq_history);
        raw_snr.push(combined);
        smoothed_snr.push(smooth_tail(&raw_snr, cfg.smoothing_ticks()).as_f64());
        start += hop;
    }
    debug!("calibration produced {} windows", raw_snr.len());

    CalibrationBaseline {
        raw_snr,
        smoothed_snr,
        freq_history,
        error: CalibrationError::Ok,
    }
}

/// Combined SNR of one analysis window across the (up to two) channels.
pub(crate) fn window_snr(
    data: &Array2<f64>,
    start: usize,
    win: usize,
    cfg: &EngineConfig,
    freq_history: &mut Vec<f64>,
) -> f64 {
    let row = |ch: usize| -> Vec<f64> {
        data.slice(s![ch, start..start + win]).to_vec()
    };
    let a = channel_snr(&row(0), cfg, freq_history);
    let b = if data.nrows() > 1 {
        channel_snr(&row(1), cfg, freq_history)
    } else {
        ChannelSnr { snr: f64::NAN, quality: f64::NAN }
    };
    combine_channels(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;

    fn synth_recording(cfg: &EngineConfig, secs: usize) -> Array2<f64> {
        let n = secs * cfg.packet_samples();
        let mut state = 0x9e37_79b9_7f4a_7c15_u64;
        let mut noise = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 52) as f64 - 1.0
        };
        Array2::from_shape_fn((2, n), |(ch, t)| {
            let f = if ch == 0 { 10.0 } else { 10.5 };
            4.0 * (2.0 * PI * f * t as f64 / cfg.sfreq).sin() + noise()
        })
    }

    #[test]
    fn remap_special_values() {
        approx::assert_abs_diff_eq!(remap_quality(0.25), 0.5, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(remap_quality(-1.0), 0.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(remap_quality(0.8), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn empty_input_is_bad_input() {
        let cfg = EngineConfig::default();
        let out = calibrate(&Array2::zeros((0, 0)), &Array2::zeros((0, 0)), &cfg);
        assert_eq!(out.error, CalibrationError::BadInput);
        assert!(out.raw_snr.is_empty());
    }

    #[test]
    fn gate_accepts_exactly_half_quality() {
        let cfg = EngineConfig::default();
        let secs = 12;
        let signal = synth_recording(&cfg, secs);
        let quality = Array2::from_elem((2, secs), 0.5);
        let out = calibrate(&signal, &quality, &cfg);
        assert_eq!(out.error, CalibrationError::Ok);
        assert!(!out.raw_snr.is_empty());
    }

    #[test]
    fn gate_rejects_low_quality_with_inf_series() {
        let cfg = EngineConfig::default();
        let secs = 12;
        let signal = synth_recording(&cfg, secs);
        let quality = Array2::from_elem((2, secs), 0.4);
        let out = calibrate(&signal, &quality, &cfg);
        assert_eq!(out.error, CalibrationError::BadQuality);
        assert!(out.raw_snr.iter().all(|v| v.is_infinite()));
        assert!(out.smoothed_snr.iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn one_excellent_channel_rescues_calibration() {
        let cfg = EngineConfig::default();
        let secs = 12;
        let signal = synth_recording(&cfg, secs);
        let mut quality = Array2::from_elem((2, secs), 0.1);
        for p in 0..secs {
            quality[[0, p]] = 0.8; // mean 0.8 ≥ GATE_ANY
        }
        let out = calibrate(&signal, &quality, &cfg);
        assert_eq!(out.error, CalibrationError::Ok);
    }

    #[test]
    fn bad_packets_are_dropped_from_windows() {
        let cfg = EngineConfig::default();
        let secs = 16;
        let signal = synth_recording(&cfg, secs);
        let mut quality = Array2::from_elem((2, secs), 0.9);
        // Four packets bad on both channels: dropped, recording shrinks.
        for p in 4..8 {
            quality[[0, p]] = -1.0;
            quality[[1, p]] = 0.1;
        }
        let out = calibrate(&signal, &quality, &cfg);
        assert_eq!(out.error, CalibrationError::Ok);
        // 12 good seconds → (12 − 4) / 1 + 1 = 9 windows.
        assert_eq!(out.raw_snr.len(), 9);
        assert_eq!(out.smoothed_snr.len(), out.raw_snr.len());
    }

    #[test]
    fn windowed_snr_counts_and_floor() {
        let cfg = EngineConfig::default();
        let secs = 20;
        let signal = synth_recording(&cfg, secs);
        let quality = Array2::from_elem((2, secs), 1.0);
        let out = calibrate(&signal, &quality, &cfg);
        assert_eq!(out.error, CalibrationError::Ok);
        assert_eq!(out.raw_snr.len(), 17); // (20 − 4)/1 + 1
        for &v in &out.raw_snr {
            assert!(v.is_nan() || v == f64::INFINITY || v >= 1.0, "snr = {v}");
        }
        // Alpha tones on both channels: calibration should accumulate
        // frequency history near 10 Hz.
        assert!(!out.freq_history.is_empty());
        for &f in &out.freq_history {
            assert!((f - 10.0).abs() < 2.0, "history entry {f}");
        }
    }

    #[test]
    fn calibration_is_deterministic() {
        let cfg = EngineConfig::default();
        let secs = 10;
        let signal = synth_recording(&cfg, secs);
        let quality = Array2::from_elem((2, secs), 0.9);
        let first = calibrate(&signal, &quality, &cfg);
        let second = calibrate(&signal, &quality, &cfg);
        assert_eq!(first, second);
    }
}
