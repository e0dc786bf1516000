//! Per-second session processing: smoothing, volume mapping, reset.
//!
//! One [`SessionEngine::tick`] call consumes one new second of data and
//! returns the `[0, 1]` feedback volume. All session history lives in an
//! explicit [`SessionState`] owned by the engine instance — nothing is
//! process-global, so two sessions never leak state into each other and a
//! reset is a plain clear.
use log::debug;
use ndarray::Array2;

use crate::calibration::{window_snr, CalibrationBaseline};
use crate::config::EngineConfig;
use crate::stats::quantile;
use crate::value::IndexValue;

/// Mutable per-session history. Created at session start (frequency history
/// seeded from the calibration baseline), appended to once per second,
/// discarded or reset at session end.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Raw combined SNR per second.
    pub past_indices: Vec<f64>,
    /// Trailing-window smoothed SNR per second.
    pub smoothed_indices: Vec<f64>,
    /// Volume returned per second.
    pub volume_history: Vec<f64>,
    /// Continued alpha-peak frequency history.
    pub freq_history: Vec<f64>,
}

/// Trailing-window smoothing with sentinel-aware exclusion.
///
/// Averages the last `min(window, len)` entries, skipping +inf and NaN.
/// A window consisting entirely of +inf stays +inf (diverged); a window of
/// NaNs, or a NaN/+inf mix with no finite entry, is indeterminate.
pub fn smooth_tail(series: &[f64], window: usize) -> IndexValue {
    if series.is_empty() {
        return IndexValue::Indeterminate;
    }
    let w = window.min(series.len()).max(1);
    let tail = &series[series.len() - w..];

    let finite: Vec<f64> = tail.iter().copied().filter(|v| v.is_finite()).collect();
    if !finite.is_empty() {
        return IndexValue::Value(crate::stats::mean(&finite));
    }
    let n_inf = tail.iter().filter(|v| v.is_infinite()).count();
    if n_inf == w {
        IndexValue::Diverged
    } else {
        IndexValue::Indeterminate
    }
}

/// Map a smoothed index onto the `[0, 1]` volume using the calibration
/// smoothed-SNR series as the reference distribution.
///
/// The upper quantile `q_high` of the reference anchors a piecewise curve:
/// zero rescale at the SNR floor, a linear ramp to 0.5 at the center point,
/// then a logistic saturating toward 1. Volume is `1 − rescale`, so it sits
/// at 1 at/below baseline and falls monotonically as relaxation deepens.
/// Diverged and indeterminate inputs both map to volume 1.
pub fn map_volume(s: IndexValue, reference: &[f64], quantile_p: f64) -> f64 {
    let s = match s {
        IndexValue::Value(v) => v,
        // Upstream failure or no usable signal this tick: maximal volume.
        IndexValue::Indeterminate | IndexValue::Diverged => return 1.0,
    };

    let finite_ref: Vec<f64> = reference.iter().copied().filter(|v| v.is_finite()).collect();
    if finite_ref.is_empty() {
        return 1.0;
    }
    let q_high = quantile(&finite_ref, quantile_p);
    let range = q_high - 1.0;
    let spread = q_high + 1.5 * range - 1.0;
    if spread <= 0.0 {
        // No relaxation headroom in the baseline: hard step at the floor.
        return if s > 1.0 { 0.0 } else { 1.0 };
    }
    let center = 1.0 + spread / 2.0;
    let slope = 1.0 / (spread / 4.0);

    let rescale = if s <= 1.0 {
        0.0
    } else if s <= center {
        0.5 * (s - 1.0) / (center - 1.0)
    } else {
        logistic(slope * (s - center))
    };
    1.0 - rescale
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// The per-second session state machine.
///
/// Single-threaded and synchronous: each tick is one blocking CPU-bound
/// call, cadence is enforced by the caller.
pub struct SessionEngine {
    cfg: EngineConfig,
    baseline: CalibrationBaseline,
    state: SessionState,
}

impl SessionEngine {
    /// Start a session against an immutable calibration baseline. The
    /// frequency history is seeded from the baseline's.
    pub fn new(cfg: EngineConfig, baseline: CalibrationBaseline) -> Self {
        let state = SessionState {
            freq_history: baseline.freq_history.clone(),
            ..SessionState::default()
        };
        SessionEngine { cfg, baseline, state }
    }

    /// Process one new second of data.
    ///
    /// `segment` is `[C, T]` holding the most recent samples; the trailing
    /// analysis window (4 s by default) is used, or the whole segment when
    /// shorter. Returns this tick's volume in `[0, 1]` and appends to every
    /// history series.
    pub fn tick(&mut self, segment: &Array2<f64>) -> f64 {
        let combined = if segment.nrows() == 0 || segment.ncols() < 2 {
            f64::NAN
        } else {
            let win = self.cfg.window_samples().min(segment.ncols());
            let start = segment.ncols() - win;
            window_snr(segment, start, win, &self.cfg, &mut self.state.freq_history)
        };
        self.state.past_indices.push(combined);

        let smoothed = smooth_tail(&self.state.past_indices, self.cfg.smoothing_ticks());
        self.state.smoothed_indices.push(smoothed.as_f64());

        let volume = map_volume(smoothed, &self.baseline.smoothed_snr, self.cfg.volume_quantile);
        self.state.volume_history.push(volume);
        debug!(
            "tick {}: snr={combined:.3} smoothed={:.3} volume={volume:.3}",
            self.state.past_indices.len(),
            smoothed.as_f64()
        );
        volume
    }

    /// Clear all session history (including the frequency history). The
    /// calibration baseline is untouched.
    pub fn reset(&mut self) {
        self.state.past_indices.clear();
        self.state.smoothed_indices.clear();
        self.state.volume_history.clear();
        self.state.freq_history.clear();
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn baseline(&self) -> &CalibrationBaseline {
        &self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::calibrate;
    use crate::value::CalibrationError;
    use ndarray::Array2;
    use std::f64::consts::PI;

    const INF: f64 = f64::INFINITY;

    #[test]
    fn smoothing_excludes_inf() {
        let v = smooth_tail(&[1.0, INF, 2.0], 3);
        assert_eq!(v, IndexValue::Value(1.5));
    }

    #[test]
    fn smoothing_all_inf_diverges() {
        assert_eq!(smooth_tail(&[INF, INF], 2), IndexValue::Diverged);
    }

    #[test]
    fn smoothing_all_nan_indeterminate() {
        assert_eq!(smooth_tail(&[f64::NAN, f64::NAN], 2), IndexValue::Indeterminate);
    }

    #[test]
    fn smoothing_nan_inf_mix_indeterminate() {
        assert_eq!(smooth_tail(&[f64::NAN, INF], 2), IndexValue::Indeterminate);
    }

    #[test]
    fn smoothing_uses_trailing_window_only() {
        let v = smooth_tail(&[100.0, 2.0, 4.0], 2);
        assert_eq!(v, IndexValue::Value(3.0));
    }

    #[test]
    fn volume_is_one_at_floor_for_any_reference() {
        for reference in [vec![1.0, 2.0, 3.0], vec![5.0; 4], vec![1.0]] {
            let v = map_volume(IndexValue::Value(1.0), &reference, 0.95);
            approx::assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn volume_sentinels_map_to_one() {
        let reference = vec![1.0, 2.0, 3.0];
        assert_eq!(map_volume(IndexValue::Indeterminate, &reference, 0.95), 1.0);
        assert_eq!(map_volume(IndexValue::Diverged, &reference, 0.95), 1.0);
    }

    #[test]
    fn volume_monotone_decreasing_in_s() {
        let reference = vec![1.0, 1.5, 2.0, 2.5, 3.0];
        let mut prev = 1.0;
        for k in 0..100 {
            let s = 1.0 + k as f64 * 0.1;
            let v = map_volume(IndexValue::Value(s), &reference, 0.95);
            assert!(v <= prev + 1e-12, "volume rose at s={s}");
            assert!((0.0..=1.0).contains(&v));
            prev = v;
        }
        // Far beyond baseline the logistic saturates.
        assert!(prev < 0.05, "volume only fell to {prev}");
    }

    #[test]
    fn volume_half_at_center() {
        let reference = vec![1.0, 2.0, 3.0];
        let q_high = quantile(&reference, 0.95);
        let spread = q_high + 1.5 * (q_high - 1.0) - 1.0;
        let center = 1.0 + spread / 2.0;
        let v = map_volume(IndexValue::Value(center), &reference, 0.95);
        approx::assert_abs_diff_eq!(v, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_baseline_steps_at_floor() {
        let reference = vec![1.0, 1.0, 1.0];
        assert_eq!(map_volume(IndexValue::Value(0.5), &reference, 0.95), 1.0);
        assert_eq!(map_volume(IndexValue::Value(2.0), &reference, 0.95), 0.0);
    }

    fn synth(cfg: &EngineConfig, secs: usize, amp: f64) -> Array2<f64> {
        let n = secs * cfg.packet_samples();
        let mut state = 0xdead_beef_cafe_f00d_u64;
        let mut noise = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 52) as f64 - 1.0
        };
        Array2::from_shape_fn((2, n), |(ch, t)| {
            let f = if ch == 0 { 10.0 } else { 10.25 };
            amp * (2.0 * PI * f * t as f64 / cfg.sfreq).sin() + noise()
        })
    }

    #[test]
    fn session_ticks_produce_bounded_volumes() {
        let cfg = EngineConfig::default();
        let signal = synth(&cfg, 16, 3.0);
        let quality = Array2::from_elem((2, 16), 0.9);
        let baseline = calibrate(&signal, &quality, &cfg);
        assert_eq!(baseline.error, CalibrationError::Ok);

        let mut engine = SessionEngine::new(cfg.clone(), baseline);
        let live = synth(&cfg, 8, 3.0);
        let win = cfg.window_samples();
        for sec in 4..8 {
            let end = sec * cfg.packet_samples();
            let seg = live.slice(ndarray::s![.., end - win..end]).to_owned();
            let v = engine.tick(&seg);
            assert!((0.0..=1.0).contains(&v), "volume {v}");
        }
        let st = engine.state();
        assert_eq!(st.past_indices.len(), 4);
        assert_eq!(st.smoothed_indices.len(), 4);
        assert_eq!(st.volume_history.len(), 4);
    }

    #[test]
    fn empty_segment_is_indeterminate_tick() {
        let cfg = EngineConfig::default();
        let baseline = CalibrationBaseline {
            raw_snr: vec![1.5, 2.0],
            smoothed_snr: vec![1.5, 1.75],
            freq_history: vec![10.0],
            error: CalibrationError::Ok,
        };
        let mut engine = SessionEngine::new(cfg, baseline);
        let v = engine.tick(&Array2::zeros((0, 0)));
        assert_eq!(v, 1.0);
        assert!(engine.state().past_indices[0].is_nan());
    }

    #[test]
    fn reset_clears_history_keeps_baseline() {
        let cfg = EngineConfig::default();
        let baseline = CalibrationBaseline {
            raw_snr: vec![1.5],
            smoothed_snr: vec![1.5],
            freq_history: vec![10.0, 10.5],
            error: CalibrationError::Ok,
        };
        let mut engine = SessionEngine::new(cfg, baseline);
        assert_eq!(engine.state().freq_history.len(), 2);
        engine.tick(&Array2::zeros((0, 0)));
        engine.reset();
        let st = engine.state();
        assert!(st.past_indices.is_empty());
        assert!(st.smoothed_indices.is_empty());
        assert!(st.volume_history.is_empty());
        assert!(st.freq_history.is_empty());
        assert_eq!(engine.baseline().freq_history.len(), 2);
    }
}
