mod common;

use common::*;
use nfb::{calibrate, load_baseline, save_baseline, CalibrationError, EngineConfig};

fn cfg() -> EngineConfig {
    EngineConfig { sfreq: SFREQ, ..EngineConfig::default() }
}

#[test]
fn full_calibration_on_alpha_recording() {
    let cfg = cfg();
    let signal = alpha_recording(30, 4.0);
    let quality = uniform_quality(30, 0.9);

    let baseline = calibrate(&signal, &quality, &cfg);
    assert_eq!(baseline.error, CalibrationError::Ok);
    // 30 good seconds, 4 s window, 1 s hop → 27 windows.
    assert_eq!(baseline.raw_snr.len(), 27);
    assert_eq!(baseline.smoothed_snr.len(), 27);

    // SNR invariant: never finite and below 1.
    for &v in baseline.raw_snr.iter().chain(baseline.smoothed_snr.iter()) {
        assert!(v.is_nan() || v == f64::INFINITY || v >= 1.0, "snr = {v}");
    }

    // A strong 10 Hz tone on both channels: clear SNR and a frequency
    // history concentrated near 10 Hz.
    let above_floor = baseline.raw_snr.iter().filter(|&&v| v > 1.5).count();
    assert!(above_floor > 20, "only {above_floor} windows above floor");
    assert!(!baseline.freq_history.is_empty());
    for &f in &baseline.freq_history {
        assert!((f - 10.0).abs() < 1.5, "history entry {f} Hz");
    }
}

#[test]
fn calibration_is_bit_identical_across_runs() {
    let cfg = cfg();
    let signal = alpha_recording(20, 3.0);
    let quality = uniform_quality(20, 0.8);

    let a = calibrate(&signal, &quality, &cfg);
    let b = calibrate(&signal, &quality, &cfg);
    assert_eq!(a, b);
}

#[test]
fn quality_gate_boundary() {
    let cfg = cfg();
    let signal = alpha_recording(12, 3.0);

    let accepted = calibrate(&signal, &uniform_quality(12, 0.5), &cfg);
    assert_eq!(accepted.error, CalibrationError::Ok);

    let rejected = calibrate(&signal, &uniform_quality(12, 0.4), &cfg);
    assert_eq!(rejected.error, CalibrationError::BadQuality);
    assert_eq!(rejected.raw_snr, vec![f64::INFINITY]);
    assert_eq!(rejected.smoothed_snr, vec![f64::INFINITY]);
}

#[test]
fn noise_only_recording_stays_near_floor() {
    let cfg = cfg();
    let signal = noise_recording(20);
    let quality = uniform_quality(20, 0.9);

    let baseline = calibrate(&signal, &quality, &cfg);
    assert_eq!(baseline.error, CalibrationError::Ok);
    for &v in &baseline.raw_snr {
        assert!(v.is_nan() || v >= 1.0);
    }
    // Without alpha activity the typical window should hug the floor.
    let finite: Vec<f64> = baseline.raw_snr.iter().copied().filter(|v| v.is_finite()).collect();
    assert!(!finite.is_empty());
    let median = {
        let mut s = finite.clone();
        s.sort_by(|a, b| a.partial_cmp(b).unwrap());
        s[s.len() / 2]
    };
    assert!(median < 5.0, "noise-only median SNR = {median}");
}

#[test]
fn baseline_artifact_round_trip() {
    let cfg = cfg();
    let signal = alpha_recording(12, 3.0);
    let quality = uniform_quality(12, 0.9);
    let baseline = calibrate(&signal, &quality, &cfg);

    let path = std::env::temp_dir().join("nfb_test_baseline_roundtrip.safetensors");
    save_baseline(&baseline, &path).unwrap();
    let back = load_baseline(&path).unwrap();
    assert_eq!(back, baseline);
    std::fs::remove_file(&path).ok();
}
