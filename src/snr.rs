//! Per-channel SNR computation and two-channel combination.
//!
//! `channel_snr` chains the whole per-channel path: repair missing samples,
//! condition the signal, estimate the spectrum, fit the noise floor, detect
//! the alpha peak, and form the peak-power-to-noise ratio. All failure modes
//! degrade to sentinel outputs, never to an error: an unusable channel is
//! `{NaN, NaN}` and a peakless channel is floored at SNR 1.
use log::debug;

use crate::clean::{clean, fill_missing};
use crate::config::EngineConfig;
use crate::noise::estimate_noise;
use crate::peak::detect_peak;
use crate::psd::welch;

/// Per-channel result: SNR (≥ 1, or NaN for an unusable channel) and the
/// peak quality factor (NaN for zero/multiple peaks — ambiguity, not
/// failure).
#[derive(Debug, Clone, Copy)]
pub struct ChannelSnr {
    pub snr: f64,
    pub quality: f64,
}

impl ChannelSnr {
    fn unusable() -> Self {
        ChannelSnr { snr: f64::NAN, quality: f64::NAN }
    }
}

/// Compute one channel's SNR over a single analysis window.
///
/// `history` is the running frequency history; a single accepted peak
/// appends to it (see [`crate::peak::detect_peak`]).
pub fn channel_snr(signal: &[f64], cfg: &EngineConfig, history: &mut Vec<f64>) -> ChannelSnr {
    // A channel that is entirely missing markers carries no information.
    let repaired = fill_missing(signal);
    if repaired.len() < 2 {
        return ChannelSnr::unusable();
    }

    let cleaned = match clean(&repaired, cfg.analysis_band, cfg.sfreq) {
        Ok(c) => c,
        Err(e) => {
            debug!("channel conditioning failed: {e}");
            return ChannelSnr::unusable();
        }
    };

    let spectrum = match welch(&cleaned, cfg.sfreq, cfg.psd_segment_samples(), cfg.psd_overlap) {
        Ok(s) => s,
        Err(e) => {
            debug!("spectral estimate failed: {e}");
            return ChannelSnr::unusable();
        }
    };
    let band = spectrum.truncate(cfg.analysis_band.0, cfg.analysis_band.1);

    let noise = estimate_noise(&band.freqs, &band.power);
    let log_power: Vec<f64> = band.power.iter().map(|&p| 10.0 * p.log10()).collect();
    let outcome = detect_peak(&band.freqs, &log_power, &noise, cfg.alpha_band, history);

    // No peak: SNR floors at 1. With a peak: raw peak power over the linear
    // noise estimate at that bin, still floored at 1; a zero denominator
    // leaves the floor untouched instead of dividing.
    let mut snr = 1.0;
    if let Some(bin) = outcome.bin {
        let denom = 10f64.powf(noise[bin] / 10.0);
        if denom != 0.0 {
            snr = band.power[bin] / denom;
        }
    }
    if snr < 1.0 {
        snr = 1.0;
    }

    ChannelSnr { snr, quality: outcome.quality }
}

/// Combine the two channels' window results into one scalar SNR.
///
/// Both quality factors finite: quality-weighted average of the SNRs.
/// Otherwise fall back on how many channels rose above the SNR floor:
/// neither → 1, exactly one → that channel, both → unweighted average.
pub fn combine_channels(a: ChannelSnr, b: ChannelSnr) -> f64 {
    if !a.quality.is_nan() && !b.quality.is_nan() {
        let wsum = a.quality + b.quality;
        if wsum > 0.0 {
            return (a.snr * a.quality + b.snr * b.quality) / wsum;
        }
        return 0.5 * (a.snr + b.snr);
    }

    // NaN SNR compares false on both sides, so an unusable channel lands in
    // the "no usable peak" arm.
    let a_up = a.snr > 1.0;
    let b_up = b.snr > 1.0;
    match (a_up, b_up) {
        (false, false) => 1.0,
        (true, false) => a.snr,
        (false, true) => b.snr,
        (true, true) => 0.5 * (a.snr + b.snr),
    }
}
