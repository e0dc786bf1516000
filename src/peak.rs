//! Alpha-peak detection and disambiguation.
//!
//! Candidates are downward zero-crossings of the first derivative of the
//! positive excess power above the noise floor. Ambiguous spectra (two or
//! more candidates) are disambiguated against the running history of
//! previously accepted peak frequencies: once the history is long enough
//! ([`HISTORY_GATE`]) candidates outside the subject's usual frequency range
//! are dropped, then the strongest-vs-second-strongest amplitude test
//! ([`AMP_RATIO`]) decides between a single winner and a genuine multi-peak
//! spectrum resolved by center of gravity.
//!
//! Only a single accepted peak extends the frequency history; no-peak and
//! multi-peak outcomes leave it untouched.
use crate::config::{AMP_RATIO, EDGE_MARGIN_HZ, HISTORY_GATE};
use crate::stats::{mean_std, nearest_bin, trapz};

/// Result of one detection pass over a band-limited spectrum.
#[derive(Debug, Clone, Copy)]
pub struct PeakOutcome {
    /// Index of the detected peak in the band-limited spectrum, if any.
    pub bin: Option<usize>,
    /// Peak area (trapezoidal integral of excess power over the peak
    /// window) when exactly one peak was accepted; NaN when zero or
    /// multiple peaks were found. NaN here signals ambiguity, not failure.
    pub quality: f64,
}

impl PeakOutcome {
    fn none() -> Self {
        PeakOutcome { bin: None, quality: f64::NAN }
    }
}

/// Detect and disambiguate the alpha peak.
///
/// * `freqs`      – band-limited frequency grid (Hz).
/// * `log_power`  – observed power in log scale (`10·log10`), per bin.
/// * `noise`      – estimated noise curve in the same log scale.
/// * `alpha_band` – target sub-band `[IAFinf, IAFsup]` in Hz.
/// * `history`    – running sequence of previously accepted peak
///   frequencies; extended in place on single-peak acceptance.
pub fn detect_peak(
    freqs: &[f64],
    log_power: &[f64],
    noise: &[f64],
    alpha_band: (f64, f64),
    history: &mut Vec<f64>,
) -> PeakOutcome {
    debug_assert_eq!(freqs.len(), log_power.len());
    debug_assert_eq!(freqs.len(), noise.len());
    if freqs.len() < 3 {
        return PeakOutcome::none();
    }

    // Only positive deviations above the noise floor count as peak mass.
    let diff: Vec<f64> = log_power
        .iter()
        .zip(noise.iter())
        .map(|(&p, &n)| (p - n).max(0.0))
        .collect();

    let candidates = in_band_candidates(freqs, &diff, alpha_band);

    match candidates.len() {
        0 => PeakOutcome::none(),
        1 => accept_single(freqs, &diff, alpha_band, candidates[0], history),
        _ => disambiguate(freqs, log_power, &diff, alpha_band, &candidates, history),
    }
}

/// Downward zero-crossings of the derivative of `diff`, restricted to the
/// alpha band (inclusive boundaries via nearest-bin lookup).
fn in_band_candidates(freqs: &[f64], diff: &[f64], alpha_band: (f64, f64)) -> Vec<usize> {
    let deriv: Vec<f64> = diff.windows(2).map(|w| w[1] - w[0]).collect();

    let lo = nearest_bin(freqs, alpha_band.0);
    let hi = nearest_bin(freqs, alpha_band.1);

    let mut out = Vec::new();
    for j in 0..deriv.len().saturating_sub(1) {
        if deriv[j] >= 0.0 && deriv[j + 1] < 0.0 {
            // The crossing straddles bins j+1 and j+2; keep the taller one.
            let bin = if diff[j + 1] >= diff[j + 2] { j + 1 } else { j + 2 };
            if bin >= lo && bin <= hi && diff[bin] > 0.0 && out.last() != Some(&bin) {
                out.push(bin);
            }
        }
    }
    out
}

fn disambiguate(
    freqs: &[f64],
    log_power: &[f64],
    diff: &[f64],
    alpha_band: (f64, f64),
    candidates: &[usize],
    history: &mut Vec<f64>,
) -> PeakOutcome {
    // Usual-range filter: only with enough history behind it.
    let survivors: Vec<usize> = if history.len() >= HISTORY_GATE {
        let (mu, sigma) = mean_std(history);
        let lo = (mu - sigma).floor();
        let hi = (mu + sigma).ceil();
        let kept: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&k| freqs[k] >= lo && freqs[k] <= hi)
            .collect();
        match kept.len() {
            1 => {
                return accept_single(freqs, diff, alpha_band, kept[0], history);
            }
            // Empty filter result falls back to the unfiltered candidates.
            0 => candidates.to_vec(),
            _ => kept,
        }
    } else {
        candidates.to_vec()
    };

    // Strongest vs second-strongest amplitude test.
    let mut ranked = survivors.clone();
    ranked.sort_by(|&a, &b| diff[b].partial_cmp(&diff[a]).unwrap_or(std::cmp::Ordering::Equal));
    let strongest = ranked[0];
    if diff[strongest] * AMP_RATIO > diff[ranked[1]] {
        return accept_single(freqs, diff, alpha_band, strongest, history);
    }

    multi_peak(freqs, log_power, diff, alpha_band, &survivors)
}

/// Exactly one peak: refine its window, integrate the excess power for the
/// quality factor, and extend the frequency history.
fn accept_single(
    freqs: &[f64],
    diff: &[f64],
    alpha_band: (f64, f64),
    bin: usize,
    history: &mut Vec<f64>,
) -> PeakOutcome {
    let (min1, min2) = peak_window(freqs, diff, alpha_band, bin, bin);
    let quality = trapz(&freqs[min1..=min2], &diff[min1..=min2]);
    history.push(freqs[bin]);
    PeakOutcome { bin: Some(bin), quality }
}

/// Two or more peaks survive: collapse them to the amplitude-weighted
/// center of frequency over the combined peak window, snapped to the
/// nearest actual bin. Quality stays undefined.
fn multi_peak(
    freqs: &[f64],
    log_power: &[f64],
    diff: &[f64],
    alpha_band: (f64, f64),
    survivors: &[usize],
) -> PeakOutcome {
    let leftmost = *survivors.iter().min().unwrap();
    let rightmost = *survivors.iter().max().unwrap();
    let (min1, min2) = peak_window(freqs, diff, alpha_band, leftmost, rightmost);

    let mut wsum = 0.0;
    let mut fwsum = 0.0;
    for k in min1..=min2 {
        wsum += log_power[k];
        fwsum += freqs[k] * log_power[k];
    }
    let cog = if wsum != 0.0 {
        fwsum / wsum
    } else {
        0.5 * (freqs[min1] + freqs[min2])
    };
    let bin = nearest_bin(freqs, cog);
    PeakOutcome { bin: Some(bin), quality: f64::NAN }
}

/// Refine the `[min1, min2]` window around the accepted peak bin(s).
///
/// Each side first searches outward for the nearest noise-floor crossing
/// (`diff == 0`), clamping to the alpha band widened by [`EDGE_MARGIN_HZ`]
/// when no crossing exists, then walks on outward to the local minimum of
/// `diff` (first upward derivative sign change).
fn peak_window(
    freqs: &[f64],
    diff: &[f64],
    alpha_band: (f64, f64),
    left_bin: usize,
    right_bin: usize,
) -> (usize, usize) {
    let lo_ext = nearest_bin(freqs, alpha_band.0 - EDGE_MARGIN_HZ);
    let hi_ext = nearest_bin(freqs, alpha_band.1 + EDGE_MARGIN_HZ);

    // Left side.
    let mut min1 = lo_ext;
    if left_bin > lo_ext {
        let crossing = (lo_ext..left_bin)
            .rev()
            .find(|&k| diff[k] == 0.0)
            .unwrap_or(lo_ext);
        let mut m = crossing;
        while m > lo_ext && diff[m - 1] < diff[m] {
            m -= 1;
        }
        min1 = m;
    }

    // Right side.
    let mut min2 = hi_ext.min(diff.len() - 1);
    if right_bin < min2 {
        let crossing = (right_bin + 1..=min2)
            .find(|&k| diff[k] == 0.0)
            .unwrap_or(min2);
        let mut m = crossing;
        while m < min2 && diff[m + 1] < diff[m] {
            m += 1;
        }
        min2 = m;
    }

    (min1.min(left_bin), min2.max(right_bin))
}
