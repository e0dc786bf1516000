//! Background spectral-noise estimation by iterative robust regression.
//!
//! A straight least-squares line through log-power vs log-frequency is
//! biased upward by the alpha peak itself. The fix: fit, clip every sample
//! that sits above the fitted line down onto it, refit, and repeat until
//! consecutive fitted curves agree to within [`NOISE_CONVERGENCE_RMS`] (or
//! [`NOISE_MAX_ITER`] passes run out). Peaks are progressively suppressed
//! and the line converges onto the noise floor.
use crate::config::{NOISE_CONVERGENCE_RMS, NOISE_MAX_ITER};

/// Estimate the noise floor of a band-limited spectrum.
///
/// * `freqs` – frequency bins (Hz), restricted to the analysis band.
/// * `power` – linear power per bin, same length as `freqs`.
///
/// Returns the fitted noise curve in log scale (`10·log10` power), one value
/// per input bin. Degenerate inputs (< 2 bins) echo the log-power back.
pub fn estimate_noise(freqs: &[f64], power: &[f64]) -> Vec<f64> {
    debug_assert_eq!(freqs.len(), power.len());
    let y0: Vec<f64> = power.iter().map(|&p| 10.0 * p.log10()).collect();
    if freqs.len() < 2 {
        return y0;
    }
    let x: Vec<f64> = freqs.iter().map(|&f| 10.0 * f.log10()).collect();

    let mut y = y0;
    let (mut b0, mut b1) = linear_fit(&x, &y);
    let mut fitted: Vec<f64> = x.iter().map(|&xv| b0 + b1 * xv).collect();

    for _ in 0..NOISE_MAX_ITER {
        // Clip observations above the current fit down onto it.
        for (yv, &fv) in y.iter_mut().zip(fitted.iter()) {
            if *yv > fv {
                *yv = fv;
            }
        }
        (b0, b1) = linear_fit(&x, &y);
        let next: Vec<f64> = x.iter().map(|&xv| b0 + b1 * xv).collect();

        let rms = rms_delta(&fitted, &next);
        fitted = next;
        if rms <= NOISE_CONVERGENCE_RMS {
            break;
        }
    }
    fitted
}

/// Ordinary least-squares line `y = b0 + b1·x`.
fn linear_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&xv, &yv) in x.iter().zip(y.iter()) {
        sxy += (xv - mx) * (yv - my);
        sxx += (xv - mx) * (xv - mx);
    }
    let b1 = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    (my - b1 * mx, b1)
}

fn rms_delta(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let ss: f64 = a.iter().zip(b.iter()).map(|(&u, &v)| (u - v) * (u - v)).sum();
    (ss / n).sqrt()
}
