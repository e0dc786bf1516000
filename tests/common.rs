/// Shared builders for synthetic two-channel EEG recordings.
///
/// Everything here is deterministic (fixed-seed LCG noise): the pipeline
/// contains no randomness anywhere and the tests must not either.
use ndarray::Array2;
use std::f64::consts::PI;

#[allow(unused)]
pub const SFREQ: f64 = 250.0;

#[allow(unused)]
/// Deterministic broadband noise in roughly [-amp, amp].
pub fn pseudo_noise(seed: u64, n: usize, amp: f64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let u = (state >> 11) as f64 / (1u64 << 53) as f64;
            amp * (2.0 * u - 1.0)
        })
        .collect()
}

/// Two-channel recording: alpha tone (10 / 10.25 Hz) of `alpha_amp` over
/// unit broadband noise, `secs` seconds at [`SFREQ`].
#[allow(unused)]
pub fn alpha_recording(secs: usize, alpha_amp: f64) -> Array2<f64> {
    let n = secs * SFREQ as usize;
    let noise_a = pseudo_noise(0x1234_5678_9abc_def0, n, 1.0);
    let noise_b = pseudo_noise(0x0fed_cba9_8765_4321, n, 1.0);
    Array2::from_shape_fn((2, n), |(ch, t)| {
        let (f, noise) = if ch == 0 { (10.0, &noise_a) } else { (10.25, &noise_b) };
        alpha_amp * (2.0 * PI * f * t as f64 / SFREQ).sin() + noise[t]
    })
}

/// Noise-only recording (no alpha activity at all).
#[allow(unused)]
pub fn noise_recording(secs: usize) -> Array2<f64> {
    let n = secs * SFREQ as usize;
    let noise_a = pseudo_noise(0x5555_aaaa_5555_aaaa, n, 1.0);
    let noise_b = pseudo_noise(0xaaaa_5555_aaaa_5555, n, 1.0);
    Array2::from_shape_fn((2, n), |(ch, t)| {
        if ch == 0 { noise_a[t] } else { noise_b[t] }
    })
}

/// Uniform quality matrix for `secs` packets.
#[allow(unused)]
pub fn uniform_quality(secs: usize, q: f64) -> Array2<f64> {
    Array2::from_elem((2, secs), q)
}
