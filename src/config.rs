//! Engine configuration.
//!
//! [`EngineConfig`] holds every tunable parameter of the relaxation-index
//! pipeline. The empirically tuned disambiguation thresholds live here as
//! named constants so they can be adjusted and tested independently of the
//! detector's control flow.

/// Minimum frequency-history length before the "usual range" filter is
/// allowed to run on an ambiguous multi-candidate spectrum.
pub const HISTORY_GATE: usize = 20;

/// Amplitude-ratio threshold for the strongest-vs-second-strongest test:
/// the strongest candidate wins outright when `A · AMP_RATIO > B`.
pub const AMP_RATIO: f64 = 0.8;

/// Margin (Hz) added on each side of the alpha band when searching for the
/// noise-floor crossing around an accepted peak; the search clamps to this
/// window when no crossing exists.
pub const EDGE_MARGIN_HZ: f64 = 2.0;

/// Maximum refinement passes of the iterative noise fit.
pub const NOISE_MAX_ITER: usize = 49;

/// RMS delta between consecutive fitted curves below which the noise fit is
/// considered converged.
pub const NOISE_CONVERGENCE_RMS: f64 = 0.05;

/// Configuration for calibration and session processing.
///
/// All fields are `pub`; construct with struct-update syntax or take the
/// defaults:
///
/// ```
/// use nfb::EngineConfig;
///
/// let cfg = EngineConfig {
///     alpha_band: (7.0, 13.0),   // narrower alpha sub-band
///     smoothing_dur: 30.0,
///     ..EngineConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sampling rate of the incoming signal in Hz.
    ///
    /// Default: `250.0` Hz.
    pub sfreq: f64,

    /// Alpha sub-band `[IAFinf, IAFsup]` (Hz) searched for the relaxation
    /// peak. Historically 6–13 or 7–13 Hz.
    ///
    /// Default: `(6.0, 13.0)`.
    pub alpha_band: (f64, f64),

    /// Analysis band (Hz) the spectrum is truncated to before noise
    /// estimation. Must enclose `alpha_band`.
    ///
    /// Default: `(2.0, 30.0)`.
    pub analysis_band: (f64, f64),

    /// SNR analysis window length in seconds (calibration sliding window and
    /// per-tick session segment).
    ///
    /// Default: `4.0` s.
    pub window_dur: f64,

    /// Hop of the calibration sliding window in seconds.
    ///
    /// Default: `1.0` s.
    pub hop_dur: f64,

    /// Trailing smoothing window in seconds, shared by the calibration
    /// smoothed series and the session smoothing step.
    ///
    /// Default: `20.0` s.
    pub smoothing_dur: f64,

    /// Order-statistic quantile of the calibration smoothed-SNR series used
    /// as the upper anchor of the volume mapping.
    ///
    /// Default: `0.95`.
    pub volume_quantile: f64,

    /// Welch segment length in seconds for the PSD estimate.
    ///
    /// Default: `1.0` s.
    pub psd_segment_dur: f64,

    /// Fractional overlap between Welch segments, in `[0, 1)`.
    ///
    /// Default: `0.5`.
    pub psd_overlap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sfreq: 250.0,
            alpha_band: (6.0, 13.0),
            analysis_band: (2.0, 30.0),
            window_dur: 4.0,
            hop_dur: 1.0,
            smoothing_dur: 20.0,
            volume_quantile: 0.95,
            psd_segment_dur: 1.0,
            psd_overlap: 0.5,
        }
    }
}

impl EngineConfig {
    /// Samples per 1-second quality packet.
    pub fn packet_samples(&self) -> usize {
        self.sfreq as usize
    }

    /// Samples per SNR analysis window.
    ///
    /// ```
    /// use nfb::EngineConfig;
    /// assert_eq!(EngineConfig::default().window_samples(), 1000);
    /// ```
    pub fn window_samples(&self) -> usize {
        (self.window_dur * self.sfreq) as usize
    }

    /// Samples per calibration hop.
    pub fn hop_samples(&self) -> usize {
        (self.hop_dur * self.sfreq) as usize
    }

    /// Smoothing window length in ticks (1 tick = 1 second).
    pub fn smoothing_ticks(&self) -> usize {
        self.smoothing_dur.max(1.0) as usize
    }

    /// Welch segment length in samples.
    pub fn psd_segment_samples(&self) -> usize {
        (self.psd_segment_dur * self.sfreq) as usize
    }
}
