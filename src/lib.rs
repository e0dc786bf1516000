//! # nfb — EEG relaxation-index engine in pure Rust
//!
//! `nfb` turns raw multi-channel EEG into a single bounded control signal
//! (the "volume") for real-time neurofeedback. The core is a two-phase
//! pipeline: a calibration pass establishes a per-user baseline of
//! alpha-band signal-to-noise ratios, then live sessions compute one
//! relaxation index per second and map it onto `[0, 1]` against that
//! baseline.
//!
//! _No BLAS, no C libraries — pure Rust + [RustFFT](https://crates.io/crates/rustfft)._
//!
//! ## Pipeline overview
//!
//! ```text
//! recording [C, T] + quality [C, P]
//!   │
//!   ├─ calibration::calibrate()
//!   │    ├─ packet gating            remap quality, drop bad seconds
//!   │    ├─ quality gate             all ≥ 0.5 or any ≥ 0.75, else BAD_QUALITY
//!   │    └─ 4 s window / 1 s hop:
//!   │         clean → welch PSD → noise fit → peak detect → SNR
//!   │         combine 2 channels → raw + smoothed SNR series
//!   │              │
//!   │              └─→ CalibrationBaseline (immutable)
//!   │
//!   └─ SessionEngine::tick()   once per second
//!        combined SNR → trailing smoothing → quantile/logistic map
//!              │
//!              └─→ volume ∈ [0, 1]   (1 at/below baseline, → 0 when deeply relaxed)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use nfb::{calibrate, EngineConfig, SessionEngine};
//! use ndarray::Array2;
//!
//! let cfg = EngineConfig::default();
//!
//! // 2-channel, 60-second calibration recording at 250 Hz.
//! let signal: Array2<f64> = Array2::zeros((2, 15_000));
//! let quality: Array2<f64> = Array2::from_elem((2, 60), 0.9);
//!
//! let baseline = calibrate(&signal, &quality, &cfg);
//! assert_eq!(baseline.error, nfb::CalibrationError::Ok);
//!
//! // Live session: one tick per second over the most recent 4 s window.
//! let mut engine = SessionEngine::new(cfg, baseline);
//! let segment: Array2<f64> = Array2::zeros((2, 1_000));
//! let volume = engine.tick(&segment);
//! assert!((0.0..=1.0).contains(&volume));
//! ```
//!
//! ## Error signalling
//!
//! Nothing in the pipeline throws past the I/O boundary. Calibration
//! reports `BAD_INPUT` / `BAD_QUALITY` through
//! [`CalibrationBaseline::error`]; per-tick failures flow as tagged
//! [`IndexValue`]s internally and are lowered to the legacy NaN
//! (indeterminate, hold feedback) and +inf (diverged, terminate session)
//! sentinels only where values cross the crate boundary.

pub mod calibration;
pub mod clean;
pub mod config;
pub mod io;
pub mod noise;
pub mod peak;
pub mod psd;
pub mod session;
pub mod snr;
pub mod stats;
pub mod value;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `nfb::Foo` without having to know the internal module layout.

// config
pub use config::EngineConfig;

// calibration
pub use calibration::{calibrate, CalibrationBaseline};

// session
pub use session::{map_volume, smooth_tail, SessionEngine, SessionState};

// per-channel SNR
pub use snr::{channel_snr, combine_channels, ChannelSnr};

// spectral building blocks
pub use noise::estimate_noise;
pub use peak::{detect_peak, PeakOutcome};
pub use psd::{welch, Spectrum};

// tagged values / error codes
pub use value::{CalibrationError, IndexValue};

// io
pub use io::{load_baseline, save_baseline, Recording};
