//! Tagged index values and the calibration error code.
//!
//! The legacy pipeline signalled every failure mode through floating-point
//! sentinels (NaN for "indeterminate", +inf for "diverged"). Those values are
//! still what crosses the crate boundary, but internally each stage works on
//! [`IndexValue`] so control flow is an exhaustive match instead of a chain
//! of `is_nan()` / `is_infinite()` checks.

/// One relaxation-index sample as seen by the smoothing and volume stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexValue {
    /// A usable combined SNR (always ≥ 1 by the SNR floor).
    Value(f64),
    /// No usable relaxation value this tick (lowered to NaN). Non-fatal.
    Indeterminate,
    /// The pipeline saturated with failure sentinels (lowered to +inf).
    /// Fatal: the caller should terminate the session.
    Diverged,
}

impl IndexValue {
    /// Lift a sentinel-encoded scalar into the tagged representation.
    pub fn from_f64(v: f64) -> Self {
        if v.is_nan() {
            IndexValue::Indeterminate
        } else if v.is_infinite() {
            IndexValue::Diverged
        } else {
            IndexValue::Value(v)
        }
    }

    /// Lower to the wire-compatible sentinel encoding.
    pub fn as_f64(self) -> f64 {
        match self {
            IndexValue::Value(v) => v,
            IndexValue::Indeterminate => f64::NAN,
            IndexValue::Diverged => f64::INFINITY,
        }
    }

    pub fn is_value(self) -> bool {
        matches!(self, IndexValue::Value(_))
    }
}

/// Outcome code carried by a [`crate::CalibrationBaseline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// Calibration succeeded; the baseline series are usable.
    Ok,
    /// Malformed input (empty signal or quality matrix). Fatal.
    BadInput,
    /// The recording failed the quality gate. Fatal for this attempt only;
    /// safe to retry with a new recording.
    BadQuality,
}

impl CalibrationError {
    /// Stable integer encoding used by the baseline artifact on disk.
    pub fn code(self) -> i32 {
        match self {
            CalibrationError::Ok => 0,
            CalibrationError::BadInput => 1,
            CalibrationError::BadQuality => 2,
        }
    }

    pub fn from_code(c: i32) -> Option<Self> {
        match c {
            0 => Some(CalibrationError::Ok),
            1 => Some(CalibrationError::BadInput),
            2 => Some(CalibrationError::BadQuality),
            _ => None,
        }
    }
}
