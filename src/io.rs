//! Safetensors I/O for recordings and baseline artifacts.
//!
//! Same minimal format as elsewhere in our tooling: a little-endian u64
//! header length, a JSON header mapping tensor names to dtype/shape/offsets,
//! then the raw payload. No dependency on the `safetensors` crate — we only
//! ever need raw bytes → `ndarray`.
//!
//! Recording file keys: `signal` `[C, T]` F64, `quality` `[C, P]` F64,
//! `sfreq` `[1]` F64. Baseline file keys: `raw_snr`, `smoothed_snr`,
//! `freq_history` (1-D F64) and `error` (`[1]` I32, see
//! [`CalibrationError::code`]).
use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;

use crate::calibration::CalibrationBaseline;
use crate::value::CalibrationError;

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    if 8 + n > bytes.len() {
        bail!("safetensors header length {n} exceeds file size");
    }
    let header: HashMap<String, serde_json::Value> = serde_json::from_slice(&bytes[8..8 + n])
        .context("failed to parse safetensors header")?;
    Ok((header, 8 + n))
}

fn tensor_bytes<'a>(
    bytes: &'a [u8],
    data_start: usize,
    entry: &serde_json::Value,
) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("missing data_offsets")?;
    let s = offsets[0].as_u64().context("bad offset")? as usize;
    let e = offsets[1].as_u64().context("bad offset")? as usize;
    if data_start + e > bytes.len() || s > e {
        bail!("tensor offsets out of range");
    }
    Ok(&bytes[data_start + s..data_start + e])
}

fn read_f64_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    Ok(raw
        .chunks_exact(8)
        .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
        .collect())
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("missing shape")?
        .iter()
        .map(|v| v.as_u64().map(|u| u as usize).context("bad shape entry"))
        .collect()
}

// ── Recording ────────────────────────────────────────────────────────────────

/// A calibration or session recording: signal matrix, per-packet quality
/// matrix, sampling rate.
pub struct Recording {
    /// `[C, T]` raw samples (NaN marks lost/bad packets).
    pub signal: Array2<f64>,
    /// `[C, P]` per-packet quality scores in `[0, 1] ∪ {0.25, −1}`.
    pub quality: Array2<f64>,
    /// Sampling rate (Hz).
    pub sfreq: f64,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let load2 = |key: &str| -> Result<Array2<f64>> {
            let entry = header.get(key).with_context(|| format!("missing '{key}' key"))?;
            let shape = shape_of(entry)?;
            if shape.len() != 2 {
                bail!("'{key}' must be 2-D, got shape {shape:?}");
            }
            let vec = read_f64_tensor(&bytes, data_start, entry)?;
            Ok(Array2::from_shape_vec((shape[0], shape[1]), vec)?)
        };

        let signal = load2("signal")?;
        let quality = load2("quality")?;
        let sfreq_entry = header.get("sfreq").context("missing 'sfreq' key")?;
        let sfreq = *read_f64_tensor(&bytes, data_start, sfreq_entry)?
            .first()
            .context("empty 'sfreq' tensor")?;

        Ok(Recording { signal, quality, sfreq })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_f64(
            "signal",
            self.signal.iter().copied().collect::<Vec<_>>().as_slice(),
            &[self.signal.nrows(), self.signal.ncols()],
        );
        w.add_f64(
            "quality",
            self.quality.iter().copied().collect::<Vec<_>>().as_slice(),
            &[self.quality.nrows(), self.quality.ncols()],
        );
        w.add_f64("sfreq", &[self.sfreq], &[1]);
        w.write(path)
    }
}

// ── Baseline artifact ────────────────────────────────────────────────────────

/// Persist a calibration baseline.
pub fn save_baseline(baseline: &CalibrationBaseline, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f64("raw_snr", &baseline.raw_snr, &[baseline.raw_snr.len()]);
    w.add_f64("smoothed_snr", &baseline.smoothed_snr, &[baseline.smoothed_snr.len()]);
    w.add_f64("freq_history", &baseline.freq_history, &[baseline.freq_history.len()]);
    w.add_i32("error", &[baseline.error.code()], &[1]);
    w.write(path)
}

/// Load a calibration baseline saved by [`save_baseline`].
pub fn load_baseline(path: &Path) -> Result<CalibrationBaseline> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let load1 = |key: &str| -> Result<Vec<f64>> {
        let entry = header.get(key).with_context(|| format!("missing '{key}' key"))?;
        read_f64_tensor(&bytes, data_start, entry)
    };

    let raw_snr = load1("raw_snr")?;
    let smoothed_snr = load1("smoothed_snr")?;
    let freq_history = load1("freq_history")?;

    let err_entry = header.get("error").context("missing 'error' key")?;
    let raw = tensor_bytes(&bytes, data_start, err_entry)?;
    if raw.len() < 4 {
        bail!("'error' tensor too small");
    }
    let code = i32::from_le_bytes(raw[..4].try_into().unwrap());
    let error = CalibrationError::from_code(code)
        .with_context(|| format!("unknown calibration error code {code}"))?;

    Ok(CalibrationBaseline { raw_snr, smoothed_snr, freq_history, error })
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Minimal safetensors writer for F64 and I32 tensors.
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes
            .into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

impl Default for StWriter {
    fn default() -> Self {
        Self::new()
    }
}
