use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use nfb::{calibrate, io::Recording, save_baseline, CalibrationError, EngineConfig};

#[derive(Parser)]
#[command(name = "calibrate", about = "EEG relaxation-index calibration: recording → baseline")]
struct Args {
    /// recording.safetensors (signal + quality + sfreq)
    #[arg(long)]
    input: PathBuf,

    /// baseline.safetensors output path
    #[arg(long)]
    output: PathBuf,

    /// Alpha band lower edge in Hz (default: 6.0)
    #[arg(long, default_value_t = 6.0)]
    iaf_inf: f64,

    /// Alpha band upper edge in Hz (default: 13.0)
    #[arg(long, default_value_t = 13.0)]
    iaf_sup: f64,

    /// Smoothing window in seconds (default: 20.0)
    #[arg(long, default_value_t = 20.0)]
    smoothing: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rec = Recording::load(&args.input)?;
    println!(
        "Loaded {} ch × {} samples @ {} Hz ({} quality packets)",
        rec.signal.nrows(),
        rec.signal.ncols(),
        rec.sfreq,
        rec.quality.ncols()
    );

    let cfg = EngineConfig {
        sfreq: rec.sfreq,
        alpha_band: (args.iaf_inf, args.iaf_sup),
        smoothing_dur: args.smoothing,
        ..EngineConfig::default()
    };

    let baseline = calibrate(&rec.signal, &rec.quality, &cfg);
    match baseline.error {
        CalibrationError::Ok => {
            println!(
                "Calibration OK: {} windows, {} history entries",
                baseline.raw_snr.len(),
                baseline.freq_history.len()
            );
        }
        CalibrationError::BadQuality => bail!("calibration rejected: recording quality too low"),
        CalibrationError::BadInput => bail!("calibration rejected: malformed input"),
    }

    save_baseline(&baseline, &args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
