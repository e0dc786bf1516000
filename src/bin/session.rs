use anyhow::{bail, Result};
use clap::Parser;
use ndarray::s;
use std::path::PathBuf;

use nfb::{io::Recording, load_baseline, CalibrationError, EngineConfig, SessionEngine};

#[derive(Parser)]
#[command(name = "session", about = "Replay a recording through the session engine, one volume per second")]
struct Args {
    /// recording.safetensors with the live session data
    #[arg(long)]
    input: PathBuf,

    /// baseline.safetensors from the calibrate binary
    #[arg(long)]
    baseline: PathBuf,

    /// Alpha band lower edge in Hz (default: 6.0)
    #[arg(long, default_value_t = 6.0)]
    iaf_inf: f64,

    /// Alpha band upper edge in Hz (default: 13.0)
    #[arg(long, default_value_t = 13.0)]
    iaf_sup: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rec = Recording::load(&args.input)?;
    let baseline = load_baseline(&args.baseline)?;
    if baseline.error != CalibrationError::Ok {
        bail!("baseline artifact carries error code {:?}", baseline.error);
    }

    let cfg = EngineConfig {
        sfreq: rec.sfreq,
        alpha_band: (args.iaf_inf, args.iaf_sup),
        ..EngineConfig::default()
    };

    let win = cfg.window_samples();
    let step = cfg.packet_samples();
    let mut engine = SessionEngine::new(cfg, baseline);

    // One tick per second once the first full analysis window is available.
    let mut sec = win / step;
    while sec * step <= rec.signal.ncols() {
        let end = sec * step;
        let segment = rec.signal.slice(s![.., end - win..end]).to_owned();
        let volume = engine.tick(&segment);
        println!("t={sec:>4} s  volume={volume:.3}");
        sec += 1;
    }

    let st = engine.state();
    println!(
        "Session done: {} ticks, {} frequency-history entries",
        st.volume_history.len(),
        st.freq_history.len()
    );
    Ok(())
}
