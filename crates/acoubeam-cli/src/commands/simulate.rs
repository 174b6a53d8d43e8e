//! Point-source recording simulation.

use super::common::{load_study, parse_position};
use acoubeam_core::MicGeom;
use acoubeam_io::{PointSource, Signal, simulate, write_sample_store};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct SimulateArgs {
    /// Study file or name; its microphones record the sources
    #[arg(long)]
    study: String,

    /// Source position as x,y,z in metres (repeatable)
    #[arg(long, value_parser = parse_position, required = true)]
    source: Vec<[f64; 3]>,

    /// Sine frequency in Hz
    #[arg(long, default_value = "2000")]
    freq: f64,

    /// Peak amplitude at 1 m
    #[arg(long, default_value = "1.0")]
    amplitude: f64,

    /// Emit white noise of this RMS instead of a sine
    #[arg(long)]
    noise: Option<f64>,

    /// Duration in seconds
    #[arg(long, default_value = "1.0")]
    duration: f64,

    /// Sample rate in Hz
    #[arg(long, default_value = "51200")]
    sample_rate: u32,

    /// Output WAV file (defaults to the study's time data path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let study = load_study(&args.study)?;
    if !args.duration.is_finite() || args.duration <= 0.0 {
        anyhow::bail!("Duration must be positive");
    }

    // every recorded channel, including ones the study later drops
    let mics = MicGeom::new(study.microphones.positions.clone());
    let sources: Vec<PointSource> = args
        .source
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let signal = match args.noise {
                Some(rms) => Signal::Noise {
                    rms,
                    seed: i as u64 + 1,
                },
                None => Signal::Sine {
                    freq: args.freq,
                    amplitude: args.amplitude,
                },
            };
            PointSource::new(position, signal)
        })
        .collect();

    let sample_rate = f64::from(args.sample_rate);
    let num_samples = (args.duration * sample_rate).round() as usize;
    println!(
        "Simulating {} source(s) on {} microphones, {} samples at {} Hz",
        sources.len(),
        mics.num_mics(),
        num_samples,
        args.sample_rate
    );
    let store = simulate(&mics, &sources, sample_rate, num_samples, study.beamformer.c);

    let output = args.output.unwrap_or_else(|| study.time_data_path());
    write_sample_store(&output, &store, args.bit_depth)?;
    println!("Wrote {}", output.display());
    Ok(())
}
