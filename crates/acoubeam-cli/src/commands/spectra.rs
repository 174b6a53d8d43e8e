//! Cross-spectral matrix inspection.

use super::common::{load_spectra, load_study, spinner};
use acoubeam_analysis::{band_lines, sound_pressure_level};
use clap::Args;

#[derive(Args)]
pub struct SpectraArgs {
    /// Study file or name
    #[arg(long)]
    study: String,

    /// Band centre frequency in Hz
    #[arg(long)]
    freq: f64,

    /// Bands per octave (0 = single frequency line)
    #[arg(long, default_value = "0")]
    band: u32,

    /// Neither read nor write persisted results
    #[arg(long)]
    no_cache: bool,
}

pub fn run(args: SpectraArgs) -> anyhow::Result<()> {
    let study = load_study(&args.study)?;
    let (spectra, _cache) = load_spectra(&study, args.no_cache)?;

    println!(
        "Blocks: {} x {} samples, {} window, {} overlap",
        spectra.num_blocks(),
        spectra.block_size(),
        spectra.window(),
        spectra.overlap()
    );
    match spectra.freq_range() {
        Some((low, high)) => println!("Frequency range: {:.1} Hz to {:.1} Hz", low, high),
        None => println!("Frequency range: empty"),
    }

    let pb = spinner("Decomposing...")?;
    let eigen = spectra.eigen();
    pb.finish_and_clear();
    if band_lines(eigen.frequencies(), args.freq, args.band).is_none() {
        anyhow::bail!("No frequency lines near {} Hz in the analysed range", args.freq);
    }
    let values = spectra.synthetic_ev(args.freq, args.band);

    println!("Eigenvalues at {} Hz (band {}), largest first:", args.freq, args.band);
    for (i, &v) in values.iter().rev().enumerate() {
        println!("  {:3}  {:12.4e}  {:7.1} dB", i + 1, v, sound_pressure_level(v));
    }
    Ok(())
}
