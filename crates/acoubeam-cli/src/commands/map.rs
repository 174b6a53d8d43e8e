//! Source map command.

use super::common::{load_spectra, load_study, spinner};
use acoubeam_analysis::beamformer::peak;
use acoubeam_analysis::{band_lines, sound_pressure_level, sound_pressure_levels};
use acoubeam_core::{Grid, RectGrid};
use anyhow::Context;
use clap::Args;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct MapArgs {
    /// Study file or name
    #[arg(long)]
    study: String,

    /// Band centre frequency in Hz
    #[arg(long)]
    freq: f64,

    /// Bands per octave (0 = single frequency line, 1 = octave, 3 = third octave)
    #[arg(long, default_value = "0")]
    band: u32,

    /// Write the band map as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Neither read nor write persisted results
    #[arg(long)]
    no_cache: bool,
}

pub fn run(args: MapArgs) -> anyhow::Result<()> {
    let study = load_study(&args.study)?;
    let (spectra, cache) = load_spectra(&study, args.no_cache)?;
    let bf = study.beamformer(spectra);
    let bf = match &cache {
        Some(cache) => bf.with_cache(std::sync::Arc::clone(cache)),
        None => bf,
    };

    println!("Algorithm: {}, c = {} m/s", bf.algorithm(), bf.speed_of_sound());
    let pb = spinner("Beamforming...")?;
    let result = bf.result();
    pb.finish_and_clear();
    let Some(map) = result else {
        anyhow::bail!("No map computed; check the channel count of time data and microphones");
    };
    if let (Some(first), Some(last)) = (map.frequencies().first(), map.frequencies().last()) {
        println!(
            "Map: {} lines from {:.1} Hz to {:.1} Hz, shape {:?}",
            map.num_freqs(),
            first,
            last,
            map.shape()
        );
    }

    if band_lines(map.frequencies(), args.freq, args.band).is_none() {
        anyhow::bail!("No frequency lines near {} Hz in the analysed range", args.freq);
    }
    let grid = study.grid();
    let values = map.synthetic(args.freq, args.band);

    if let Some((k, value)) = peak(&values)
        && let Some(position) = grid.position(k)
    {
        println!(
            "Peak at ({:.3}, {:.3}, {:.3}) m: {:.1} dB",
            position[0],
            position[1],
            position[2],
            sound_pressure_level(value)
        );
    }

    if let Some(path) = &args.csv {
        write_csv(path, &grid, &values)?;
        println!("Wrote {}", path.display());
    }

    if let Some(cache) = &cache {
        let stats = cache.stats();
        tracing::info!(lookups = stats.lookups, hits = stats.hits, stores = stats.stores, "cache");
    }
    Ok(())
}

fn write_csv(path: &Path, grid: &RectGrid, values: &[f64]) -> anyhow::Result<()> {
    let mut csv = String::from("x,y,z,power,level_db\n");
    let levels = sound_pressure_levels(values);
    for ((p, &v), level) in grid.positions().iter().zip(values).zip(levels) {
        let _ = writeln!(csv, "{},{},{},{:e},{:.3}", p[0], p[1], p[2], v, level);
    }
    std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))
}
