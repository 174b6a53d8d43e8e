//! Acoubeam CLI - acoustic source maps from microphone array recordings.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "acoubeam")]
#[command(author, version, about = "Acoustic beamforming CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a source map and report its peak
    Map(commands::map::MapArgs),

    /// Inspect the cross-spectral matrix and its eigenvalues
    Spectra(commands::spectra::SpectraArgs),

    /// Render a recording of point sources for a study's array
    Simulate(commands::simulate::SimulateArgs),

    /// List or clear persisted results
    Cache(commands::cache::CacheArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Map(args) => commands::map::run(args),
        Commands::Spectra(args) => commands::spectra::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Cache(args) => commands::cache::run(args),
    }
}
