//! Persisted result management.

use super::common::{format_bytes, load_study};
use acoubeam_config::default_cache_dir;
use acoubeam_core::{ArtifactKind, DigestCache};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

/// Which cache directory a subcommand acts on.
#[derive(Args)]
struct Location {
    /// Cache directory
    #[arg(long, conflicts_with = "study")]
    dir: Option<PathBuf>,

    /// Use the cache directory of this study
    #[arg(long)]
    study: Option<String>,
}

impl Location {
    fn resolve(&self) -> anyhow::Result<PathBuf> {
        Ok(match (&self.dir, &self.study) {
            (Some(dir), _) => dir.clone(),
            (None, Some(study)) => load_study(study)?.cache_dir(),
            (None, None) => default_cache_dir(),
        })
    }
}

#[derive(Subcommand)]
enum CacheCommand {
    /// List persisted artifacts by kind
    List {
        #[command(flatten)]
        location: Location,

        /// Show every artifact, not just totals
        #[arg(short, long)]
        verbose: bool,
    },

    /// Remove every persisted artifact
    Clear {
        #[command(flatten)]
        location: Location,
    },
}

pub fn run(args: CacheArgs) -> anyhow::Result<()> {
    match args.command {
        CacheCommand::List { location, verbose } => {
            let dir = location.resolve()?;
            if !dir.is_dir() {
                println!("No cache at {}", dir.display());
                return Ok(());
            }
            let cache = DigestCache::open(&dir)?;
            let entries = cache.entries()?;
            println!("Cache: {}", dir.display());

            for kind in ArtifactKind::ALL {
                let of_kind: Vec<_> = entries.iter().filter(|e| e.kind == kind).collect();
                if of_kind.is_empty() {
                    continue;
                }
                let bytes: u64 = of_kind.iter().map(|e| e.size).sum();
                println!("  {:<22} {:4}  {:>10}", kind.name(), of_kind.len(), format_bytes(bytes));
                if verbose {
                    for entry in of_kind {
                        println!("    {}  {}", entry.digest, format_bytes(entry.size));
                    }
                }
            }

            let total: u64 = entries.iter().map(|e| e.size).sum();
            println!("{} artifact(s), {}", entries.len(), format_bytes(total));
        }
        CacheCommand::Clear { location } => {
            let dir = location.resolve()?;
            if !dir.is_dir() {
                println!("No cache at {}", dir.display());
                return Ok(());
            }
            let removed = DigestCache::open(&dir)?.clear()?;
            println!("Removed {} artifact(s) from {}", removed, dir.display());
        }
    }
    Ok(())
}
