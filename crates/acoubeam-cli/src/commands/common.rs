//! Shared CLI helpers used across multiple commands.

use acoubeam_analysis::PowerSpectra;
use acoubeam_config::{Study, find_study};
use acoubeam_core::DigestCache;
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Parse an `x,y,z` position for clap's `value_parser`.
pub fn parse_position(s: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("Invalid position: '{}' (expected x,y,z)", s));
    }
    let mut position = [0.0; 3];
    for (p, text) in position.iter_mut().zip(&parts) {
        *p = text
            .parse()
            .map_err(|_| format!("Invalid coordinate '{}' in '{}'", text, s))?;
    }
    Ok(position)
}

/// Load and validate a study by name or path.
pub fn load_study(name: &str) -> anyhow::Result<Study> {
    let Some(path) = find_study(name) else {
        anyhow::bail!("Study '{}' not found", name);
    };
    let study = Study::load(&path)?;
    study.validate()?;
    Ok(study)
}

/// Open the result cache at `dir`; failures disable caching with a warning.
pub fn open_cache(dir: &Path) -> Option<Arc<DigestCache>> {
    match DigestCache::open(dir) {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            tracing::warn!(error = %e, "result cache unavailable, computing without it");
            None
        }
    }
}

/// Spectral estimator for a study's measurement, attached to the cache
/// unless `no_cache`.
pub fn load_spectra(study: &Study, no_cache: bool) -> anyhow::Result<(Arc<PowerSpectra>, Option<Arc<DigestCache>>)> {
    let path = study.time_data_path();
    let store = acoubeam_io::read_sample_store(&path)
        .with_context(|| format!("reading time data {}", path.display()))?;
    println!(
        "Time data: {} channels, {} samples, {} Hz",
        store.num_channels(),
        store.num_samples(),
        store.sample_rate()
    );

    let cache = if no_cache { None } else { open_cache(&study.cache_dir()) };
    let spectra = study.spectra(&store);
    let spectra = match &cache {
        Some(cache) => spectra.with_cache(Arc::clone(cache)),
        None => spectra,
    };
    Ok((Arc::new(spectra), cache))
}

/// Spinner on stderr while a long computation runs.
pub fn spinner(message: &'static str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed_precise}]")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
