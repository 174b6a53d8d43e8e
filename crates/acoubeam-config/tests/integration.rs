//! Integration tests for acoubeam-config.
//!
//! A study file on disk drives the whole pipeline: the measurement is
//! resolved next to the study, the channel selection is applied to data,
//! geometry and calibration alike, and the map peaks at the source.

use acoubeam_analysis::bands;
use acoubeam_config::{AlgorithmKind, CalibrationConfig, ConfigError, Study};
use acoubeam_core::{DigestCache, MicGeom};
use acoubeam_io::{PointSource, Signal, read_sample_store, simulate, write_sample_store};
use std::sync::Arc;
use tempfile::TempDir;

fn positions() -> Vec<[f64; 3]> {
    let mut p: Vec<[f64; 3]> = (0..7)
        .map(|i| {
            let a = 2.0 * std::f64::consts::PI * f64::from(i) / 7.0;
            [0.25 * a.cos(), 0.25 * a.sin(), 0.0]
        })
        .collect();
    p.push([0.0, 0.0, 0.0]);
    p
}

/// Study plus its recording in `dir`; channel 3 is broken.
fn setup(dir: &std::path::Path) -> Study {
    let mut positions = positions();
    let store = simulate(
        &MicGeom::new(positions.clone()),
        &[PointSource::new([-0.2, 0.1, 0.6], Signal::Sine { freq: 2048.0, amplitude: 1.0 })],
        16384.0,
        8192,
        343.0,
    );
    write_sample_store(dir.join("run.wav"), &store, 32).unwrap();

    // garbage position for the broken channel must not matter
    positions[3] = [9.0, 9.0, 9.0];
    let mut study = Study::new("run.wav", positions);
    study.time_data.invalid_channels = vec![3];
    study.calibration = Some(CalibrationConfig {
        factors: vec![1.0; 8],
    });
    study.grid.x_min = -0.5;
    study.grid.x_max = 0.5;
    study.grid.y_min = -0.5;
    study.grid.y_max = 0.5;
    study.grid.z = 0.6;
    study.grid.increment = 0.1;
    study.spectra.block_size = 256;
    study.beamformer.c = 343.0;
    study.cache.dir = Some("cache".into());
    study
}

#[test]
fn study_file_drives_the_pipeline() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("studies").join("tunnel.toml");
    setup(tmp.path()).save(&path).unwrap();
    // the measurement sits one level up from the study file
    let mut study = Study::load(&path).unwrap();
    study.time_data.path = "../run.wav".into();
    study.validate().unwrap();

    let store = read_sample_store(study.time_data_path()).unwrap();
    assert_eq!(store.num_channels(), 8);

    let spectra = Arc::new(study.spectra(&store));
    let bf = study.beamformer(spectra);
    assert_eq!(bf.mics().get().num_mics(), 7);

    let map = bf.result().unwrap();
    let line = bands::search_sorted(map.frequencies(), 2048.0);
    let (peak, _) = map.peak(line).unwrap();
    let grid = study.grid();
    let (ix, iy) = grid.index(-0.2, 0.1).unwrap();
    assert_eq!(peak, ix * grid.nysteps() + iy);
}

#[test]
fn cache_dir_is_relative_to_study() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("tunnel.toml");
    setup(tmp.path()).save(&path).unwrap();
    let study = Study::load(&path).unwrap();
    assert_eq!(study.cache_dir(), tmp.path().join("cache"));

    let cache = Arc::new(DigestCache::open(study.cache_dir()).unwrap());
    let store = read_sample_store(study.time_data_path()).unwrap();
    let spectra = Arc::new(study.spectra(&store).with_cache(Arc::clone(&cache)));
    let bf = study.beamformer(spectra).with_cache(Arc::clone(&cache));
    assert!(bf.result().is_some());
    assert_eq!(cache.entries().unwrap().len(), 2);
}

#[test]
fn every_algorithm_builds() {
    let tmp = TempDir::new().unwrap();
    let mut study = setup(tmp.path()).with_base_dir(tmp.path());
    let store = read_sample_store(study.time_data_path()).unwrap();
    for kind in [
        AlgorithmKind::Base,
        AlgorithmKind::Capon,
        AlgorithmKind::Eig,
        AlgorithmKind::Music,
    ] {
        study.beamformer.algorithm = kind;
        let bf = study.beamformer(Arc::new(study.spectra(&store)));
        assert_eq!(bf.algorithm().name(), study.algorithm().name());
        assert!(bf.result().is_some());
    }
}

#[test]
fn missing_study_file_is_reported() {
    let err = Study::load("/nonexistent/12345/tunnel.toml").unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}
