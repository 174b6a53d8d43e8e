//! Criterion benchmarks for acoubeam-analysis components
//!
//! Run with: cargo bench -p acoubeam-analysis

use acoubeam_analysis::{Algorithm, Beamformer, Overlap, PowerSpectra, Window, linalg};
use acoubeam_core::{MicGeom, RectGrid, SampleStore};
use acoubeam_io::{PointSource, Signal, simulate};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

const SAMPLE_RATE: f64 = 51200.0;

/// Spiral-ish array of `n` microphones inside a 0.5 m disc
fn array(n: usize) -> MicGeom {
    MicGeom::new(
        (0..n)
            .map(|i| {
                let r = 0.5 * ((i + 1) as f64 / n as f64).sqrt();
                let a = 2.39996 * i as f64;
                [r * a.cos(), r * a.sin(), 0.0]
            })
            .collect(),
    )
}

/// One second of two uncorrelated noise sources
fn recording(mics: &MicGeom) -> SampleStore {
    simulate(
        mics,
        &[
            PointSource::new([0.1, -0.2, 0.7], Signal::Noise { rms: 1.0, seed: 1 }),
            PointSource::new([-0.25, 0.1, 0.7], Signal::Noise { rms: 0.7, seed: 2 }),
        ],
        SAMPLE_RATE,
        SAMPLE_RATE as usize,
        343.0,
    )
}

fn spectra(store: SampleStore, block_size: usize) -> PowerSpectra {
    PowerSpectra::new(store)
        .with_block_size(block_size)
        .with_window(Window::Hanning)
        .with_overlap(Overlap::Half)
        .with_lines(8, 40)
}

// ============================================================================
// Spectral estimation
// ============================================================================

fn bench_csm(c: &mut Criterion) {
    let mut group = c.benchmark_group("CSM");
    group.sample_size(10);
    let mics = array(16);
    let store = recording(&mics);

    for &block_size in &[128, 512, 2048] {
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, &bs| {
            b.iter(|| {
                // fresh estimator, so nothing is memoised
                let s = spectra(store.clone(), bs);
                black_box(s.csm())
            })
        });
    }

    group.finish();
}

fn bench_eigen(c: &mut Criterion) {
    let mut group = c.benchmark_group("Hermitian_Eigen");

    for &n in &[8, 16, 32, 64] {
        let store = recording(&array(n));
        let csm = spectra(store, 256).csm();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(linalg::hermitian_eigen(black_box(csm.slice(0)), n)))
        });
    }

    group.finish();
}

// ============================================================================
// Beamforming kernels
// ============================================================================

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("Beamformer");
    group.sample_size(10);
    let mics = array(16);
    let freq_data = Arc::new(spectra(recording(&mics), 256));
    // warm the spectral memo so only the kernel is timed
    freq_data.eigen();
    let grid = RectGrid::new(-0.5, 0.5, -0.5, 0.5, 0.7, 0.02);

    for algorithm in [
        Algorithm::Base { r_diag: true },
        Algorithm::Capon,
        Algorithm::Eig { n: -1, r_diag: true },
        Algorithm::Music { n: 2 },
    ] {
        group.bench_function(algorithm.name(), |b| {
            b.iter(|| {
                let bf: Beamformer = Beamformer::new(Arc::clone(&freq_data), grid, mics.clone())
                    .with_algorithm(algorithm);
                black_box(bf.result())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_csm, bench_eigen, bench_kernels);

criterion_main!(benches);
