//! Acoubeam Analysis - cross-spectral matrices and frequency-domain beamforming
//!
//! This crate turns multichannel recordings into acoustic source maps:
//!
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`spectra`] - Welch-averaged cross-spectral matrix and its eigen-decomposition
//! - [`linalg`] - complex matrix inversion and Hermitian eigensolver
//! - [`beamformer`] - delay-and-sum, Capon, eigenvalue and MUSIC kernels
//! - [`bands`] - fractional-octave band synthesis and sound pressure level
//!
//! ## Example Workflow
//!
//! ```rust,no_run
//! use acoubeam_analysis::{Algorithm, Beamformer, Overlap, PowerSpectra, Window, bands};
//! use acoubeam_core::{DigestCache, MicGeom, RectGrid, SampleStore};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(DigestCache::open("cache").unwrap());
//! let store = SampleStore::new(51200.0, 2, vec![0.0; 2 * 51200]);
//!
//! // 1. Cross-spectral matrix, computed lazily and cached by digest
//! let spectra = Arc::new(
//!     PowerSpectra::new(store)
//!         .with_block_size(128)
//!         .with_window(Window::Hanning)
//!         .with_overlap(Overlap::Half)
//!         .with_lines(8, 16)
//!         .with_cache(Arc::clone(&cache)),
//! );
//!
//! // 2. Beamform over a focus grid
//! let mics = MicGeom::new(vec![[-0.1, 0.0, 0.0], [0.1, 0.0, 0.0]]);
//! let grid = RectGrid::new(-0.6, 0.0, -0.3, 0.3, 0.68, 0.05);
//! let bf: Beamformer = Beamformer::new(spectra, grid, mics)
//!     .with_algorithm(Algorithm::Base { r_diag: true })
//!     .with_speed_of_sound(346.04)
//!     .with_cache(cache);
//!
//! // 3. Third-octave band map in dB
//! let levels = bands::sound_pressure_levels(&bf.synthetic(4000.0, 3));
//! println!("{} points", levels.len());
//! ```

pub mod bands;
pub mod beamformer;
pub mod fft;
pub mod linalg;
mod serial;
pub mod spectra;

pub use bands::{REFERENCE_POWER, band_lines, sound_pressure_level, sound_pressure_levels, synthesize};
pub use beamformer::{Algorithm, Beamformer, DEFAULT_SPEED_OF_SOUND, PowerMap};
pub use fft::{Fft, Window};
pub use spectra::{BlockSize, CrossSpectralMatrix, EigenDecomposition, Overlap, PowerSpectra};
