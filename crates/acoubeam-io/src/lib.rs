//! Sample store I/O for acoubeam.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`read_sample_store`] and [`write_sample_store`] map
//!   multichannel WAV files to and from a [`SampleStore`](acoubeam_core::SampleStore),
//!   one channel per microphone
//! - **Simulation**: [`simulate`] renders what an array would record from
//!   monopole point sources
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use acoubeam_core::MicGeom;
//! use acoubeam_io::{PointSource, Signal, read_sample_store, simulate, write_sample_store};
//!
//! let mics = MicGeom::new(vec![[-0.1, 0.0, 0.0], [0.1, 0.0, 0.0]]);
//! let source = PointSource::new([0.0, 0.0, 1.0], Signal::Sine { freq: 2000.0, amplitude: 1.0 });
//! let store = simulate(&mics, &[source], 51200.0, 51200, 343.0);
//!
//! write_sample_store("array.wav", &store, 32)?;
//! let loaded = read_sample_store("array.wav")?;
//! assert_eq!(loaded.num_channels(), 2);
//! # Ok::<(), acoubeam_io::Error>(())
//! ```

mod simulate;
mod wav;

pub use simulate::{PointSource, Signal, simulate};
pub use wav::{WavFormat, WavInfo, read_sample_store, read_wav_info, write_sample_store};

/// Error types for sample store I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The store cannot be represented in a WAV file.
    #[error("Cannot write sample store: {0}")]
    InvalidStore(String),
}

/// Convenience result type for sample store I/O.
pub type Result<T> = std::result::Result<T, Error>;
