//! Study files and configuration for acoubeam.
//!
//! A study ties a measurement to an array geometry, a focus grid and the
//! processing settings, and builds the analysis pipeline from them.
//!
//! # Features
//!
//! - **Study files**: load and save studies as TOML
//! - **Validation**: check values the processing chain restricts
//! - **Paths**: platform cache and study directories
//!
//! # Example
//!
//! ```rust,no_run
//! use acoubeam_config::Study;
//! use acoubeam_core::SampleStore;
//! use std::sync::Arc;
//!
//! let study = Study::load("tunnel.toml").unwrap();
//! study.validate().unwrap();
//!
//! let store = SampleStore::new(51200.0, 2, vec![0.0; 2 * 51200]);
//! let bf = study.beamformer(Arc::new(study.spectra(&store)));
//! println!("{} on {} microphones", bf.algorithm(), bf.mics().get().num_mics());
//! ```

mod error;
mod study;

/// Platform-specific paths for studies and the cache.
pub mod paths;

/// Study validation.
pub mod validation;

pub use error::ConfigError;
pub use paths::{default_cache_dir, ensure_cache_dir, find_study, user_studies_dir};
pub use study::{
    AlgorithmKind, BeamformerConfig, CacheConfig, CalibrationConfig, GridConfig, MicrophonesConfig,
    SpectraConfig, Study, TimeDataConfig,
};
pub use validation::validate_study;
