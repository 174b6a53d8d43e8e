//! Acoubeam Core - data model and digest-driven caching for array acoustics
//!
//! This crate holds everything the numerical pipeline consumes or shares:
//!
//! - [`samples`] - canonical multichannel time-domain store
//! - [`calib`] - per-channel calibration factors
//! - [`geometry`] - microphone coordinates
//! - [`grid`] - candidate source positions ([`Grid`] trait, [`RectGrid`])
//! - [`digest`] - value-based fingerprints used as cache keys
//! - [`cache`] - durable, content-addressed artifact store
//! - [`slot`] - swappable input handles and digest-guarded memo cells
//!
//! ## Lazy evaluation model
//!
//! Every derived result is keyed by a [`Digest`] computed from the *values*
//! of its inputs. A stage recomputes only when the digest of its current
//! inputs differs from the one it last saw, and persists the result in a
//! [`DigestCache`] so other runs and processes can reuse it.
//!
//! ```rust,no_run
//! use acoubeam_core::{ArtifactKind, DigestCache, Digest};
//!
//! let cache = DigestCache::open("cache").unwrap();
//! let key = Digest::builder().str("example").f64(343.0).finish();
//! if cache.lookup::<Vec<f64>>(ArtifactKind::DelayAndSum, &key).unwrap().is_none() {
//!     cache.store(ArtifactKind::DelayAndSum, &key, &vec![1.0, 2.0]).unwrap();
//! }
//! ```

pub mod cache;
pub mod calib;
pub mod digest;
pub mod geometry;
pub mod grid;
pub mod samples;
pub mod slot;

pub use cache::{ArtifactKind, CacheError, CacheStats, DigestCache};
pub use calib::Calibration;
pub use digest::{Digest, DigestBuilder};
pub use geometry::MicGeom;
pub use grid::{Grid, RectGrid};
pub use samples::SampleStore;
pub use slot::{Memo, Slot};
