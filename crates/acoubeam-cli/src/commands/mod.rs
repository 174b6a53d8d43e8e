//! CLI command implementations.

pub mod cache;
pub mod common;
pub mod map;
pub mod simulate;
pub mod spectra;
