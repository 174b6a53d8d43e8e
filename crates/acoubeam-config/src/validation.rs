//! Study validation.
//!
//! Parsing only checks types; this module checks the values the processing
//! chain restricts. Each check returns the first offending field as a
//! [`ConfigError::InvalidValue`].
//!
//! # Example
//!
//! ```rust
//! use acoubeam_config::Study;
//!
//! let mut study = Study::new("run.wav", vec![[0.0, 0.0, 0.0], [0.1, 0.0, 0.0]]);
//! assert!(study.validate().is_ok());
//!
//! study.spectra.block_size = 1000;
//! assert!(study.validate().is_err());
//! ```

use acoubeam_analysis::BlockSize;

use crate::error::ConfigError;
use crate::study::{GridConfig, Study};

/// Validate every section of a study.
pub fn validate_study(study: &Study) -> Result<(), ConfigError> {
    validate_block_size(study.spectra.block_size)?;
    validate_grid(&study.grid)?;
    validate_speed_of_sound(study.beamformer.c)?;
    validate_time_range(study.time_data.start, study.time_data.stop)?;

    let recorded = study.microphones.positions.len();
    validate_channels(&study.time_data.invalid_channels, recorded)?;
    if let Some(calib) = &study.calibration {
        validate_calibration(&calib.factors, recorded)?;
    }
    Ok(())
}

/// Block size must be one of [`BlockSize::ALLOWED`].
pub fn validate_block_size(block_size: usize) -> Result<(), ConfigError> {
    match BlockSize::new(block_size) {
        Some(_) => Ok(()),
        None => Err(ConfigError::invalid(
            "spectra.block_size",
            format!("{block_size} is not one of {:?}", BlockSize::ALLOWED),
        )),
    }
}

/// Finite bounds with `min <= max` and a positive increment.
pub fn validate_grid(grid: &GridConfig) -> Result<(), ConfigError> {
    let values = [
        ("grid.x_min", grid.x_min),
        ("grid.x_max", grid.x_max),
        ("grid.y_min", grid.y_min),
        ("grid.y_max", grid.y_max),
        ("grid.z", grid.z),
        ("grid.increment", grid.increment),
    ];
    if let Some((field, v)) = values.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ConfigError::invalid(*field, format!("{v} is not finite")));
    }
    if grid.increment <= 0.0 {
        return Err(ConfigError::invalid(
            "grid.increment",
            format!("{} must be positive", grid.increment),
        ));
    }
    if grid.x_min > grid.x_max {
        return Err(ConfigError::invalid("grid.x_min", "greater than grid.x_max"));
    }
    if grid.y_min > grid.y_max {
        return Err(ConfigError::invalid("grid.y_min", "greater than grid.y_max"));
    }
    Ok(())
}

/// Speed of sound must be finite and positive.
pub fn validate_speed_of_sound(c: f64) -> Result<(), ConfigError> {
    if c.is_finite() && c > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid("beamformer.c", format!("{c} must be positive")))
    }
}

/// `stop`, when given, must lie after `start`.
pub fn validate_time_range(start: usize, stop: Option<usize>) -> Result<(), ConfigError> {
    match stop {
        Some(stop) if stop <= start => Err(ConfigError::invalid(
            "time_data.stop",
            format!("{stop} is not after start {start}"),
        )),
        _ => Ok(()),
    }
}

/// Invalid channels must exist and leave at least one microphone.
pub fn validate_channels(invalid_channels: &[usize], recorded: usize) -> Result<(), ConfigError> {
    if let Some(ch) = invalid_channels.iter().find(|&&ch| ch >= recorded) {
        return Err(ConfigError::invalid(
            "time_data.invalid_channels",
            format!("channel {ch} does not exist ({recorded} microphones)"),
        ));
    }
    let mut unique = invalid_channels.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() >= recorded {
        return Err(ConfigError::invalid(
            "microphones.positions",
            "no microphone left after removing invalid channels",
        ));
    }
    Ok(())
}

/// One finite factor per recorded channel.
pub fn validate_calibration(factors: &[f64], recorded: usize) -> Result<(), ConfigError> {
    if factors.len() != recorded {
        return Err(ConfigError::invalid(
            "calibration.factors",
            format!("{} factors for {recorded} microphones", factors.len()),
        ));
    }
    if let Some(f) = factors.iter().find(|f| !f.is_finite()) {
        return Err(ConfigError::invalid("calibration.factors", format!("{f} is not finite")));
    }
    Ok(())
}
