//! Study file format and pipeline construction.

use acoubeam_analysis::{Algorithm, Beamformer, DEFAULT_SPEED_OF_SOUND, Overlap, PowerSpectra, Window};
use acoubeam_core::{Calibration, MicGeom, RectGrid, SampleStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::paths;

/// Measurement selection: which file, which samples, which channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeDataConfig {
    /// Multichannel WAV file, relative to the study file.
    pub path: PathBuf,

    /// First sample used.
    #[serde(default)]
    pub start: usize,

    /// End sample (exclusive); the whole file when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<usize>,

    /// Channels excluded from the analysis.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_channels: Vec<usize>,
}

/// Per-channel calibration factors for every recorded channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationConfig {
    /// One factor per recorded channel, including invalid ones.
    pub factors: Vec<f64>,
}

/// Microphone positions for every recorded channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MicrophonesConfig {
    /// `[x, y, z]` in metres, one per recorded channel.
    pub positions: Vec<[f64; 3]>,
}

/// Rectangular focus grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Minimum x.
    pub x_min: f64,
    /// Maximum x.
    pub x_max: f64,
    /// Minimum y.
    pub y_min: f64,
    /// Maximum y.
    pub y_max: f64,
    /// Plane distance.
    pub z: f64,
    /// Step in x and y.
    pub increment: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        let g = RectGrid::default();
        Self {
            x_min: g.x_min,
            x_max: g.x_max,
            y_min: g.y_min,
            y_max: g.y_max,
            z: g.z,
            increment: g.increment,
        }
    }
}

/// Cross-spectral matrix estimation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectraConfig {
    /// FFT block length.
    pub block_size: usize,
    /// Window applied to each block.
    pub window: Window,
    /// Overlap between blocks.
    pub overlap: Overlap,
    /// First frequency line.
    pub ind_low: usize,
    /// End frequency line, slice semantics (`-1` drops the last line).
    pub ind_high: isize,
}

impl Default for SpectraConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            window: Window::default(),
            overlap: Overlap::default(),
            ind_low: 0,
            ind_high: -1,
        }
    }
}

/// Beamforming algorithm name in study files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    /// Delay-and-sum
    #[default]
    Base,
    /// Capon
    Capon,
    /// Single eigenpair
    Eig,
    /// MUSIC
    Music,
}

/// Beamformer settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BeamformerConfig {
    /// Kernel.
    pub algorithm: AlgorithmKind,
    /// Speed of sound in m/s.
    pub c: f64,
    /// Remove the auto-powers (`base` and `eig`).
    pub r_diag: bool,
    /// Eigenpair index (`eig`) or source count (`music`).
    pub n: isize,
}

impl Default for BeamformerConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::Base,
            c: DEFAULT_SPEED_OF_SOUND,
            r_diag: true,
            n: -1,
        }
    }
}

/// Result cache location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory, relative to the study file; the platform cache
    /// directory when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// A beamforming study: measurement, array, grid and processing settings.
///
/// # TOML Format
///
/// ```toml
/// [time_data]
/// path = "measurement.wav"
/// stop = 16000
/// invalid_channels = [1, 7]
///
/// [microphones]
/// positions = [[-0.1, 0.0, 0.0], [0.1, 0.0, 0.0]]
///
/// [grid]
/// x_min = -0.6
/// x_max = 0.0
/// y_min = -0.3
/// y_max = 0.3
/// z = 0.68
/// increment = 0.05
///
/// [spectra]
/// block_size = 128
/// window = "hanning"
/// overlap = "50%"
/// ind_low = 7
/// ind_high = 15
///
/// [beamformer]
/// algorithm = "base"
/// c = 346.04
/// r_diag = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Study {
    /// Measurement selection.
    pub time_data: TimeDataConfig,

    /// Optional calibration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationConfig>,

    /// Array geometry.
    pub microphones: MicrophonesConfig,

    /// Focus grid.
    #[serde(default)]
    pub grid: GridConfig,

    /// Spectral estimation.
    #[serde(default)]
    pub spectra: SpectraConfig,

    /// Beamformer.
    #[serde(default)]
    pub beamformer: BeamformerConfig,

    /// Cache location.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Study {
    /// Study of `path` recorded by microphones at `positions`, with default
    /// processing settings.
    pub fn new(path: impl Into<PathBuf>, positions: Vec<[f64; 3]>) -> Self {
        Self {
            time_data: TimeDataConfig {
                path: path.into(),
                start: 0,
                stop: None,
                invalid_channels: Vec::new(),
            },
            calibration: None,
            microphones: MicrophonesConfig { positions },
            grid: GridConfig::default(),
            spectra: SpectraConfig::default(),
            beamformer: BeamformerConfig::default(),
            cache: CacheConfig::default(),
            base_dir: None,
        }
    }

    /// Resolve relative paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Load a study from a TOML file; relative paths resolve against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let mut study = Self::from_toml(&content)?;
        study.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), "loaded study");
        Ok(study)
    }

    /// Parse a study from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the study to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the study to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            paths::ensure_dir(parent)?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Check every value the processing chain restricts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::validation::validate_study(self)
    }

    /// `path` made absolute against the study directory when relative.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Location of the measurement file.
    pub fn time_data_path(&self) -> PathBuf {
        self.resolve(&self.time_data.path)
    }

    /// Cache directory of this study.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache.dir {
            Some(dir) => self.resolve(dir),
            None => paths::default_cache_dir(),
        }
    }

    /// Microphones of the valid channels.
    pub fn mics(&self) -> MicGeom {
        MicGeom::new(self.microphones.positions.clone()).without_channels(&self.time_data.invalid_channels)
    }

    /// Calibration of the valid channels, if any.
    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration
            .as_ref()
            .map(|c| Calibration::new(c.factors.clone()).without_channels(&self.time_data.invalid_channels))
    }

    /// Focus grid.
    pub fn grid(&self) -> RectGrid {
        let g = &self.grid;
        RectGrid::new(g.x_min, g.x_max, g.y_min, g.y_max, g.z, g.increment)
    }

    /// Beamforming algorithm with its parameters.
    pub fn algorithm(&self) -> Algorithm {
        let b = &self.beamformer;
        match b.algorithm {
            AlgorithmKind::Base => Algorithm::Base { r_diag: b.r_diag },
            AlgorithmKind::Capon => Algorithm::Capon,
            AlgorithmKind::Eig => Algorithm::Eig { n: b.n, r_diag: b.r_diag },
            AlgorithmKind::Music => Algorithm::Music { n: b.n.max(1) as usize },
        }
    }

    /// Apply the sample range and channel selection to a loaded recording.
    pub fn select(&self, store: &SampleStore) -> SampleStore {
        let t = &self.time_data;
        store.masked(t.start, t.stop, &t.invalid_channels)
    }

    /// Spectral estimator over the selected part of `store`.
    pub fn spectra(&self, store: &SampleStore) -> PowerSpectra {
        let s = &self.spectra;
        let spectra = PowerSpectra::new(self.select(store))
            .with_block_size(s.block_size)
            .with_window(s.window)
            .with_overlap(s.overlap)
            .with_lines(s.ind_low, s.ind_high);
        match self.calibration() {
            Some(calib) => spectra.with_calibration(calib),
            None => spectra,
        }
    }

    /// Beamformer over `spectra` with this study's grid, array and kernel.
    pub fn beamformer(&self, spectra: Arc<PowerSpectra>) -> Beamformer {
        Beamformer::new(spectra, self.grid(), self.mics())
            .with_algorithm(self.algorithm())
            .with_speed_of_sound(self.beamformer.c)
    }
}
