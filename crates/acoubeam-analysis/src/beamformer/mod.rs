//! Frequency-domain beamforming.
//!
//! A [`Beamformer`] scans every point of a [`Grid`] with steering vectors
//! and evaluates one of four [`Algorithm`]s per frequency
//! line of a [`PowerSpectra`]:
//!
//! | Algorithm | Operand | Map |
//! |---|---|---|
//! | [`Algorithm::Base`] | cross-spectral matrix | `h / N^2` or `max(h, 0) / (N^2 - N)` |
//! | [`Algorithm::Capon`] | inverted cross-spectral matrix | `1 / h / N^2` |
//! | [`Algorithm::Eig`] | one eigenpair | as `Base` |
//! | [`Algorithm::Music`] | noise-subspace eigenvectors | `1 / h`, per-line max normalised, `* 4e-10` |
//!
//! Results are memoised under a digest of the microphone geometry, grid,
//! spectral digest, speed of sound and algorithm parameters, and persisted
//! to a [`DigestCache`] when one is attached. A result whose inputs changed
//! while it was being computed is discarded.

mod steer;

use crate::bands;
use crate::linalg;
use crate::spectra::PowerSpectra;
use acoubeam_core::{ArtifactKind, Digest, DigestCache, Grid, Memo, MicGeom, RectGrid, Slot};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use steer::{Steering, csm_power, projection_power};

/// Speed of sound in air at about 20 degrees Celsius, m/s.
pub const DEFAULT_SPEED_OF_SOUND: f64 = 343.0;

/// Beamforming algorithm and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Conventional delay-and-sum.
    Base {
        /// Exclude the auto-powers of the cross-spectral matrix.
        r_diag: bool,
    },
    /// Minimum variance (Capon).
    Capon,
    /// Delay-and-sum on a single eigenpair.
    Eig {
        /// Eigenpair index in ascending order; `-1` selects the largest.
        n: isize,
        /// Exclude the auto-powers.
        r_diag: bool,
    },
    /// MUSIC pseudo-spectrum.
    Music {
        /// Assumed number of sources.
        n: usize,
    },
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Base { r_diag: true }
    }
}

impl Algorithm {
    /// Artifact kind results are persisted under.
    pub fn kind(self) -> ArtifactKind {
        match self {
            Algorithm::Base { .. } => ArtifactKind::DelayAndSum,
            Algorithm::Capon => ArtifactKind::Capon,
            Algorithm::Eig { .. } => ArtifactKind::Eig,
            Algorithm::Music { .. } => ArtifactKind::Music,
        }
    }

    /// Short name.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Base { .. } => "base",
            Algorithm::Capon => "capon",
            Algorithm::Eig { .. } => "eig",
            Algorithm::Music { .. } => "music",
        }
    }

    /// Diagonal removal flag, for algorithms that have one.
    pub fn r_diag(self) -> Option<bool> {
        match self {
            Algorithm::Base { r_diag } | Algorithm::Eig { r_diag, .. } => Some(r_diag),
            Algorithm::Capon | Algorithm::Music { .. } => None,
        }
    }

    /// Eigenpair index or source count, for algorithms that have one.
    pub fn n(self) -> Option<isize> {
        match self {
            Algorithm::Eig { n, .. } => Some(n),
            Algorithm::Music { n } => Some(n as isize),
            Algorithm::Base { .. } | Algorithm::Capon => None,
        }
    }

    /// Saturate `n` to the range valid for `num_mics` microphones:
    /// `[-1, num_mics - 1]` for [`Eig`](Self::Eig), `[1, num_mics - 2]` for
    /// [`Music`](Self::Music).
    pub fn clamped(self, num_mics: usize) -> Self {
        match self {
            Algorithm::Eig { n, r_diag } => Algorithm::Eig {
                n: n.clamp(-1, num_mics as isize - 1),
                r_diag,
            },
            Algorithm::Music { n } => Algorithm::Music {
                n: n.clamp(1, num_mics.saturating_sub(2).max(1)),
            },
            other => other,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        if let Some(n) = self.n() {
            write!(f, " n={n}")?;
        }
        if let Some(r_diag) = self.r_diag() {
            write!(f, " r_diag={r_diag}")?;
        }
        Ok(())
    }
}

/// Beamforming result: one map of `shape` per frequency line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerMap {
    shape: Vec<usize>,
    frequencies: Vec<f64>,
    #[serde(with = "crate::serial::reals")]
    data: Vec<f64>,
}

impl PowerMap {
    /// Wrap `frequencies.len() * product(shape)` values, line by line.
    pub(crate) fn from_parts(shape: Vec<usize>, frequencies: Vec<f64>, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), frequencies.len() * shape.iter().product::<usize>());
        Self {
            shape,
            frequencies,
            data,
        }
    }

    /// Map shape of a single line.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Points per line.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Number of frequency lines.
    pub fn num_freqs(&self) -> usize {
        self.frequencies.len()
    }

    /// Frequency of each line in Hz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// All values, `num_freqs x size`, flattened.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The map of line `f`.
    pub fn line(&self, f: usize) -> &[f64] {
        let size = self.size();
        &self.data[f * size..(f + 1) * size]
    }

    /// Flat index and value of the largest finite entry of line `f`.
    pub fn peak(&self, f: usize) -> Option<(usize, f64)> {
        peak(self.line(f))
    }

    /// Band-reduced map around `freq`; see [`bands::synthesize`].
    pub fn synthetic(&self, freq: f64, num: u32) -> Vec<f64> {
        bands::synthesize(&self.frequencies, &self.data, self.size(), freq, num)
    }
}

/// Flat index and value of the largest finite entry.
pub fn peak(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Lazily evaluated beamforming map over a grid.
///
/// ```rust,no_run
/// use acoubeam_analysis::{Algorithm, Beamformer, PowerSpectra};
/// use acoubeam_core::{MicGeom, RectGrid, SampleStore};
/// use std::sync::Arc;
///
/// let store = SampleStore::new(51200.0, 2, vec![0.0; 2 * 4096]);
/// let spectra = Arc::new(PowerSpectra::new(store).with_block_size(128));
/// let mics = MicGeom::new(vec![[-0.1, 0.0, 0.0], [0.1, 0.0, 0.0]]);
/// let bf: Beamformer = Beamformer::new(spectra, RectGrid::default(), mics)
///     .with_algorithm(Algorithm::Base { r_diag: false });
/// if let Some(map) = bf.result() {
///     println!("{} lines", map.num_freqs());
/// }
/// ```
#[derive(Debug)]
pub struct Beamformer<G: Grid = RectGrid> {
    freq_data: Arc<PowerSpectra>,
    grid: Slot<G>,
    mics: Slot<MicGeom>,
    algorithm: Algorithm,
    c: f64,
    cache: Option<Arc<DigestCache>>,
    result: Memo<PowerMap>,
    computations: AtomicUsize,
}

impl<G: Grid> Beamformer<G> {
    /// Delay-and-sum with diagonal removal at 343 m/s.
    pub fn new(
        freq_data: Arc<PowerSpectra>,
        grid: impl Into<Slot<G>>,
        mics: impl Into<Slot<MicGeom>>,
    ) -> Self {
        Self {
            freq_data,
            grid: grid.into(),
            mics: mics.into(),
            algorithm: Algorithm::default(),
            c: DEFAULT_SPEED_OF_SOUND,
            cache: None,
            result: Memo::new(),
            computations: AtomicUsize::new(0),
        }
    }

    /// Select the algorithm; see [`set_algorithm`](Self::set_algorithm).
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.set_algorithm(algorithm);
        self
    }

    /// Set the speed of sound in m/s.
    pub fn with_speed_of_sound(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Persist results in `cache`.
    pub fn with_cache(mut self, cache: Arc<DigestCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Select the algorithm, saturating `n` to the current microphone count.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        let clamped = algorithm.clamped(self.mics.get().num_mics());
        if clamped != algorithm {
            tracing::debug!(requested = %algorithm, used = %clamped, "parameter saturated");
        }
        self.algorithm = clamped;
    }

    /// Change `n` of an [`Eig`](Algorithm::Eig) or [`Music`](Algorithm::Music)
    /// beamformer, saturating to the valid range. No effect otherwise.
    pub fn set_n(&mut self, n: isize) {
        let algorithm = match self.algorithm {
            Algorithm::Eig { r_diag, .. } => Algorithm::Eig { n, r_diag },
            Algorithm::Music { .. } => Algorithm::Music {
                n: n.max(0) as usize,
            },
            other => other,
        };
        self.set_algorithm(algorithm);
    }

    /// Change the speed of sound.
    pub fn set_speed_of_sound(&mut self, c: f64) {
        self.c = c;
    }

    /// Current algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Speed of sound in m/s.
    pub fn speed_of_sound(&self) -> f64 {
        self.c
    }

    /// Spectra being beamformed.
    pub fn freq_data(&self) -> &Arc<PowerSpectra> {
        &self.freq_data
    }

    /// Handle to the grid.
    pub fn grid(&self) -> &Slot<G> {
        &self.grid
    }

    /// Handle to the microphone geometry.
    pub fn mics(&self) -> &Slot<MicGeom> {
        &self.mics
    }

    /// How many maps this instance has actually computed (cache and memo
    /// hits excluded).
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Fingerprint of the current inputs.
    pub fn digest(&self) -> Digest {
        self.digest_for(&self.freq_data.digest(), &self.mics.get(), &*self.grid.get())
    }

    fn digest_for(&self, spectral: &Digest, mics: &MicGeom, grid: &G) -> Digest {
        let builder = Digest::builder()
            .str("beamformer")
            .str(self.algorithm.name())
            .digest(mics.digest())
            .digest(&grid.digest())
            .digest(spectral)
            .f64(self.c);
        match self.algorithm {
            Algorithm::Base { r_diag } => builder.bool(r_diag),
            Algorithm::Capon => builder,
            Algorithm::Eig { n, r_diag } => builder.i64(n as i64).bool(r_diag),
            Algorithm::Music { n } => builder.usize(n),
        }
        .finish()
    }

    /// The power map, computed or loaded on first access.
    ///
    /// `None` when the microphone count does not match the channel count of
    /// the spectra, or when an input was replaced while the map was being
    /// computed (the next call computes against the new inputs).
    pub fn result(&self) -> Option<Arc<PowerMap>> {
        let mics = self.mics.get();
        let grid = self.grid.get();
        let num_channels = self.freq_data.time_data().get().num_channels();
        if num_channels != mics.num_mics() {
            tracing::warn!(
                num_channels,
                num_mics = mics.num_mics(),
                "channel counts of time data and microphone geometry do not fit"
            );
            return None;
        }

        let digest = self.digest_for(&self.freq_data.digest(), &mics, &grid);
        if let Some(map) = self.result.get(&digest) {
            return Some(map);
        }
        if let Some(map) = self.load(&digest) {
            let map = Arc::new(map);
            self.result.set(digest, Arc::clone(&map));
            return Some(map);
        }

        let map = self.compute(&mics, &*grid);
        self.publish(digest, map)
    }

    /// Band-reduced result around `freq`; [`bands::FALLBACK`] when there is
    /// no result.
    pub fn synthetic(&self, freq: f64, num: u32) -> Vec<f64> {
        match self.result() {
            Some(map) => map.synthetic(freq, num),
            None => bands::FALLBACK.to_vec(),
        }
    }

    fn load(&self, digest: &Digest) -> Option<PowerMap> {
        let cache = self.cache.as_ref()?;
        let kind = self.algorithm.kind();
        match cache.lookup(kind, digest) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(kind = kind.name(), error = %e, "cache lookup failed, recomputing");
                None
            }
        }
    }

    /// Keep `map` unless the inputs moved on since `digest` was taken.
    fn publish(&self, digest: Digest, map: PowerMap) -> Option<Arc<PowerMap>> {
        let kind = self.algorithm.kind();
        if self.digest() != digest {
            tracing::warn!(kind = kind.name(), "inputs changed during computation, result discarded");
            return None;
        }
        if let Some(cache) = &self.cache
            && let Err(e) = cache.store(kind, &digest, &map)
        {
            tracing::warn!(kind = kind.name(), error = %e, "failed to persist result");
        }
        let map = Arc::new(map);
        self.result.set(digest, Arc::clone(&map));
        Some(map)
    }

    fn compute(&self, mics: &MicGeom, grid: &G) -> PowerMap {
        self.computations.fetch_add(1, Ordering::Relaxed);
        let points = grid.positions();
        let steering = Steering::new(&points, mics.positions());
        let n = mics.num_mics();
        let n2 = (n * n) as f64;
        tracing::debug!(
            algorithm = %self.algorithm,
            num_points = points.len(),
            num_mics = n,
            "beamforming"
        );

        let (frequencies, data) = match self.algorithm {
            Algorithm::Base { r_diag } => {
                let csm = self.freq_data.csm();
                let ks = wavenumbers(csm.frequencies(), self.c);
                let h = scan(&steering, &ks, n, |f, e| csm_power(e, csm.slice(f), r_diag));
                (csm.frequencies().to_vec(), normalize(h, n, r_diag))
            }
            Algorithm::Capon => {
                let csm = self.freq_data.csm();
                tracing::debug!(num_freqs = csm.num_freqs(), "inverting cross-spectral matrices");
                let inverted: Vec<Vec<Complex64>> = (0..csm.num_freqs())
                    .map(|f| linalg::invert(csm.slice(f), n))
                    .collect();
                let ks = wavenumbers(csm.frequencies(), self.c);
                let h = scan(&steering, &ks, n, |f, e| csm_power(e, &inverted[f], false));
                let data: Vec<f64> = h.into_iter().map(|h| 1.0 / h / n2).collect();
                (csm.frequencies().to_vec(), data)
            }
            Algorithm::Eig { n: selected, r_diag } => {
                let eig = self.freq_data.eigen();
                let k = usize::try_from(selected)
                    .ok()
                    .filter(|&k| k < n)
                    .unwrap_or(n.saturating_sub(1));
                let ks = wavenumbers(eig.frequencies(), self.c);
                let h = scan(&steering, &ks, n, |f, e| {
                    eig.eigenvalues(f)[k] * projection_power(e, eig.eigenvectors(f), k, r_diag)
                });
                (eig.frequencies().to_vec(), normalize(h, n, r_diag))
            }
            Algorithm::Music { n: sources } => {
                let eig = self.freq_data.eigen();
                let noise = n.saturating_sub(sources);
                let ks = wavenumbers(eig.frequencies(), self.c);
                let h = scan(&steering, &ks, n, |f, e| {
                    let vectors = eig.eigenvectors(f);
                    (0..noise).map(|k| projection_power(e, vectors, k, false)).sum()
                });
                let mut data: Vec<f64> = h.into_iter().map(|h| 1.0 / h).collect();
                let size = steering.num_points();
                if size > 0 {
                    for line in data.chunks_mut(size) {
                        let max = line.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        for v in line.iter_mut() {
                            *v = *v / max * bands::REFERENCE_POWER;
                        }
                    }
                }
                (eig.frequencies().to_vec(), data)
            }
        };
        PowerMap::from_parts(grid.shape(), frequencies, data)
    }
}

fn wavenumbers(frequencies: &[f64], c: f64) -> Vec<f64> {
    frequencies.iter().map(|f| 2.0 * PI * f / c).collect()
}

/// Evaluate `power(line, steering_vector)` for every line and grid point.
fn scan(
    steering: &Steering,
    wavenumbers: &[f64],
    num_mics: usize,
    mut power: impl FnMut(usize, &[Complex64]) -> f64,
) -> Vec<f64> {
    let size = steering.num_points();
    let mut h = Vec::with_capacity(wavenumbers.len() * size);
    let mut e = vec![Complex64::new(0.0, 0.0); num_mics];
    for (f, &k) in wavenumbers.iter().enumerate() {
        for g in 0..size {
            steering.vector_into(g, k, &mut e);
            h.push(power(f, &e));
        }
    }
    h
}

/// Divide by the number of summed pairs; with diagonal removal negative
/// power is floored to zero.
fn normalize(h: Vec<f64>, num_mics: usize, r_diag: bool) -> Vec<f64> {
    let n = num_mics as f64;
    if r_diag {
        let pairs = n * n - n;
        h.into_iter().map(|h| (h / pairs).max(0.0)).collect()
    } else {
        let pairs = n * n;
        h.into_iter().map(|h| h / pairs).collect()
    }
}
