//! Cross-spectral matrix estimation and its eigen-decomposition.
//!
//! [`PowerSpectra`] averages windowed, overlapping FFT blocks of every
//! channel pair (Welch's method applied to the full channel-by-channel
//! matrix):
//!
//! ```text
//! C[f] = 2 / (B * W * K) * sum_k conj(X_k[f]) (x) X_k[f]
//! ```
//!
//! where `B` is the block size, `W = dot(w, w)` the window energy, `K` the
//! number of averaged blocks and `X_k[f]` the vector of channel spectra of
//! block `k`. The factor 2 accounts for the discarded negative-frequency
//! half of the real FFT.
//!
//! Results are memoised in memory and, when a [`DigestCache`] is attached,
//! persisted under the digest of the sample store, calibration and FFT
//! parameters. The cross-spectral matrix and the eigen-decomposition are
//! both computed lazily on first access.

use crate::bands;
use crate::fft::{Fft, Window, rfft_frequencies};
use crate::linalg;
use acoubeam_core::{ArtifactKind, Calibration, Digest, DigestCache, Memo, SampleStore, Slot};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

/// FFT block length; one of 128, 256, 512, 1024, 2048 or 4096.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct BlockSize(usize);

impl BlockSize {
    /// Accepted block lengths.
    pub const ALLOWED: [usize; 6] = [128, 256, 512, 1024, 2048, 4096];

    /// Validate a block length.
    pub fn new(size: usize) -> Option<Self> {
        Self::ALLOWED.contains(&size).then_some(Self(size))
    }

    /// Block length in samples.
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self(1024)
    }
}

impl TryFrom<usize> for BlockSize {
    type Error = String;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size).ok_or_else(|| {
            format!("block size {size} not one of {:?}", Self::ALLOWED)
        })
    }
}

impl From<BlockSize> for usize {
    fn from(size: BlockSize) -> Self {
        size.0
    }
}

/// Overlap between consecutive FFT blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Overlap {
    /// Blocks do not overlap
    #[default]
    #[serde(rename = "none", alias = "None", alias = "0%")]
    None,
    /// 50 % overlap
    #[serde(rename = "50%")]
    Half,
    /// 75 % overlap
    #[serde(rename = "75%")]
    ThreeQuarters,
    /// 87.5 % overlap
    #[serde(rename = "87.5%")]
    SevenEighths,
}

impl Overlap {
    /// Every overlap setting.
    pub const ALL: [Overlap; 4] = [
        Overlap::None,
        Overlap::Half,
        Overlap::ThreeQuarters,
        Overlap::SevenEighths,
    ];

    /// Blocks per block length; the averaging stride is `block_size / factor`.
    pub fn factor(self) -> usize {
        match self {
            Overlap::None => 1,
            Overlap::Half => 2,
            Overlap::ThreeQuarters => 4,
            Overlap::SevenEighths => 8,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Overlap::None => "none",
            Overlap::Half => "50%",
            Overlap::ThreeQuarters => "75%",
            Overlap::SevenEighths => "87.5%",
        }
    }
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Overlap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_end_matches('%') {
            "none" | "0" => Ok(Overlap::None),
            "50" => Ok(Overlap::Half),
            "75" => Ok(Overlap::ThreeQuarters),
            "87.5" => Ok(Overlap::SevenEighths),
            _ => Err(format!("unknown overlap '{s}'")),
        }
    }
}

/// Number of averaged blocks: `factor * floor(n / block) - factor + 1`,
/// never negative.
pub fn block_count(num_samples: usize, block_size: usize, overlap: Overlap) -> usize {
    if block_size == 0 {
        return 0;
    }
    let factor = overlap.factor() as i64;
    let blocks = factor * (num_samples / block_size) as i64 - factor + 1;
    blocks.max(0) as usize
}

/// Range selected by slicing `len` items with `[low:high]`.
///
/// `high` follows slice conventions: negative values count from the end,
/// so `-1` stops before the last item.
pub fn line_range(len: usize, low: usize, high: isize) -> Range<usize> {
    let stop = if high < 0 {
        (len as isize + high).max(0) as usize
    } else {
        (high as usize).min(len)
    };
    let start = low.min(stop);
    start..stop
}

/// Cross-spectral matrix: one Hermitian `n x n` slice per frequency line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSpectralMatrix {
    num_channels: usize,
    frequencies: Vec<f64>,
    #[serde(with = "crate::serial::complexes")]
    data: Vec<Complex64>,
}

impl CrossSpectralMatrix {
    /// Matrix with zero frequency lines.
    pub fn empty(num_channels: usize) -> Self {
        Self {
            num_channels,
            frequencies: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Wrap precomputed data (`frequencies.len() * n * n` entries).
    pub(crate) fn from_parts(num_channels: usize, frequencies: Vec<f64>, data: Vec<Complex64>) -> Self {
        debug_assert_eq!(data.len(), frequencies.len() * num_channels * num_channels);
        Self {
            num_channels,
            frequencies,
            data,
        }
    }

    /// Channels of the source data.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of frequency lines.
    pub fn num_freqs(&self) -> usize {
        self.frequencies.len()
    }

    /// Whether there are no frequency lines.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency of each line in Hz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Row-major `n x n` slice of frequency line `f`.
    pub fn slice(&self, f: usize) -> &[Complex64] {
        let n2 = self.num_channels * self.num_channels;
        &self.data[f * n2..(f + 1) * n2]
    }
}

/// Eigenvalues (ascending) and eigenvectors of every CSM slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenDecomposition {
    num_channels: usize,
    frequencies: Vec<f64>,
    #[serde(with = "crate::serial::reals")]
    eigenvalues: Vec<f64>,
    #[serde(with = "crate::serial::complexes")]
    eigenvectors: Vec<Complex64>,
}

impl EigenDecomposition {
    /// Decompose every slice of `csm`. An empty matrix yields an empty
    /// decomposition without invoking the solver.
    pub fn of(csm: &CrossSpectralMatrix) -> Self {
        let n = csm.num_channels();
        let mut eigenvalues = Vec::with_capacity(csm.num_freqs() * n);
        let mut eigenvectors = Vec::with_capacity(csm.num_freqs() * n * n);
        for f in 0..csm.num_freqs() {
            let (vals, vecs) = linalg::hermitian_eigen(csm.slice(f), n);
            eigenvalues.extend(vals);
            eigenvectors.extend(vecs);
        }
        Self {
            num_channels: n,
            frequencies: csm.frequencies().to_vec(),
            eigenvalues,
            eigenvectors,
        }
    }

    /// Channels of the source data.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of frequency lines.
    pub fn num_freqs(&self) -> usize {
        self.frequencies.len()
    }

    /// Frequency of each line in Hz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Eigenvalues of line `f`, ascending.
    pub fn eigenvalues(&self, f: usize) -> &[f64] {
        &self.eigenvalues[f * self.num_channels..(f + 1) * self.num_channels]
    }

    /// All eigenvalues, `num_freqs x num_channels`, flattened.
    pub fn all_eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Eigenvectors of line `f` as columns of a row-major `n x n` matrix.
    pub fn eigenvectors(&self, f: usize) -> &[Complex64] {
        let n2 = self.num_channels * self.num_channels;
        &self.eigenvectors[f * n2..(f + 1) * n2]
    }

    /// Column `k` of line `f`.
    pub fn eigenvector(&self, f: usize, k: usize) -> Vec<Complex64> {
        let n = self.num_channels;
        let vecs = self.eigenvectors(f);
        (0..n).map(|i| vecs[i * n + k]).collect()
    }
}

/// Lazily evaluated cross-spectral matrix of a sample store.
///
/// ```rust,no_run
/// use acoubeam_analysis::{Overlap, PowerSpectra, Window};
/// use acoubeam_core::SampleStore;
///
/// let store = SampleStore::new(51200.0, 2, vec![0.0; 2 * 4096]);
/// let spectra = PowerSpectra::new(store)
///     .with_block_size(256)
///     .with_window(Window::Hanning)
///     .with_overlap(Overlap::ThreeQuarters);
/// let csm = spectra.csm();
/// println!("{} lines of {} channels", csm.num_freqs(), csm.num_channels());
/// ```
#[derive(Debug)]
pub struct PowerSpectra {
    time_data: Slot<SampleStore>,
    calib: Option<Slot<Calibration>>,
    block_size: BlockSize,
    window: Window,
    overlap: Overlap,
    ind_low: usize,
    ind_high: isize,
    cache: Option<Arc<DigestCache>>,
    csm: Memo<CrossSpectralMatrix>,
    eigen: Memo<EigenDecomposition>,
}

impl PowerSpectra {
    /// Spectra of `time_data` with default parameters (1024 samples,
    /// rectangular window, no overlap, lines `[0:-1]`).
    pub fn new(time_data: impl Into<Slot<SampleStore>>) -> Self {
        Self {
            time_data: time_data.into(),
            calib: None,
            block_size: BlockSize::default(),
            window: Window::default(),
            overlap: Overlap::default(),
            ind_low: 0,
            ind_high: -1,
            cache: None,
            csm: Memo::new(),
            eigen: Memo::new(),
        }
    }

    /// Attach calibration data.
    pub fn with_calibration(mut self, calib: impl Into<Slot<Calibration>>) -> Self {
        self.calib = Some(calib.into());
        self
    }

    /// Set the block size. Values outside [`BlockSize::ALLOWED`] are
    /// ignored with a warning.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.set_block_size(block_size);
        self
    }

    /// Set the window function.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Set the block overlap.
    pub fn with_overlap(mut self, overlap: Overlap) -> Self {
        self.overlap = overlap;
        self
    }

    /// Restrict to frequency lines `[ind_low:ind_high]`.
    pub fn with_lines(mut self, ind_low: usize, ind_high: isize) -> Self {
        self.ind_low = ind_low;
        self.ind_high = ind_high;
        self
    }

    /// Persist results in `cache`.
    pub fn with_cache(mut self, cache: Arc<DigestCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Change the block size; invalid sizes are ignored with a warning.
    pub fn set_block_size(&mut self, block_size: usize) {
        match BlockSize::new(block_size) {
            Some(bs) => self.block_size = bs,
            None => tracing::warn!(
                block_size,
                allowed = ?BlockSize::ALLOWED,
                "unsupported block size ignored"
            ),
        }
    }

    /// Change the window function.
    pub fn set_window(&mut self, window: Window) {
        self.window = window;
    }

    /// Change the block overlap.
    pub fn set_overlap(&mut self, overlap: Overlap) {
        self.overlap = overlap;
    }

    /// Change the frequency line selection.
    pub fn set_lines(&mut self, ind_low: usize, ind_high: isize) {
        self.ind_low = ind_low;
        self.ind_high = ind_high;
    }

    /// Replace (or remove) the calibration.
    pub fn set_calibration(&mut self, calib: Option<Slot<Calibration>>) {
        self.calib = calib;
    }

    /// Handle to the sample store; replacing through it invalidates results.
    pub fn time_data(&self) -> &Slot<SampleStore> {
        &self.time_data
    }

    /// Block size in samples.
    pub fn block_size(&self) -> usize {
        self.block_size.get()
    }

    /// Window function.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Block overlap.
    pub fn overlap(&self) -> Overlap {
        self.overlap
    }

    /// `(ind_low, ind_high)` line selection.
    pub fn lines(&self) -> (usize, isize) {
        (self.ind_low, self.ind_high)
    }

    /// Attached cache, if any.
    pub fn cache(&self) -> Option<&Arc<DigestCache>> {
        self.cache.as_ref()
    }

    /// Number of blocks averaged for the current sample store.
    pub fn num_blocks(&self) -> usize {
        block_count(
            self.time_data.get().num_samples(),
            self.block_size.get(),
            self.overlap,
        )
    }

    /// Frequency axis of the selected lines; empty for a non-positive
    /// sample rate.
    pub fn fftfreq(&self) -> Vec<f64> {
        self.frequencies_for(&self.time_data.get())
    }

    /// First and last analysed frequency.
    pub fn freq_range(&self) -> Option<(f64, f64)> {
        let f = self.fftfreq();
        Some((*f.first()?, *f.last()?))
    }

    fn frequencies_for(&self, td: &SampleStore) -> Vec<f64> {
        if td.sample_rate() <= 0.0 {
            return Vec::new();
        }
        let all = rfft_frequencies(self.block_size.get(), td.sample_rate());
        let range = line_range(all.len(), self.ind_low, self.ind_high);
        all[range].to_vec()
    }

    /// Fingerprint of everything the cross-spectral matrix depends on.
    pub fn digest(&self) -> Digest {
        let calib = self.calib.as_ref().map(Slot::get);
        self.digest_for(&self.time_data.get(), calib.as_deref())
    }

    fn digest_for(&self, td: &SampleStore, calib: Option<&Calibration>) -> Digest {
        Digest::builder()
            .str("csm")
            .digest(td.digest())
            .maybe_digest(calib.map(Calibration::digest))
            .usize(self.block_size.get())
            .str(self.window.name())
            .usize(self.overlap.factor())
            .usize(self.ind_low)
            .i64(self.ind_high as i64)
            .finish()
    }

    /// The cross-spectral matrix, computed or loaded on first access.
    pub fn csm(&self) -> Arc<CrossSpectralMatrix> {
        self.csm_with_digest().1
    }

    /// The cross-spectral matrix together with the digest it belongs to.
    pub fn csm_with_digest(&self) -> (Digest, Arc<CrossSpectralMatrix>) {
        let td = self.time_data.get();
        let calib = self.calib.as_ref().map(Slot::get);
        let digest = self.digest_for(&td, calib.as_deref());
        if let Some(csm) = self.csm.get(&digest) {
            return (digest, csm);
        }

        let block_count = block_count(td.num_samples(), self.block_size.get(), self.overlap);
        if block_count == 0 || td.sample_rate() <= 0.0 || td.num_channels() == 0 {
            tracing::debug!(
                num_samples = td.num_samples(),
                num_channels = td.num_channels(),
                "no complete block, cross-spectral matrix is empty"
            );
            let csm = Arc::new(CrossSpectralMatrix::empty(td.num_channels()));
            self.csm.set(digest.clone(), Arc::clone(&csm));
            return (digest, csm);
        }

        if let Some(csm) = self.load(ArtifactKind::Csm, &digest) {
            let csm = Arc::new(csm);
            self.csm.set(digest.clone(), Arc::clone(&csm));
            return (digest, csm);
        }

        let csm = Arc::new(self.compute_csm(&td, calib.as_deref(), block_count));
        self.publish(ArtifactKind::Csm, &self.csm, digest.clone(), &csm);
        (digest, csm)
    }

    /// Eigen-decomposition of the cross-spectral matrix.
    pub fn eigen(&self) -> Arc<EigenDecomposition> {
        self.eigen_with_digest().1
    }

    /// Eigen-decomposition together with its (cross-spectral) digest.
    pub fn eigen_with_digest(&self) -> (Digest, Arc<EigenDecomposition>) {
        let (digest, csm) = self.csm_with_digest();
        if let Some(eig) = self.eigen.get(&digest) {
            return (digest, eig);
        }
        if csm.is_empty() {
            let eig = Arc::new(EigenDecomposition::of(&csm));
            self.eigen.set(digest.clone(), Arc::clone(&eig));
            return (digest, eig);
        }
        if let Some(eig) = self.load(ArtifactKind::Eigen, &digest) {
            let eig = Arc::new(eig);
            self.eigen.set(digest.clone(), Arc::clone(&eig));
            return (digest, eig);
        }

        tracing::debug!(
            num_freqs = csm.num_freqs(),
            num_channels = csm.num_channels(),
            "eigen-decomposition"
        );
        let eig = Arc::new(EigenDecomposition::of(&csm));
        self.publish(ArtifactKind::Eigen, &self.eigen, digest.clone(), &eig);
        (digest, eig)
    }

    /// Band-synthesised eigenvalues around `freq`; see [`bands::synthesize`].
    pub fn synthetic_ev(&self, freq: f64, num: u32) -> Vec<f64> {
        let eig = self.eigen();
        bands::synthesize(
            eig.frequencies(),
            eig.all_eigenvalues(),
            eig.num_channels(),
            freq,
            num,
        )
    }

    fn load<T: serde::de::DeserializeOwned>(&self, kind: ArtifactKind, digest: &Digest) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.lookup(kind, digest) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(kind = kind.name(), error = %e, "cache lookup failed, recomputing");
                None
            }
        }
    }

    /// Remember and persist a fresh result unless the inputs moved on while
    /// it was being computed.
    fn publish<T: Serialize>(&self, kind: ArtifactKind, memo: &Memo<T>, digest: Digest, value: &Arc<T>) {
        if self.digest() != digest {
            tracing::warn!(kind = kind.name(), "inputs changed during computation, result discarded");
            return;
        }
        if let Some(cache) = &self.cache
            && let Err(e) = cache.store(kind, &digest, value.as_ref())
        {
            tracing::warn!(kind = kind.name(), error = %e, "failed to persist result");
        }
        memo.set(digest, Arc::clone(value));
    }

    fn compute_csm(
        &self,
        td: &SampleStore,
        calib: Option<&Calibration>,
        num_blocks: usize,
    ) -> CrossSpectralMatrix {
        let nc = td.num_channels();
        let bs = self.block_size.get();
        let fft = Fft::new(bs);
        let range = line_range(fft.num_bins(), self.ind_low, self.ind_high);
        let frequencies = self.frequencies_for(td);
        let nf = range.len();
        debug_assert_eq!(nf, frequencies.len());

        let window = self.window.coefficients(bs);
        let weight = self.window.power(bs);
        let scale: Vec<f64> = calib
            .and_then(|c| c.factors_for(nc))
            .map(<[f64]>::to_vec)
            .unwrap_or_else(|| vec![1.0; nc]);

        tracing::debug!(num_blocks, block_size = bs, num_channels = nc, num_freqs = nf, "computing cross-spectral matrix");

        let zero = Complex64::new(0.0, 0.0);
        let samples = td.samples();
        let stride = bs / self.overlap.factor();
        let mut csm = vec![zero; nf * nc * nc];
        let mut block = vec![0.0; bs];
        let mut spectrum = Vec::with_capacity(bs);
        let mut spectra = vec![zero; nc * nf];

        for b in 0..num_blocks {
            let pos = b * stride;
            for ch in 0..nc {
                for (i, x) in block.iter_mut().enumerate() {
                    *x = f64::from(samples[(pos + i) * nc + ch]) * window[i] * scale[ch];
                }
                fft.forward_into(&block, &mut spectrum);
                spectra[ch * nf..(ch + 1) * nf].copy_from_slice(&spectrum[range.clone()]);
            }
            // rank-1 update per line
            for f in 0..nf {
                let slice = &mut csm[f * nc * nc..(f + 1) * nc * nc];
                for i in 0..nc {
                    let xi = spectra[i * nf + f].conj();
                    for j in 0..nc {
                        slice[i * nc + j] += xi * spectra[j * nf + f];
                    }
                }
            }
        }

        let norm = 2.0 / (bs as f64 * weight * num_blocks as f64);
        for z in &mut csm {
            *z *= norm;
        }
        CrossSpectralMatrix::from_parts(nc, frequencies, csm)
    }
}
