//! Steering vectors and the quadratic forms every kernel evaluates.
//!
//! For focus point `x`, microphone `i` and wavenumber `k = 2 pi f / c` the
//! steering weight is
//!
//! ```text
//! e_i = exp(-j k (|x - m_i| - |x|))
//! ```
//!
//! i.e. the propagation delay to microphone `i` relative to the array
//! origin. A cross-spectral matrix is scanned with `Re(e^T C conj(e))`.

use acoubeam_core::geometry::distance;
use num_complex::Complex64;

/// Relative propagation distances of every focus point.
pub(crate) struct Steering {
    num_points: usize,
    num_mics: usize,
    /// `size x num_mics` row-major `|x - m_i| - |x|`.
    offsets: Vec<f64>,
}

impl Steering {
    pub(crate) fn new(points: &[[f64; 3]], mics: &[[f64; 3]]) -> Self {
        let origin = [0.0; 3];
        let mut offsets = Vec::with_capacity(points.len() * mics.len());
        for p in points {
            let r0 = distance(p, &origin);
            offsets.extend(mics.iter().map(|m| distance(p, m) - r0));
        }
        Self {
            num_points: points.len(),
            num_mics: mics.len(),
            offsets,
        }
    }

    pub(crate) fn num_points(&self) -> usize {
        self.num_points
    }

    /// Steering vector of point `g` at wavenumber `k`.
    pub(crate) fn vector_into(&self, g: usize, k: f64, out: &mut [Complex64]) {
        let offsets = &self.offsets[g * self.num_mics..(g + 1) * self.num_mics];
        for (e, &r) in out.iter_mut().zip(offsets) {
            *e = Complex64::from_polar(1.0, -k * r);
        }
    }
}

/// `Re(sum_ij e_i C_ij conj(e_j))`, skipping `i == j` when `remove_diag`.
pub(crate) fn csm_power(e: &[Complex64], csm: &[Complex64], remove_diag: bool) -> f64 {
    let n = e.len();
    let mut h = 0.0;
    for i in 0..n {
        let row = &csm[i * n..(i + 1) * n];
        let mut acc = Complex64::new(0.0, 0.0);
        for (j, (&c, ej)) in row.iter().zip(e).enumerate() {
            if remove_diag && i == j {
                continue;
            }
            acc += c * ej.conj();
        }
        h += (e[i] * acc).re;
    }
    h
}

/// `|sum_i e_i v_ik|^2` for column `k` of a row-major eigenvector matrix,
/// less the self terms `sum_i |v_ik|^2` when `remove_diag`.
pub(crate) fn projection_power(
    e: &[Complex64],
    vectors: &[Complex64],
    k: usize,
    remove_diag: bool,
) -> f64 {
    let n = e.len();
    let mut acc = Complex64::new(0.0, 0.0);
    let mut diag = 0.0;
    for (i, ei) in e.iter().enumerate() {
        let v = vectors[i * n + k];
        acc += ei * v;
        diag += v.norm_sqr();
    }
    if remove_diag {
        acc.norm_sqr() - diag
    } else {
        acc.norm_sqr()
    }
}
