//! Small dense complex matrix routines.
//!
//! Matrices are square, row-major slices of length `n * n`. Sizes are the
//! microphone count, so straightforward O(n^3) algorithms are adequate.

use num_complex::Complex64;

const MAX_SWEEPS: usize = 100;

/// Invert a complex matrix by Gauss-Jordan elimination with partial pivoting.
///
/// There is no conditioning guard: a singular or near-singular input yields
/// non-finite or huge entries instead of an error.
pub fn invert(a: &[Complex64], n: usize) -> Vec<Complex64> {
    debug_assert_eq!(a.len(), n * n);
    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    let width = 2 * n;

    // augmented [A | I]
    let mut aug = vec![zero; n * width];
    for i in 0..n {
        aug[i * width..i * width + n].copy_from_slice(&a[i * n..(i + 1) * n]);
        aug[i * width + n + i] = one;
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_mag = aug[col * width + col].norm();
        for row in col + 1..n {
            let mag = aug[row * width + col].norm();
            if mag > max_mag {
                max_mag = mag;
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..width {
                aug.swap(col * width + j, max_row * width + j);
            }
        }

        let inv_pivot = one / aug[col * width + col];
        for j in 0..width {
            aug[col * width + j] *= inv_pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row * width + col];
            if factor == zero {
                continue;
            }
            for j in 0..width {
                let t = factor * aug[col * width + j];
                aug[row * width + j] -= t;
            }
        }
    }

    let mut inv = vec![zero; n * n];
    for i in 0..n {
        inv[i * n..(i + 1) * n].copy_from_slice(&aug[i * width + n..(i + 1) * width]);
    }
    inv
}

/// Eigen-decomposition of a Hermitian matrix (cyclic complex Jacobi).
///
/// Returns eigenvalues in ascending order and the matching eigenvectors as
/// the columns of a row-major `n x n` matrix: component `i` of eigenvector
/// `k` is at `i * n + k`. Only the Hermitian part of the input is used.
pub fn hermitian_eigen(a: &[Complex64], n: usize) -> (Vec<f64>, Vec<Complex64>) {
    debug_assert_eq!(a.len(), n * n);
    let zero = Complex64::new(0.0, 0.0);
    let mut m = a.to_vec();
    let mut v = vec![zero; n * n];
    for i in 0..n {
        v[i * n + i] = Complex64::new(1.0, 0.0);
        m[i * n + i].im = 0.0;
    }

    let total: f64 = m.iter().map(|c| c.norm_sqr()).sum();
    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| m[i * n + j].norm_sqr())
            .sum();
        if off <= total * 1e-30 || !off.is_finite() {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                rotate(&mut m, &mut v, n, p, q);
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m[i * n + i].re.total_cmp(&m[j * n + j].re));

    let values = order.iter().map(|&k| m[k * n + k].re).collect();
    let mut vectors = vec![zero; n * n];
    for (dst, &src) in order.iter().enumerate() {
        for i in 0..n {
            vectors[i * n + dst] = v[i * n + src];
        }
    }
    (values, vectors)
}

/// One Jacobi rotation zeroing the `(p, q)` pair.
///
/// With `a_pq = |a_pq| e^{i phi}` the unitary `U = diag(1, e^{-i phi}) R`
/// makes the 2x2 block real symmetric and then diagonal; `m <- U^H m U`,
/// `v <- v U`.
fn rotate(m: &mut [Complex64], v: &mut [Complex64], n: usize, p: usize, q: usize) {
    let apq = m[p * n + q];
    let abs = apq.norm();
    if abs == 0.0 || !abs.is_finite() {
        return;
    }
    let app = m[p * n + p].re;
    let aqq = m[q * n + q].re;
    let phase = apq / abs;
    let back = phase.conj();

    let theta = (aqq - app) / (2.0 * abs);
    let t = if theta.abs() > 1e150 {
        0.5 / theta
    } else {
        theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
    };
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    for k in 0..n {
        let akp = m[k * n + p];
        let akq = m[k * n + q];
        m[k * n + p] = akp * c - akq * back * s;
        m[k * n + q] = akp * s + akq * back * c;
    }
    for k in 0..n {
        let apk = m[p * n + k];
        let aqk = m[q * n + k];
        m[p * n + k] = apk * c - aqk * phase * s;
        m[q * n + k] = apk * s + aqk * phase * c;
    }
    m[p * n + q] = Complex64::new(0.0, 0.0);
    m[q * n + p] = Complex64::new(0.0, 0.0);
    m[p * n + p].im = 0.0;
    m[q * n + q].im = 0.0;

    for k in 0..n {
        let vkp = v[k * n + p];
        let vkq = v[k * n + q];
        v[k * n + p] = vkp * c - vkq * back * s;
        v[k * n + q] = vkp * s + vkq * back * c;
    }
}

/// Largest deviation `|a_ij - conj(a_ji)|`.
pub fn hermitian_error(a: &[Complex64], n: usize) -> f64 {
    let mut err = 0.0_f64;
    for i in 0..n {
        for j in 0..n {
            err = err.max((a[i * n + j] - a[j * n + i].conj()).norm());
        }
    }
    err
}
