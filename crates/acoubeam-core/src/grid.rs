//! Candidate source positions for beamforming maps.

use crate::digest::Digest;
use std::ops::Range;

/// An enumerable set of 3-D focus points with a map shape.
///
/// Implementations must keep `size() == shape().iter().product()` and
/// return positions in the row-major order of `shape()`.
pub trait Grid {
    /// Number of points.
    fn size(&self) -> usize;

    /// Map shape, e.g. `[nx, ny]`.
    fn shape(&self) -> Vec<usize>;

    /// All points, `size()` entries of `[x, y, z]`.
    fn positions(&self) -> Vec<[f64; 3]>;

    /// Fingerprint of the defining parameters.
    fn digest(&self) -> Digest;
}

/// Regular 2-D grid on a plane of constant `z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectGrid {
    /// Minimum x.
    pub x_min: f64,
    /// Maximum x.
    pub x_max: f64,
    /// Minimum y.
    pub y_min: f64,
    /// Maximum y.
    pub y_max: f64,
    /// Plane position on the z axis.
    pub z: f64,
    /// Step in x and y.
    pub increment: f64,
}

impl Default for RectGrid {
    fn default() -> Self {
        Self {
            x_min: -1.0,
            x_max: 1.0,
            y_min: -1.0,
            y_max: 1.0,
            z: 1.0,
            increment: 0.1,
        }
    }
}

fn steps(min: f64, max: f64, increment: f64) -> usize {
    let i = increment.abs();
    if i != 0.0 {
        (((max - min).abs() + i) / i).round() as usize
    } else {
        1
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (stop - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| start + step * i as f64)
}

impl RectGrid {
    /// Grid spanning `[x_min, x_max] x [y_min, y_max]` at height `z`.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, z: f64, increment: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            z,
            increment,
        }
    }

    /// Points along x.
    pub fn nxsteps(&self) -> usize {
        steps(self.x_min, self.x_max, self.increment)
    }

    /// Points along y.
    pub fn nysteps(&self) -> usize {
        steps(self.y_min, self.y_max, self.increment)
    }

    /// Map indices of the grid point nearest to `(x, y)`.
    ///
    /// `None` when the coordinate lies outside the grid.
    pub fn index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if x < self.x_min || x > self.x_max || y < self.y_min || y > self.y_max {
            return None;
        }
        if self.increment == 0.0 {
            return Some((0, 0));
        }
        let xi = ((x - self.x_min) / self.increment).round() as usize;
        let yi = ((y - self.y_min) / self.increment).round() as usize;
        Some((xi.min(self.nxsteps() - 1), yi.min(self.nysteps() - 1)))
    }

    /// Index ranges of the rectangular sub-domain spanned by two corners.
    pub fn indices(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Option<(Range<usize>, Range<usize>)> {
        let (xi1, yi1) = self.index(x1, y1)?;
        let (xi2, yi2) = self.index(x2, y2)?;
        Some((xi1..xi2 + 1, yi1..yi2 + 1))
    }

    /// Coordinates of the point at flat index `k`.
    pub fn position(&self, k: usize) -> Option<[f64; 3]> {
        let (nx, ny) = (self.nxsteps(), self.nysteps());
        if k >= nx * ny {
            return None;
        }
        let (ix, iy) = (k / ny, k % ny);
        let x = linspace(self.x_min, self.x_max, nx).nth(ix)?;
        let y = linspace(self.y_min, self.y_max, ny).nth(iy)?;
        Some([x, y, self.z])
    }
}

impl Grid for RectGrid {
    fn size(&self) -> usize {
        self.nxsteps() * self.nysteps()
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.nxsteps(), self.nysteps()]
    }

    fn positions(&self) -> Vec<[f64; 3]> {
        let ys: Vec<f64> = linspace(self.y_min, self.y_max, self.nysteps()).collect();
        linspace(self.x_min, self.x_max, self.nxsteps())
            .flat_map(|x| ys.iter().map(move |&y| [x, y, self.z]))
            .collect()
    }

    fn digest(&self) -> Digest {
        Digest::builder()
            .str("rectgrid")
            .f64(self.x_min)
            .f64(self.x_max)
            .f64(self.y_min)
            .f64(self.y_max)
            .f64(self.z)
            .f64(self.increment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RectGrid {
        RectGrid::new(-0.6, 0.0, -0.3, 0.3, 0.68, 0.05)
    }

    #[test]
    fn step_counts() {
        let g = grid();
        assert_eq!(g.nxsteps(), 13);
        assert_eq!(g.nysteps(), 13);
        assert_eq!(g.size(), 169);
        assert_eq!(g.shape(), vec![13, 13]);
    }

    #[test]
    fn zero_increment_single_point() {
        let g = RectGrid::new(0.0, 1.0, 0.0, 1.0, 1.0, 0.0);
        assert_eq!(g.size(), 1);
        assert_eq!(g.positions(), vec![[0.0, 0.0, 1.0]]);
    }

    #[test]
    fn positions_are_row_major() {
        let g = RectGrid::new(0.0, 1.0, 0.0, 2.0, 0.5, 1.0);
        let pos = g.positions();
        assert_eq!(pos.len(), g.size());
        assert_eq!(pos[0], [0.0, 0.0, 0.5]);
        assert_eq!(pos[1], [0.0, 1.0, 0.5]);
        assert_eq!(pos[3], [1.0, 0.0, 0.5]);
        assert_eq!(pos[5], [1.0, 2.0, 0.5]);
        assert_eq!(g.position(5), Some(pos[5]));
        assert_eq!(g.position(6), None);
    }

    #[test]
    fn index_and_indices() {
        let g = grid();
        assert_eq!(g.index(-0.6, -0.3), Some((0, 0)));
        assert_eq!(g.index(0.0, 0.3), Some((12, 12)));
        assert_eq!(g.index(-0.3, 0.0), Some((6, 6)));
        assert_eq!(g.index(0.1, 0.0), None);
        let (xr, yr) = g.indices(-0.5, -0.1, -0.4, 0.1).unwrap();
        assert_eq!(xr, 2..5);
        assert_eq!(yr, 4..9);
    }

    #[test]
    fn digest_depends_on_parameters() {
        let a = grid();
        let mut b = grid();
        assert_eq!(a.digest(), b.digest());
        b.z = 0.7;
        assert_ne!(a.digest(), b.digest());
    }
}
