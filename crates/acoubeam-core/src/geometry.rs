//! Microphone array geometry.

use crate::digest::Digest;

/// Cartesian positions of the microphones, in metres.
#[derive(Debug, Clone, PartialEq)]
pub struct MicGeom {
    positions: Vec<[f64; 3]>,
    digest: Digest,
}

impl MicGeom {
    /// Build from a list of `[x, y, z]` coordinates.
    pub fn new(positions: Vec<[f64; 3]>) -> Self {
        let flat: Vec<f64> = positions.iter().flatten().copied().collect();
        let digest = Digest::builder().str("mics").f64s(&flat).finish();
        Self { positions, digest }
    }

    /// Number of microphones.
    pub fn num_mics(&self) -> usize {
        self.positions.len()
    }

    /// Microphone coordinates.
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Content fingerprint.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Geometric centre of the array.
    pub fn center(&self) -> [f64; 3] {
        let n = self.positions.len().max(1) as f64;
        let mut c = [0.0; 3];
        for p in &self.positions {
            for k in 0..3 {
                c[k] += p[k];
            }
        }
        c.map(|v| v / n)
    }

    /// Largest distance between any two microphones.
    pub fn aperture(&self) -> f64 {
        let mut max = 0.0_f64;
        for (i, a) in self.positions.iter().enumerate() {
            for b in &self.positions[i + 1..] {
                max = max.max(distance(a, b));
            }
        }
        max
    }

    /// Drop the listed microphones (unknown indices are ignored).
    pub fn without_channels(&self, invalid_channels: &[usize]) -> Self {
        Self::new(
            self.positions
                .iter()
                .enumerate()
                .filter(|(i, _)| !invalid_channels.contains(i))
                .map(|(_, &p)| p)
                .collect(),
        )
    }
}

/// Euclidean distance between two points.
pub fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}
