//! Per-channel calibration factors.

use crate::digest::Digest;

/// Multiplicative correction factor for each microphone channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    factors: Vec<f64>,
    digest: Digest,
}

impl Calibration {
    /// Wrap a list of factors, one per channel.
    pub fn new(factors: Vec<f64>) -> Self {
        let digest = Digest::builder().str("calib").f64s(&factors).finish();
        Self { factors, digest }
    }

    /// Unity factors for `num_mics` channels.
    pub fn unity(num_mics: usize) -> Self {
        Self::new(vec![1.0; num_mics])
    }

    /// Number of channels covered.
    pub fn num_mics(&self) -> usize {
        self.factors.len()
    }

    /// The factors.
    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Content fingerprint.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Factors to apply to a store with `num_channels` channels.
    ///
    /// Returns `None` (calibration skipped, treat as unity) when the channel
    /// counts disagree; the mismatch is logged, never fatal.
    pub fn factors_for(&self, num_channels: usize) -> Option<&[f64]> {
        if self.factors.len() == num_channels {
            Some(&self.factors)
        } else {
            tracing::warn!(
                calib_channels = self.factors.len(),
                num_channels,
                "calibration data not compatible with time data, calibration skipped"
            );
            None
        }
    }

    /// Drop the listed channels (unknown indices are ignored).
    pub fn without_channels(&self, invalid_channels: &[usize]) -> Self {
        Self::new(
            self.factors
                .iter()
                .enumerate()
                .filter(|(i, _)| !invalid_channels.contains(i))
                .map(|(_, &f)| f)
                .collect(),
        )
    }
}
